//! Command handlers. Each turns one incoming message into at most one reply.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use notekeeper_core::defaults::{RECENT_NOTES_LIMIT, SEARCH_RESULTS_LIMIT};
use notekeeper_core::temporal::{local_midnight, parse_date};
use notekeeper_core::validation::validate_note_input;
use notekeeper_core::{
    Account, Error, ExternalProfile, ListNotesRequest, NoteInput, Result, Settings, Store,
};
use notekeeper_crypto::login_link_url;

use crate::commands::Command;
use crate::conversation::{ConversationKey, Conversations, Step};
use crate::messages;
use crate::types::{Message, User};

/// Everything a handler needs, shared by all update tasks.
pub struct BotContext {
    pub store: Store,
    pub settings: Arc<Settings>,
    pub conversations: Conversations,
}

/// Text to send back to the chat the message came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub parse_mode: Option<&'static str>,
    pub disable_preview: bool,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: None,
            disable_preview: false,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: Some("HTML"),
            disable_preview: true,
        }
    }
}

/// Handle one message. `Ok(None)` means nothing needs to be sent.
pub async fn handle_message(ctx: &BotContext, message: &Message) -> Result<Option<Reply>> {
    let (Some(from), Some(text)) = (message.from.as_ref(), message.text.as_deref()) else {
        return Ok(None);
    };
    if from.is_bot {
        return Ok(None);
    }

    let command = Command::parse(text, &ctx.settings.telegram.bot_username);
    debug!(
        subsystem = "bot",
        component = "handlers",
        command = command.name(),
        chat_id = message.chat.id,
        telegram_id = from.id,
        "Handling message"
    );
    let key: ConversationKey = (message.chat.id, from.id);

    // commands that work without an account, or check arguments first
    match &command {
        Command::Start => return start(ctx, from).await.map(Some),
        Command::Help => return Ok(Some(Reply::text(messages::HELP))),
        Command::OtherBot => return Ok(None),
        Command::Unknown(_) => return Ok(Some(Reply::text(messages::UNKNOWN_COMMAND))),
        Command::Search(q) if q.is_empty() => {
            return Ok(Some(Reply::text(messages::SEARCH_USAGE)))
        }
        Command::SetReminder(args) if args.len() < 2 => {
            return Ok(Some(Reply::text(messages::REMINDER_USAGE)))
        }
        _ => {}
    }

    let Some(account) = known_account(ctx, from.id).await? else {
        return Ok(match command {
            // stray text from strangers is ignored
            Command::Text(_) => None,
            _ => Some(Reply::text(messages::NEED_START)),
        });
    };

    let reply = match command {
        Command::New => {
            ctx.conversations
                .set(key, Step::AwaitingTitle, Utc::now())
                .await;
            Some(Reply::text(messages::ASK_TITLE))
        }
        Command::Recent => Some(recent(ctx, &account).await?),
        Command::Search(query) => Some(search(ctx, &account, &query).await?),
        Command::SetReminder(args) => Some(set_reminder(ctx, &account, &args[0], &args[1]).await?),
        Command::WebLogin => Some(web_login(ctx, &account)),
        Command::Text(text) => capture(ctx, &account, key, text).await?,
        Command::Start | Command::Help | Command::OtherBot | Command::Unknown(_) => None,
    };
    Ok(reply)
}

async fn known_account(ctx: &BotContext, telegram_id: i64) -> Result<Option<Account>> {
    let account = ctx.store.accounts.find_by_telegram_id(telegram_id).await?;
    Ok(account.filter(|a| a.is_active))
}

async fn start(ctx: &BotContext, from: &User) -> Result<Reply> {
    let profile = ExternalProfile {
        telegram_id: from.id,
        first_name: from.first_name.clone(),
        last_name: from.last_name.clone().unwrap_or_default(),
        username: from.username.clone(),
    };
    let reconciled = ctx.store.accounts.reconcile_external(&profile).await?;
    info!(
        subsystem = "bot",
        component = "handlers",
        command = "start",
        account_id = reconciled.account.id,
        created = reconciled.created,
        "Chat user started the bot"
    );
    Ok(Reply::text(messages::greeting(
        &from.first_name,
        reconciled.created,
    )))
}

async fn recent(ctx: &BotContext, account: &Account) -> Result<Reply> {
    let notes = ctx
        .store
        .notes
        .list(account.id, ListNotesRequest::recent(RECENT_NOTES_LIMIT))
        .await?;
    Ok(Reply::text(messages::recent(
        &notes,
        Utc::now(),
        ctx.settings.display_offset,
    )))
}

async fn search(ctx: &BotContext, account: &Account, query: &str) -> Result<Reply> {
    let notes = ctx
        .store
        .notes
        .search(account.id, query, SEARCH_RESULTS_LIMIT)
        .await?;
    Ok(Reply::text(messages::search_results(
        query,
        &notes,
        ctx.settings.display_offset,
    )))
}

async fn set_reminder(
    ctx: &BotContext,
    account: &Account,
    note_id: &str,
    date: &str,
) -> Result<Reply> {
    let Ok(note_id) = note_id.trim().parse::<i64>() else {
        return Ok(Reply::text(messages::NOTE_NOT_FOUND));
    };
    let note = match ctx.store.notes.get(account.id, note_id).await {
        Ok(note) => note,
        Err(Error::NotFound(_)) => return Ok(Reply::text(messages::NOTE_NOT_FOUND)),
        Err(e) => return Err(e),
    };
    let Ok(date) = parse_date(date) else {
        return Ok(Reply::text(messages::BAD_DATE));
    };

    let deadline = local_midnight(date, ctx.settings.display_offset);
    ctx.store
        .notes
        .set_deadline(account.id, note.id, Some(deadline))
        .await?;
    info!(
        subsystem = "bot",
        component = "handlers",
        command = "set_reminder",
        account_id = account.id,
        note_id = note.id,
        "Deadline set"
    );
    Ok(Reply::text(messages::reminder_set(
        &note.title,
        &date.format(notekeeper_core::temporal::DATE_FORMAT).to_string(),
    )))
}

fn web_login(ctx: &BotContext, account: &Account) -> Reply {
    let telegram_id = account.telegram_id.unwrap_or_default();
    let url = login_link_url(
        &ctx.settings.webapp_url,
        ctx.settings.secret_key.as_bytes(),
        telegram_id,
        Utc::now().timestamp(),
    );
    info!(
        subsystem = "bot",
        component = "handlers",
        command = "web_login",
        account_id = account.id,
        "Web login link issued"
    );
    Reply::html(messages::web_login(&url))
}

/// Advance the `/new` conversation with a plain text message.
///
/// The step is taken out of the store before any await on the note store,
/// so a concurrent message for the same key cannot advance it twice.
async fn capture(
    ctx: &BotContext,
    account: &Account,
    key: ConversationKey,
    text: String,
) -> Result<Option<Reply>> {
    let now = Utc::now();
    match ctx.conversations.take(key, now).await {
        None => Ok(None),
        Some(Step::AwaitingTitle) => {
            let title = text.trim().to_string();
            if let Err(Error::InvalidInput(reason)) =
                validate_note_input(&NoteInput::text(title.clone(), String::new()))
            {
                ctx.conversations.set(key, Step::AwaitingTitle, now).await;
                return Ok(Some(Reply::text(messages::bad_title(&reason))));
            }
            ctx.conversations
                .set(key, Step::AwaitingContent { title }, now)
                .await;
            Ok(Some(Reply::text(messages::ASK_CONTENT)))
        }
        Some(Step::AwaitingContent { title }) => {
            let note = match ctx
                .store
                .notes
                .create(account.id, NoteInput::text(title.clone(), text))
                .await
            {
                Ok(note) => note,
                Err(e) => {
                    // let the user resend the body
                    ctx.conversations
                        .set(key, Step::AwaitingContent { title }, now)
                        .await;
                    return Err(e);
                }
            };
            info!(
                subsystem = "bot",
                component = "handlers",
                command = "new",
                account_id = account.id,
                note_id = note.id,
                "Note captured from chat"
            );
            Ok(Some(Reply::text(messages::note_created(&note.title))))
        }
    }
}
