//! notekeeper-bot - Telegram bot for notekeeper.

use std::sync::Arc;

use chrono::Duration;
use tracing::info;

use notekeeper_core::defaults::{CONVERSATION_TTL_SECS, TELEGRAM_POLL_TIMEOUT_SECS};
use notekeeper_core::logging::init_tracing;
use notekeeper_core::Settings;
use notekeeper_db::{Database, PoolConfig};

use notekeeper_bot::conversation::Conversations;
use notekeeper_bot::{BotContext, Dispatcher, TelegramClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let _log_guard = init_tracing("notekeeper_bot=info", "notekeeper-bot.log");

    let settings = Settings::from_env()?;
    let db = Database::connect_with_config(&settings.database_url, PoolConfig::from_env()).await?;
    db.migrate().await?;

    let client = TelegramClient::new(&settings.telegram.api_url, &settings.telegram.bot_token)?;
    info!(
        subsystem = "bot",
        bot_username = %settings.telegram.bot_username,
        "Starting bot"
    );

    let ctx = Arc::new(BotContext {
        store: db.store(),
        settings: Arc::new(settings),
        conversations: Conversations::new(Duration::seconds(CONVERSATION_TTL_SECS)),
    });
    let dispatcher = Dispatcher::new(client, ctx, TELEGRAM_POLL_TIMEOUT_SECS);

    tokio::select! {
        result = dispatcher.run() => result?,
        _ = tokio::signal::ctrl_c() => info!(subsystem = "bot", "Shutting down"),
    }
    Ok(())
}
