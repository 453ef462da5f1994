//! Bot API client and update processing against a mock Bot API server.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notekeeper_bot::conversation::Conversations;
use notekeeper_bot::messages;
use notekeeper_bot::types::{SendMessageRequest, Update};
use notekeeper_bot::{process_update, BotContext, TelegramClient, UpdateQueue};
use notekeeper_core::{
    Account, AccountCredentials, AccountId, AccountRepository, Error, ExternalProfile,
    ListNotesRequest, NewAccount, Reconciled, Result, Settings, Store,
};
use notekeeper_db::MemoryStore;

const TOKEN: &str = "123:abc";

fn settings() -> Settings {
    let vars = [
        ("TELEGRAM_BOT_TOKEN", TOKEN),
        ("TELEGRAM_BOT_USERNAME", "notes_bot"),
        ("SECRET_KEY", "secret"),
        ("DATABASE_URL", "postgres://unused/unused"),
    ];
    Settings::from_lookup(|key| {
        vars.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
    .unwrap()
}

fn context(store: Store) -> Arc<BotContext> {
    Arc::new(BotContext {
        store,
        settings: Arc::new(settings()),
        conversations: Conversations::new(Duration::minutes(10)),
    })
}

fn update(text: &str) -> Update {
    update_from(100, 42, text)
}

fn update_from(update_id: i64, user_id: i64, text: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "from": {"id": user_id, "is_bot": false, "first_name": "Ann"},
            "chat": {"id": user_id, "type": "private"},
            "date": 1700000000,
            "text": text
        }
    }))
    .unwrap()
}

async fn mount_send_message(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {
                "message_id": 6,
                "chat": {"id": 42, "type": "private"},
                "date": 1700000001,
                "text": "ok"
            }
        })))
        .mount(server)
        .await;
}

/// Text of every sendMessage the mock server received.
async fn sent_texts(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path().ends_with("/sendMessage"))
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            body["text"].as_str().unwrap_or_default().to_string()
        })
        .collect()
}

/// Account repository that fails (or panics) on every call.
struct BrokenAccounts {
    panic: bool,
}

impl BrokenAccounts {
    fn fail<T>(&self) -> Result<T> {
        if self.panic {
            panic!("account lookup exploded");
        }
        Err(Error::Internal("database unavailable".to_string()))
    }
}

#[async_trait]
impl AccountRepository for BrokenAccounts {
    async fn create_with_password(&self, _req: NewAccount) -> Result<Account> {
        self.fail()
    }
    async fn get(&self, _id: AccountId) -> Result<Account> {
        self.fail()
    }
    async fn find_by_telegram_id(&self, _telegram_id: i64) -> Result<Option<Account>> {
        self.fail()
    }
    async fn credentials(&self, _username: &str) -> Result<Option<AccountCredentials>> {
        self.fail()
    }
    async fn reconcile_external(&self, _profile: &ExternalProfile) -> Result<Reconciled> {
        self.fail()
    }
}

fn broken_store(panic: bool) -> Store {
    let mut store = MemoryStore::new().store();
    store.accounts = Arc::new(BrokenAccounts { panic });
    store
}

#[tokio::test]
async fn test_get_updates_parses_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/getUpdates", TOKEN)))
        .and(body_partial_json(json!({"offset": 7, "timeout": 0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [{
                "update_id": 7,
                "message": {
                    "message_id": 1,
                    "from": {"id": 42, "is_bot": false, "first_name": "Ann"},
                    "chat": {"id": 42, "type": "private"},
                    "date": 1700000000,
                    "text": "/recent"
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();
    let updates = client.get_updates(Some(7), 0).await.unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates[0].message.as_ref().unwrap().text.as_deref(),
        Some("/recent")
    );
}

#[tokio::test]
async fn test_send_message_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .and(body_partial_json(json!({
            "chat_id": 42,
            "text": "<b>hi</b>",
            "parse_mode": "HTML",
            "disable_web_page_preview": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"message_id": 2, "chat": {"id": 42, "type": "private"}, "date": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();
    client
        .send_message(&SendMessageRequest {
            chat_id: 42,
            text: "<b>hi</b>".to_string(),
            parse_mode: Some("HTML".to_string()),
            disable_web_page_preview: true,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_api_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();
    let err = client
        .send_message(&SendMessageRequest {
            chat_id: 1,
            text: "x".to_string(),
            parse_mode: None,
            disable_web_page_preview: false,
        })
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("chat not found"));
    assert!(!msg.contains(TOKEN));
}

#[tokio::test]
async fn test_process_update_replies_in_chat() {
    let server = MockServer::start().await;
    mount_send_message(&server).await;
    let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();
    let memory = MemoryStore::new();
    let ctx = context(memory.store());

    process_update(&client, ctx, update("/start")).await;

    let texts = sent_texts(&server).await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("Привет, Ann!"));
    assert_eq!(memory.account_count().await, 1);
}

#[tokio::test]
async fn test_handler_error_gets_apology() {
    let server = MockServer::start().await;
    mount_send_message(&server).await;
    let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();

    process_update(&client, context(broken_store(false)), update("/recent")).await;

    assert_eq!(sent_texts(&server).await, vec![messages::APOLOGY.to_string()]);
}

#[tokio::test]
async fn test_handler_panic_gets_apology() {
    let server = MockServer::start().await;
    mount_send_message(&server).await;
    let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();

    process_update(&client, context(broken_store(true)), update("/recent")).await;

    assert_eq!(sent_texts(&server).await, vec![messages::APOLOGY.to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batched_capture_keeps_message_order() {
    let server = MockServer::start().await;
    mount_send_message(&server).await;
    let client = TelegramClient::new(&server.uri(), TOKEN).unwrap();
    let memory = MemoryStore::new();
    let mut queue = UpdateQueue::new(client, context(memory.store()));

    // one getUpdates batch holding a whole capture from two users
    let batch = [
        update_from(1, 42, "/start"),
        update_from(2, 77, "/start"),
        update_from(3, 42, "/new"),
        update_from(4, 77, "/new"),
        update_from(5, 42, "Shopping"),
        update_from(6, 77, "Call mom"),
        update_from(7, 42, "milk, eggs"),
        update_from(8, 77, "on Sunday"),
    ];
    for update in batch {
        queue.push(update);
    }
    assert_eq!(queue.pending_senders(), 2);
    queue.drain().await;

    let store = memory.store();
    let expected = [(42, "Shopping", "milk, eggs"), (77, "Call mom", "on Sunday")];
    for (telegram_id, title, content) in expected {
        let account = store
            .accounts
            .find_by_telegram_id(telegram_id)
            .await
            .unwrap()
            .unwrap();
        let notes = store
            .notes
            .list(account.id, ListNotesRequest::recent(5))
            .await
            .unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, title);
        assert_eq!(notes[0].content, content);
    }
    assert_eq!(sent_texts(&server).await.len(), 8);
}
