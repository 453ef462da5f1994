//! In-memory storage backend.
//!
//! Implements every repository trait over one mutex-guarded state so tests and
//! local demos run without Postgres. Semantics follow the Postgres backend:
//! owner scoping, case-insensitive label names, and idempotent reconciliation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use notekeeper_core::validation::{normalize_label, validate_note_input};
use notekeeper_core::{
    Account, AccountCredentials, AccountId, AccountRepository, Category, CategoryRepository,
    Error, ExternalProfile, ListNotesRequest, NewAccount, Note, NoteInput, NoteRepository,
    Reconciled, Result, SessionRepository, Store, Tag, TagRepository,
};

struct AccountRow {
    account: Account,
    password_hash: Option<String>,
}

struct NoteRow {
    owner: AccountId,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deadline: Option<DateTime<Utc>>,
    category_id: Option<i64>,
}

struct LabelRow {
    owner: AccountId,
    name: String,
}

#[derive(Default)]
struct State {
    next_id: i64,
    accounts: BTreeMap<AccountId, AccountRow>,
    notes: BTreeMap<i64, NoteRow>,
    categories: BTreeMap<i64, LabelRow>,
    tags: BTreeMap<i64, LabelRow>,
    /// (note_id, tag_id)
    note_tags: BTreeSet<(i64, i64)>,
    sessions: HashMap<String, (AccountId, DateTime<Utc>)>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn note(&self, id: i64, row: &NoteRow) -> Note {
        let category = row.category_id.and_then(|cid| {
            self.categories.get(&cid).map(|c| Category {
                id: cid,
                name: c.name.clone(),
            })
        });
        let mut tags: Vec<Tag> = self
            .note_tags
            .range((id, i64::MIN)..=(id, i64::MAX))
            .filter_map(|(_, tid)| {
                self.tags.get(tid).map(|t| Tag {
                    id: *tid,
                    name: t.name.clone(),
                })
            })
            .collect();
        tags.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        Note {
            id,
            title: row.title.clone(),
            content: row.content.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            deadline: row.deadline,
            category,
            tags,
        }
    }

    fn owned_note(&self, owner: AccountId, id: i64) -> Result<&NoteRow> {
        self.notes
            .get(&id)
            .filter(|n| n.owner == owner)
            .ok_or_else(|| Error::not_found("note", id))
    }

    /// Notes of `owner`, newest first.
    fn notes_of(&self, owner: AccountId) -> Vec<Note> {
        let mut notes: Vec<Note> = self
            .notes
            .iter()
            .filter(|(_, n)| n.owner == owner)
            .map(|(id, n)| self.note(*id, n))
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        notes
    }

    fn check_labels(&self, owner: AccountId, input: &NoteInput) -> Result<Vec<i64>> {
        if let Some(cid) = input.category_id {
            if !self.categories.get(&cid).is_some_and(|c| c.owner == owner) {
                return Err(Error::InvalidInput(format!("unknown category: {}", cid)));
            }
        }
        let mut tag_ids = input.tag_ids.clone();
        tag_ids.sort_unstable();
        tag_ids.dedup();
        if tag_ids
            .iter()
            .any(|tid| !self.tags.get(tid).is_some_and(|t| t.owner == owner))
        {
            return Err(Error::InvalidInput("unknown tag in tag_ids".to_string()));
        }
        Ok(tag_ids)
    }

    fn replace_tags(&mut self, note_id: i64, tag_ids: &[i64]) {
        self.note_tags.retain(|(nid, _)| *nid != note_id);
        for tid in tag_ids {
            self.note_tags.insert((note_id, *tid));
        }
    }
}

/// Which label table an operation targets.
#[derive(Clone, Copy)]
enum LabelKind {
    Category,
    Tag,
}

impl LabelKind {
    fn entity(self) -> &'static str {
        match self {
            LabelKind::Category => "category",
            LabelKind::Tag => "tag",
        }
    }

    fn table(self, state: &mut State) -> &mut BTreeMap<i64, LabelRow> {
        match self {
            LabelKind::Category => &mut state.categories,
            LabelKind::Tag => &mut state.tags,
        }
    }
}

/// Thread-safe in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository bundle backed by this store.
    pub fn store(&self) -> Store {
        let this = Arc::new(self.clone());
        Store {
            accounts: this.clone(),
            notes: this.clone(),
            categories: this.clone(),
            tags: this.clone(),
            sessions: this,
        }
    }

    /// Number of accounts; lets tests assert that nothing was duplicated.
    pub async fn account_count(&self) -> usize {
        self.state.lock().await.accounts.len()
    }

    /// Number of live (unexpired or not yet purged) sessions.
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Deactivate an account.
    pub async fn deactivate(&self, id: AccountId) -> Result<()> {
        let mut state = self.state.lock().await;
        let row = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("account", id))?;
        row.account.is_active = false;
        Ok(())
    }

    async fn label_create(&self, kind: LabelKind, owner: AccountId, name: &str) -> Result<(i64, String)> {
        let name = normalize_label(name)?;
        let mut state = self.state.lock().await;
        let lower = name.to_lowercase();
        if kind
            .table(&mut state)
            .values()
            .any(|l| l.owner == owner && l.name.to_lowercase() == lower)
        {
            return Err(Error::Conflict(format!("{} {} already exists", kind.entity(), name)));
        }
        let id = state.next_id();
        kind.table(&mut state).insert(
            id,
            LabelRow {
                owner,
                name: name.clone(),
            },
        );
        Ok((id, name))
    }

    async fn label_get(&self, kind: LabelKind, owner: AccountId, id: i64) -> Result<(i64, String)> {
        let mut state = self.state.lock().await;
        kind.table(&mut state)
            .get(&id)
            .filter(|l| l.owner == owner)
            .map(|l| (id, l.name.clone()))
            .ok_or_else(|| Error::not_found(kind.entity(), id))
    }

    async fn label_list(&self, kind: LabelKind, owner: AccountId) -> Vec<(i64, String)> {
        let mut state = self.state.lock().await;
        let mut labels: Vec<(i64, String)> = kind
            .table(&mut state)
            .iter()
            .filter(|(_, l)| l.owner == owner)
            .map(|(id, l)| (*id, l.name.clone()))
            .collect();
        labels.sort_by(|a, b| a.1.to_lowercase().cmp(&b.1.to_lowercase()).then(a.0.cmp(&b.0)));
        labels
    }

    async fn label_rename(
        &self,
        kind: LabelKind,
        owner: AccountId,
        id: i64,
        name: &str,
    ) -> Result<(i64, String)> {
        let name = normalize_label(name)?;
        let mut state = self.state.lock().await;
        let lower = name.to_lowercase();
        let table = kind.table(&mut state);
        if !table.get(&id).is_some_and(|l| l.owner == owner) {
            return Err(Error::not_found(kind.entity(), id));
        }
        if table
            .iter()
            .any(|(lid, l)| *lid != id && l.owner == owner && l.name.to_lowercase() == lower)
        {
            return Err(Error::Conflict(format!("{} {} already exists", kind.entity(), name)));
        }
        if let Some(label) = table.get_mut(&id) {
            label.name = name.clone();
        }
        Ok((id, name))
    }

    async fn label_delete(&self, kind: LabelKind, owner: AccountId, id: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        if !kind.table(&mut state).get(&id).is_some_and(|l| l.owner == owner) {
            return Err(Error::not_found(kind.entity(), id));
        }
        kind.table(&mut state).remove(&id);
        match kind {
            LabelKind::Category => {
                for note in state.notes.values_mut() {
                    if note.category_id == Some(id) {
                        note.category_id = None;
                    }
                }
            }
            LabelKind::Tag => state.note_tags.retain(|(_, tid)| *tid != id),
        }
        Ok(())
    }

    async fn label_get_or_create(
        &self,
        kind: LabelKind,
        owner: AccountId,
        name: &str,
    ) -> Result<(i64, String)> {
        let name = normalize_label(name)?;
        let mut state = self.state.lock().await;
        let lower = name.to_lowercase();
        if let Some((id, label)) = kind
            .table(&mut state)
            .iter()
            .find(|(_, l)| l.owner == owner && l.name.to_lowercase() == lower)
        {
            return Ok((*id, label.name.clone()));
        }
        let id = state.next_id();
        kind.table(&mut state).insert(
            id,
            LabelRow {
                owner,
                name: name.clone(),
            },
        );
        Ok((id, name))
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn create_with_password(&self, req: NewAccount) -> Result<Account> {
        let mut state = self.state.lock().await;
        if state
            .accounts
            .values()
            .any(|a| a.account.username == req.username)
        {
            return Err(Error::Conflict(format!("username {} is taken", req.username)));
        }
        let id = state.next_id();
        let account = Account {
            id,
            username: req.username,
            telegram_id: None,
            telegram_username: None,
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
            has_password: true,
            created_at: Utc::now(),
        };
        state.accounts.insert(
            id,
            AccountRow {
                account: account.clone(),
                password_hash: Some(req.password_hash),
            },
        );
        Ok(account)
    }

    async fn get(&self, id: AccountId) -> Result<Account> {
        self.state
            .lock()
            .await
            .accounts
            .get(&id)
            .map(|row| row.account.clone())
            .ok_or_else(|| Error::not_found("account", id))
    }

    async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<Account>> {
        Ok(self
            .state
            .lock()
            .await
            .accounts
            .values()
            .find(|row| row.account.telegram_id == Some(telegram_id))
            .map(|row| row.account.clone()))
    }

    async fn credentials(&self, username: &str) -> Result<Option<AccountCredentials>> {
        Ok(self
            .state
            .lock()
            .await
            .accounts
            .values()
            .find(|row| row.account.username == username)
            .map(|row| AccountCredentials {
                account: row.account.clone(),
                password_hash: row.password_hash.clone(),
            }))
    }

    async fn reconcile_external(&self, profile: &ExternalProfile) -> Result<Reconciled> {
        // Lookup and insert happen under one lock, which is the atomicity
        // the unique constraint gives the Postgres backend.
        let mut state = self.state.lock().await;
        if let Some(row) = state
            .accounts
            .values()
            .find(|row| row.account.telegram_id == Some(profile.telegram_id))
        {
            return Ok(Reconciled {
                account: row.account.clone(),
                created: false,
            });
        }

        let username = profile.placeholder_username();
        if state.accounts.values().any(|a| a.account.username == username) {
            return Err(Error::Conflict(format!("username {} is taken", username)));
        }
        let id = state.next_id();
        let account = Account {
            id,
            username,
            telegram_id: Some(profile.telegram_id),
            telegram_username: profile.username.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            is_active: true,
            has_password: false,
            created_at: Utc::now(),
        };
        state.accounts.insert(
            id,
            AccountRow {
                account: account.clone(),
                password_hash: None,
            },
        );
        Ok(Reconciled {
            account,
            created: true,
        })
    }
}

#[async_trait]
impl NoteRepository for MemoryStore {
    async fn create(&self, owner: AccountId, input: NoteInput) -> Result<Note> {
        validate_note_input(&input)?;
        let mut state = self.state.lock().await;
        let tag_ids = state.check_labels(owner, &input)?;
        let id = state.next_id();
        let now = Utc::now();
        let row = NoteRow {
            owner,
            title: input.title.trim().to_string(),
            content: input.content,
            created_at: now,
            updated_at: now,
            deadline: input.deadline,
            category_id: input.category_id,
        };
        state.notes.insert(id, row);
        state.replace_tags(id, &tag_ids);
        let row = state.owned_note(owner, id)?;
        Ok(state.note(id, row))
    }

    async fn get(&self, owner: AccountId, id: i64) -> Result<Note> {
        let state = self.state.lock().await;
        let row = state.owned_note(owner, id)?;
        Ok(state.note(id, row))
    }

    async fn list(&self, owner: AccountId, req: ListNotesRequest) -> Result<Vec<Note>> {
        let state = self.state.lock().await;
        let offset = req.offset.unwrap_or(0).max(0) as usize;
        let limit = req.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(state
            .notes_of(owner)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn search(&self, owner: AccountId, query: &str, limit: i64) -> Result<Vec<Note>> {
        let needle = query.trim().to_lowercase();
        let state = self.state.lock().await;
        Ok(state
            .notes_of(owner)
            .into_iter()
            .filter(|n| {
                n.title.to_lowercase().contains(&needle)
                    || n.content.to_lowercase().contains(&needle)
                    || n.tags.iter().any(|t| t.name.to_lowercase().contains(&needle))
            })
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn update(&self, owner: AccountId, id: i64, input: NoteInput) -> Result<Note> {
        validate_note_input(&input)?;
        let mut state = self.state.lock().await;
        state.owned_note(owner, id)?;
        let tag_ids = state.check_labels(owner, &input)?;
        if let Some(row) = state.notes.get_mut(&id) {
            row.title = input.title.trim().to_string();
            row.content = input.content;
            row.deadline = input.deadline;
            row.category_id = input.category_id;
            row.updated_at = Utc::now();
        }
        state.replace_tags(id, &tag_ids);
        let row = state.owned_note(owner, id)?;
        Ok(state.note(id, row))
    }

    async fn set_deadline(
        &self,
        owner: AccountId,
        id: i64,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<Note> {
        let mut state = self.state.lock().await;
        state.owned_note(owner, id)?;
        if let Some(row) = state.notes.get_mut(&id) {
            row.deadline = deadline;
            row.updated_at = Utc::now();
        }
        let row = state.owned_note(owner, id)?;
        Ok(state.note(id, row))
    }

    async fn delete(&self, owner: AccountId, id: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        state.owned_note(owner, id)?;
        state.notes.remove(&id);
        state.note_tags.retain(|(nid, _)| *nid != id);
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn create(&self, owner: AccountId, name: &str) -> Result<Category> {
        let (id, name) = self.label_create(LabelKind::Category, owner, name).await?;
        Ok(Category { id, name })
    }

    async fn get(&self, owner: AccountId, id: i64) -> Result<Category> {
        let (id, name) = self.label_get(LabelKind::Category, owner, id).await?;
        Ok(Category { id, name })
    }

    async fn list(&self, owner: AccountId) -> Result<Vec<Category>> {
        Ok(self
            .label_list(LabelKind::Category, owner)
            .await
            .into_iter()
            .map(|(id, name)| Category { id, name })
            .collect())
    }

    async fn rename(&self, owner: AccountId, id: i64, name: &str) -> Result<Category> {
        let (id, name) = self.label_rename(LabelKind::Category, owner, id, name).await?;
        Ok(Category { id, name })
    }

    async fn delete(&self, owner: AccountId, id: i64) -> Result<()> {
        self.label_delete(LabelKind::Category, owner, id).await
    }

    async fn get_or_create(&self, owner: AccountId, name: &str) -> Result<Category> {
        let (id, name) = self
            .label_get_or_create(LabelKind::Category, owner, name)
            .await?;
        Ok(Category { id, name })
    }
}

#[async_trait]
impl TagRepository for MemoryStore {
    async fn create(&self, owner: AccountId, name: &str) -> Result<Tag> {
        let (id, name) = self.label_create(LabelKind::Tag, owner, name).await?;
        Ok(Tag { id, name })
    }

    async fn get(&self, owner: AccountId, id: i64) -> Result<Tag> {
        let (id, name) = self.label_get(LabelKind::Tag, owner, id).await?;
        Ok(Tag { id, name })
    }

    async fn list(&self, owner: AccountId) -> Result<Vec<Tag>> {
        Ok(self
            .label_list(LabelKind::Tag, owner)
            .await
            .into_iter()
            .map(|(id, name)| Tag { id, name })
            .collect())
    }

    async fn rename(&self, owner: AccountId, id: i64, name: &str) -> Result<Tag> {
        let (id, name) = self.label_rename(LabelKind::Tag, owner, id, name).await?;
        Ok(Tag { id, name })
    }

    async fn delete(&self, owner: AccountId, id: i64) -> Result<()> {
        self.label_delete(LabelKind::Tag, owner, id).await
    }

    async fn get_or_create(&self, owner: AccountId, name: &str) -> Result<Tag> {
        let (id, name) = self
            .label_get_or_create(LabelKind::Tag, owner, name)
            .await?;
        Ok(Tag { id, name })
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn insert(
        &self,
        token_hash: &str,
        account_id: AccountId,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.sessions.contains_key(token_hash) {
            return Err(Error::Conflict("session already exists".to_string()));
        }
        state
            .sessions
            .insert(token_hash.to_string(), (account_id, expires_at));
        Ok(())
    }

    async fn account_for(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AccountId>> {
        Ok(self
            .state
            .lock()
            .await
            .sessions
            .get(token_hash)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(account_id, _)| *account_id))
    }

    async fn delete(&self, token_hash: &str) -> Result<()> {
        self.state.lock().await.sessions.remove(token_hash);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, (_, expires_at)| *expires_at > now);
        Ok((before - state.sessions.len()) as u64)
    }
}
