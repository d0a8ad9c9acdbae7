//! In-process backend for offline mode and tests.

use super::{Backend, ChangeEvent, ChangeFeed, ChangeKind, Query, Session, Table};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use std::collections::HashMap;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

/// Buffered change events per table before slow subscribers lag.
const FEED_CAPACITY: usize = 256;

struct Account {
    password: String,
    user_id: Uuid,
}

/// Backend that keeps tables, accounts and files in memory.
///
/// Inserted rows get an `id` and `created_at` when they lack one. Every
/// write is published on the table's change feed.
pub struct MemoryBackend {
    tables: RwLock<HashMap<Table, Vec<Value>>>,
    accounts: RwLock<HashMap<String, Account>>,
    files: RwLock<HashMap<String, Vec<u8>>>,
    session: RwLock<Option<Session>>,
    feeds: HashMap<Table, broadcast::Sender<ChangeEvent>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        let feeds = Table::ALL
            .iter()
            .map(|table| (*table, broadcast::channel(FEED_CAPACITY).0))
            .collect();

        Self {
            tables: RwLock::new(HashMap::new()),
            accounts: RwLock::new(HashMap::new()),
            files: RwLock::new(HashMap::new()),
            session: RwLock::new(None),
            feeds,
        }
    }

    /// The currently signed-in session, if any.
    pub async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Bytes stored at `bucket/path`.
    pub async fn file(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.files
            .read()
            .await
            .get(&format!("{}/{}", bucket, path))
            .cloned()
    }

    fn publish(&self, table: Table, kind: ChangeKind, row: Value) {
        if let Some(tx) = self.feeds.get(&table) {
            // No receivers is not an error.
            let _ = tx.send(ChangeEvent { table, kind, row });
        }
    }

    fn open_session(email: &str, user_id: Uuid) -> Session {
        Session {
            access_token: format!("local-{}", Uuid::new_v4()),
            user_id,
            email: email.to_string(),
            expires_at: None,
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Value> = tables
            .get(&table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();
        query.apply_order_and_limit(&mut rows);
        Ok(rows)
    }

    async fn insert(&self, table: Table, mut row: Value) -> Result<Value> {
        let object = row
            .as_object_mut()
            .ok_or_else(|| Error::backend(format!("insert into {} expects an object", table)))?;
        object
            .entry("id")
            .or_insert_with(|| json!(Uuid::new_v4()));
        object.entry("created_at").or_insert_with(|| {
            json!(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
        });

        self.tables
            .write()
            .await
            .entry(table)
            .or_default()
            .push(row.clone());

        self.publish(table, ChangeKind::Insert, row.clone());
        Ok(row)
    }

    async fn update(&self, table: Table, query: &Query, patch: Value) -> Result<Vec<Value>> {
        let patch = patch
            .as_object()
            .ok_or_else(|| Error::backend(format!("update of {} expects an object", table)))?
            .clone();

        let mut updated = Vec::new();
        {
            let mut tables = self.tables.write().await;
            for row in tables.entry(table).or_default().iter_mut() {
                if !query.matches(row) {
                    continue;
                }
                if let Some(object) = row.as_object_mut() {
                    for (key, value) in &patch {
                        object.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
        }

        for row in &updated {
            self.publish(table, ChangeKind::Update, row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: Table, query: &Query) -> Result<usize> {
        let removed: Vec<Value> = {
            let mut tables = self.tables.write().await;
            let rows = tables.entry(table).or_default();
            let (removed, kept): (Vec<Value>, Vec<Value>) =
                rows.drain(..).partition(|r| query.matches(r));
            *rows = kept;
            removed
        };

        let count = removed.len();
        for row in removed {
            self.publish(table, ChangeKind::Delete, row);
        }
        Ok(count)
    }

    fn subscribe(&self, table: Table, filter: Query) -> Result<ChangeFeed> {
        let tx = self
            .feeds
            .get(&table)
            .ok_or_else(|| Error::backend(format!("no change feed for {}", table)))?;
        Ok(ChangeFeed::new(table, filter, tx.subscribe()))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::validation("a valid email is required"));
        }
        if password.len() < 6 {
            return Err(Error::validation("password must be at least 6 characters"));
        }

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&email) {
            return Err(Error::auth("user already registered"));
        }

        let user_id = Uuid::new_v4();
        accounts.insert(
            email.clone(),
            Account {
                password: password.to_string(),
                user_id,
            },
        );
        drop(accounts);

        let session = Self::open_session(&email, user_id);
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let email = email.trim().to_lowercase();
        let user_id = {
            let accounts = self.accounts.read().await;
            match accounts.get(&email) {
                Some(account) if account.password == password => account.user_id,
                _ => return Err(Error::auth("invalid login credentials")),
            }
        };

        let session = Self::open_session(&email, user_id);
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        *self.session.write().await = None;
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String> {
        let key = format!("{}/{}", bucket, path);
        self.files.write().await.insert(key.clone(), bytes);
        Ok(format!("memory://{}", key))
    }
}
