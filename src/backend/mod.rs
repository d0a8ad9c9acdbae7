//! Managed backend integration.
//!
//! The backend is a black box offering table-level CRUD on JSON rows, a
//! change feed keyed by table and row filter, password sessions and file
//! storage. Two implementations exist: [`RestBackend`] talks to a
//! PostgREST/GoTrue-style service over HTTP, [`MemoryBackend`] keeps
//! everything in process for offline use and tests. Typed access goes
//! through [`Repository`].

mod memory;
mod query;
mod repository;
mod rest;

pub use memory::MemoryBackend;
pub use query::{Filter, Query};
pub use repository::{FEED_PAGE_SIZE, Repository};
pub use rest::RestBackend;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use uuid::Uuid;

/// Tables the client reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Profiles,
    Posts,
    Comments,
    Likes,
    FavoriteCoins,
    PriceAlerts,
    Reports,
    Admins,
    Bans,
}

impl Table {
    /// Every table, in a stable order.
    pub const ALL: [Table; 9] = [
        Table::Profiles,
        Table::Posts,
        Table::Comments,
        Table::Likes,
        Table::FavoriteCoins,
        Table::PriceAlerts,
        Table::Reports,
        Table::Admins,
        Table::Bans,
    ];

    /// Table name on the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::Posts => "posts",
            Self::Comments => "comments",
            Self::Likes => "likes",
            Self::FavoriteCoins => "favorite_coins",
            Self::PriceAlerts => "price_alerts",
            Self::Reports => "reports",
            Self::Admins => "admin_users",
            Self::Bans => "user_bans",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row change pushed by the backend.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    /// New row for inserts/updates, old row for deletes.
    pub row: Value,
}

/// Subscription to one table's changes, narrowed by a row filter.
pub struct ChangeFeed {
    table: Table,
    filter: Query,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl ChangeFeed {
    /// Wrap a raw receiver.
    pub fn new(table: Table, filter: Query, rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Self { table, filter, rx }
    }

    /// The subscribed table.
    pub fn table(&self) -> Table {
        self.table
    }

    /// Next matching event. `None` once the backend side closes.
    ///
    /// Lagged receivers skip ahead; subscribers re-fetch whole lists, so
    /// missing intermediate events is harmless.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event.row) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(table = %self.table, skipped, "change feed lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Convert into a stream of matching events.
    pub fn into_stream(self) -> impl Stream<Item = ChangeEvent> + Send + Unpin + 'static {
        let filter = self.filter;
        BroadcastStream::new(self.rx).filter_map(move |item| match item {
            Ok(event) if filter.matches(&event.row) => Some(event),
            _ => None,
        })
    }
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user_id: Uuid,
    pub email: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether the token has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Operations offered by the managed backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Rows of `table` matching `query`.
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>>;

    /// Insert a row, returning it with server-assigned columns.
    async fn insert(&self, table: Table, row: Value) -> Result<Value>;

    /// Apply `patch` to every row matching `query`, returning updated rows.
    async fn update(&self, table: Table, query: &Query, patch: Value) -> Result<Vec<Value>>;

    /// Delete rows matching `query`, returning how many were removed.
    async fn delete(&self, table: Table, query: &Query) -> Result<usize>;

    /// Subscribe to changes of `table` whose row matches `filter`.
    fn subscribe(&self, table: Table, filter: Query) -> Result<ChangeFeed>;

    /// Register a new account and open a session.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session>;

    /// Open a session with email and password.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// Close the current session.
    async fn sign_out(&self) -> Result<()>;

    /// Store a file and return its public URL.
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str)
    -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_change_feed_filters_rows() {
        let (tx, rx) = broadcast::channel(8);
        let mut feed = ChangeFeed::new(Table::PriceAlerts, Query::new().eq("user_id", "u1"), rx);

        tx.send(ChangeEvent {
            table: Table::PriceAlerts,
            kind: ChangeKind::Insert,
            row: json!({"user_id": "u2"}),
        })
        .unwrap();
        tx.send(ChangeEvent {
            table: Table::PriceAlerts,
            kind: ChangeKind::Update,
            row: json!({"user_id": "u1"}),
        })
        .unwrap();
        drop(tx);

        let event = feed.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Update);
        assert!(feed.recv().await.is_none());
    }

    #[test]
    fn test_change_stream_wakes_on_matching_row() {
        use tokio_test::{assert_pending, assert_ready, task};

        let (tx, rx) = broadcast::channel(8);
        let mut stream = ChangeFeed::new(Table::Likes, Query::new().eq("post_id", "p1"), rx)
            .into_stream();
        let mut next = task::spawn(async move { stream.next().await });

        assert_pending!(next.poll());

        tx.send(ChangeEvent {
            table: Table::Likes,
            kind: ChangeKind::Delete,
            row: json!({"post_id": "p1"}),
        })
        .unwrap();
        assert!(next.is_woken());

        let event = assert_ready!(next.poll()).unwrap();
        assert_eq!(event.kind, ChangeKind::Delete);
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let mut session = Session {
            access_token: "t".to_string(),
            user_id: Uuid::new_v4(),
            email: "a@b.c".to_string(),
            expires_at: None,
        };
        assert!(!session.is_expired(now));
        session.expires_at = Some(now - chrono::Duration::seconds(1));
        assert!(session.is_expired(now));
    }
}
