//! Typed data access over a [`Backend`].

use super::{Backend, ChangeFeed, Query, Session, Table};
use crate::alerts::AlertStore;
use crate::error::{Error, Result};
use crate::models::{
    Admin, AdminRole, Ban, Comment, FavoriteCoin, Like, NewBan, NewComment, NewFavorite, NewLike,
    NewPost, NewPriceAlert, NewReport, Post, PriceAlert, Profile, ProfileUpdate, Report,
    ReportStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

/// Default number of posts loaded into the feed.
pub const FEED_PAGE_SIZE: usize = 50;

/// Typed CRUD wrappers for every entity the client touches.
#[derive(Clone)]
pub struct Repository {
    backend: Arc<dyn Backend>,
}

impl Repository {
    /// Wrap a backend.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    async fn select<T: DeserializeOwned>(&self, table: Table, query: &Query) -> Result<Vec<T>> {
        self.backend
            .select(table, query)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(Error::from))
            .collect()
    }

    async fn select_one<T: DeserializeOwned>(&self, table: Table, query: Query) -> Result<Option<T>> {
        Ok(self.select(table, &query.limit(1)).await?.into_iter().next())
    }

    async fn insert<N: Serialize, T: DeserializeOwned>(&self, table: Table, row: &N) -> Result<T> {
        let row = self.backend.insert(table, serde_json::to_value(row)?).await?;
        Ok(serde_json::from_value(row)?)
    }

    async fn update<T: DeserializeOwned>(
        &self,
        table: Table,
        query: &Query,
        patch: Value,
    ) -> Result<Vec<T>> {
        self.backend
            .update(table, query, patch)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(Error::from))
            .collect()
    }

    fn by_id(id: Uuid) -> Query {
        Query::new().eq("id", id.to_string())
    }

    // Auth

    /// Register an account and create its profile.
    pub async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<Session> {
        if self.find_profile_by_username(username).await?.is_some() {
            return Err(Error::validation(format!(
                "username '{}' is already taken",
                username
            )));
        }
        let session = self.backend.sign_up(email, password).await?;
        self.create_profile(session.user_id, username).await?;
        Ok(session)
    }

    /// Open a session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.backend.sign_in(email, password).await
    }

    /// Close the session.
    pub async fn sign_out(&self) -> Result<()> {
        self.backend.sign_out().await
    }

    /// Subscribe to one table's changes.
    pub fn subscribe(&self, table: Table, filter: Query) -> Result<ChangeFeed> {
        self.backend.subscribe(table, filter)
    }

    // Profiles

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.select_one(Table::Profiles, Self::by_id(user_id)).await
    }

    pub async fn find_profile_by_username(&self, username: &str) -> Result<Option<Profile>> {
        self.select_one(Table::Profiles, Query::new().eq("username", username))
            .await
    }

    pub async fn list_profiles(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::new().one_of("id", user_ids.iter().map(|id| id.to_string()));
        self.select(Table::Profiles, &query).await
    }

    pub async fn create_profile(&self, user_id: Uuid, username: &str) -> Result<Profile> {
        let row = json!({
            "id": user_id,
            "username": username,
            "is_private": false,
            "show_watchlist": true,
        });
        self.insert(Table::Profiles, &row).await
    }

    pub async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<Profile> {
        self.update(Table::Profiles, &Self::by_id(user_id), serde_json::to_value(update)?)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::backend(format!("profile {} not found", user_id)))
    }

    // Posts

    /// Newest posts first.
    pub async fn list_posts(&self, limit: usize) -> Result<Vec<Post>> {
        let query = Query::new().order_by("created_at", false).limit(limit);
        self.select(Table::Posts, &query).await
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        self.select_one(Table::Posts, Self::by_id(post_id)).await
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        self.insert(Table::Posts, post).await
    }

    pub async fn delete_post(&self, post_id: Uuid) -> Result<bool> {
        Ok(self.backend.delete(Table::Posts, &Self::by_id(post_id)).await? > 0)
    }

    // Comments

    /// Comments on a post, oldest first.
    pub async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let query = Query::new()
            .eq("post_id", post_id.to_string())
            .order_by("created_at", true);
        self.select(Table::Comments, &query).await
    }

    pub async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        self.select_one(Table::Comments, Self::by_id(comment_id)).await
    }

    pub async fn create_comment(&self, comment: &NewComment) -> Result<Comment> {
        self.insert(Table::Comments, comment).await
    }

    pub async fn delete_comment(&self, comment_id: Uuid) -> Result<bool> {
        Ok(self
            .backend
            .delete(Table::Comments, &Self::by_id(comment_id))
            .await?
            > 0)
    }

    // Likes

    pub async fn likes_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<Like>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::new().one_of("post_id", post_ids.iter().map(|id| id.to_string()));
        self.select(Table::Likes, &query).await
    }

    /// Like the post, or remove the like if present. Returns whether the post is now liked.
    pub async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool> {
        let query = Query::new()
            .eq("post_id", post_id.to_string())
            .eq("user_id", user_id.to_string());

        if self.backend.delete(Table::Likes, &query).await? > 0 {
            return Ok(false);
        }
        let _: Like = self
            .insert(Table::Likes, &NewLike { post_id, user_id })
            .await?;
        Ok(true)
    }

    // Watchlist

    pub async fn list_favorites(&self, user_id: Uuid) -> Result<Vec<FavoriteCoin>> {
        let query = Query::new()
            .eq("user_id", user_id.to_string())
            .order_by("created_at", true);
        self.select(Table::FavoriteCoins, &query).await
    }

    /// Add the coin to the watchlist, or remove it if present. Returns whether it is now watched.
    pub async fn toggle_favorite(&self, user_id: Uuid, coin_id: &str) -> Result<bool> {
        let query = Query::new()
            .eq("user_id", user_id.to_string())
            .eq("coin_id", coin_id);

        if self.backend.delete(Table::FavoriteCoins, &query).await? > 0 {
            return Ok(false);
        }
        let favorite = NewFavorite {
            user_id,
            coin_id: coin_id.to_string(),
        };
        let _: FavoriteCoin = self.insert(Table::FavoriteCoins, &favorite).await?;
        Ok(true)
    }

    // Alerts

    /// Every alert of a user, newest first.
    pub async fn list_alerts(&self, user_id: Uuid) -> Result<Vec<PriceAlert>> {
        let query = Query::new()
            .eq("user_id", user_id.to_string())
            .order_by("created_at", false);
        self.select(Table::PriceAlerts, &query).await
    }

    /// Alerts that are active and have never triggered.
    pub async fn armed_alerts(&self, user_id: Uuid) -> Result<Vec<PriceAlert>> {
        let query = Query::new()
            .eq("user_id", user_id.to_string())
            .eq("is_active", true)
            .is_null("triggered_at");
        self.select(Table::PriceAlerts, &query).await
    }

    pub async fn create_alert(&self, alert: &NewPriceAlert) -> Result<PriceAlert> {
        self.insert(Table::PriceAlerts, alert).await
    }

    pub async fn delete_alert(&self, alert_id: Uuid) -> Result<bool> {
        Ok(self
            .backend
            .delete(Table::PriceAlerts, &Self::by_id(alert_id))
            .await?
            > 0)
    }

    /// Deactivate an alert and stamp its trigger time.
    pub async fn mark_alert_triggered(&self, alert_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let patch = json!({ "is_active": false, "triggered_at": at });
        let updated: Vec<PriceAlert> = self
            .update(Table::PriceAlerts, &Self::by_id(alert_id), patch)
            .await?;
        if updated.is_empty() {
            return Err(Error::backend(format!("alert {} not found", alert_id)));
        }
        Ok(())
    }

    // Reports

    pub async fn create_report(&self, report: &NewReport) -> Result<Report> {
        self.insert(Table::Reports, report).await
    }

    /// Reports, optionally narrowed to one status, newest first.
    pub async fn list_reports(&self, status: Option<ReportStatus>) -> Result<Vec<Report>> {
        let mut query = Query::new().order_by("created_at", false);
        if let Some(status) = status {
            query = query.eq("status", status.as_str());
        }
        self.select(Table::Reports, &query).await
    }

    pub async fn get_report(&self, report_id: Uuid) -> Result<Option<Report>> {
        self.select_one(Table::Reports, Self::by_id(report_id)).await
    }

    pub async fn set_report_status(&self, report_id: Uuid, status: ReportStatus) -> Result<Report> {
        self.update(
            Table::Reports,
            &Self::by_id(report_id),
            json!({ "status": status }),
        )
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::backend(format!("report {} not found", report_id)))
    }

    // Admins

    pub async fn find_admin(&self, user_id: Uuid) -> Result<Option<Admin>> {
        self.select_one(Table::Admins, Query::new().eq("user_id", user_id.to_string()))
            .await
    }

    pub async fn list_admins(&self) -> Result<Vec<Admin>> {
        self.select(Table::Admins, &Query::new().order_by("created_at", true))
            .await
    }

    /// Grant `role` with its default flags, replacing any existing grant.
    pub async fn set_admin_role(&self, user_id: Uuid, role: AdminRole) -> Result<Admin> {
        let (can_ban, can_delete_content, can_manage_roles) = Admin::flags_for(role);
        let fields = json!({
            "role": role,
            "can_ban": can_ban,
            "can_delete_content": can_delete_content,
            "can_manage_roles": can_manage_roles,
        });

        let query = Query::new().eq("user_id", user_id.to_string());
        let updated: Vec<Admin> = self.update(Table::Admins, &query, fields.clone()).await?;
        if let Some(admin) = updated.into_iter().next() {
            return Ok(admin);
        }

        let mut row = fields;
        row["user_id"] = json!(user_id);
        self.insert(Table::Admins, &row).await
    }

    pub async fn remove_admin(&self, user_id: Uuid) -> Result<bool> {
        let query = Query::new().eq("user_id", user_id.to_string());
        Ok(self.backend.delete(Table::Admins, &query).await? > 0)
    }

    // Bans

    pub async fn list_bans(&self) -> Result<Vec<Ban>> {
        self.select(Table::Bans, &Query::new().order_by("created_at", false))
            .await
    }

    /// A ban on `user_id` still in force at `now`.
    pub async fn active_ban(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Option<Ban>> {
        let bans: Vec<Ban> = self
            .select(Table::Bans, &Query::new().eq("user_id", user_id.to_string()))
            .await?;
        Ok(bans.into_iter().find(|b| b.is_active(now)))
    }

    pub async fn create_ban(&self, ban: &NewBan) -> Result<Ban> {
        self.insert(Table::Bans, ban).await
    }

    /// Lift every ban on a user.
    pub async fn delete_bans(&self, user_id: Uuid) -> Result<usize> {
        let query = Query::new().eq("user_id", user_id.to_string());
        self.backend.delete(Table::Bans, &query).await
    }

    // Storage

    /// Upload a file and return its public URL.
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        self.backend.upload(bucket, path, bytes, content_type).await
    }
}

#[async_trait]
impl AlertStore for Repository {
    async fn armed_alerts(&self, user_id: Uuid) -> Result<Vec<PriceAlert>> {
        Repository::armed_alerts(self, user_id).await
    }

    async fn mark_triggered(&self, alert_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.mark_alert_triggered(alert_id, at).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::models::AlertCondition;
    use rust_decimal_macros::dec;

    fn repo() -> Repository {
        Repository::new(Arc::new(MemoryBackend::new()))
    }

    #[tokio::test]
    async fn test_sign_up_creates_profile() {
        let repo = repo();
        let session = repo
            .sign_up("satoshi@example.com", "password1", "satoshi")
            .await
            .unwrap();

        let profile = repo.get_profile(session.user_id).await.unwrap().unwrap();
        assert_eq!(profile.username, "satoshi");
        assert!(profile.show_watchlist);

        let taken = repo.sign_up("other@example.com", "password1", "satoshi").await;
        assert!(matches!(taken, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_alert_round_trip_through_backend() {
        let repo = repo();
        let user = Uuid::new_v4();
        let alert = repo
            .create_alert(&NewPriceAlert::new(user, "bitcoin", dec!(70000.5), AlertCondition::Above))
            .await
            .unwrap();

        assert_eq!(alert.target_price, dec!(70000.5));
        assert!(alert.is_armed());
        assert_eq!(repo.armed_alerts(user).await.unwrap().len(), 1);

        repo.mark_alert_triggered(alert.id, Utc::now()).await.unwrap();
        assert!(repo.armed_alerts(user).await.unwrap().is_empty());

        let stored = repo.list_alerts(user).await.unwrap();
        assert!(!stored[0].is_active);
        assert!(stored[0].triggered_at.is_some());
    }

    #[tokio::test]
    async fn test_mark_missing_alert_fails() {
        let repo = repo();
        assert!(repo.mark_alert_triggered(Uuid::new_v4(), Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn test_toggle_like_and_favorite() {
        let repo = repo();
        let (post, user) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(repo.toggle_like(post, user).await.unwrap());
        assert_eq!(repo.likes_for_posts(&[post]).await.unwrap().len(), 1);
        assert!(!repo.toggle_like(post, user).await.unwrap());
        assert!(repo.likes_for_posts(&[post]).await.unwrap().is_empty());

        assert!(repo.toggle_favorite(user, "solana").await.unwrap());
        assert_eq!(repo.list_favorites(user).await.unwrap()[0].coin_id, "solana");
        assert!(!repo.toggle_favorite(user, "solana").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_admin_role_upserts() {
        let repo = repo();
        let user = Uuid::new_v4();

        let admin = repo.set_admin_role(user, AdminRole::Moderator).await.unwrap();
        assert!(!admin.can_ban);

        let admin = repo.set_admin_role(user, AdminRole::Admin).await.unwrap();
        assert_eq!(admin.role, AdminRole::Admin);
        assert!(admin.can_ban);
        assert_eq!(repo.list_admins().await.unwrap().len(), 1);
    }
}
