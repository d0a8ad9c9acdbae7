//! Moderation console: reports, bans and admin roles.

use crate::backend::Repository;
use crate::error::{Error, Result};
use crate::models::{Admin, AdminRole, Ban, ContentType, NewBan, Permission, Report, ReportStatus};
use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

/// Admin operations, each checked against the acting admin's permissions.
#[derive(Clone)]
pub struct AdminService {
    repo: Repository,
}

impl AdminService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// The admin grant of `user_id`, if any.
    pub async fn admin(&self, user_id: Uuid) -> Result<Option<Admin>> {
        self.repo.find_admin(user_id).await
    }

    async fn require_admin(&self, actor: Uuid) -> Result<Admin> {
        self.repo
            .find_admin(actor)
            .await?
            .ok_or_else(|| Error::permission("admin access required"))
    }

    async fn require(&self, actor: Uuid, permission: Permission) -> Result<Admin> {
        let admin = self.require_admin(actor).await?;
        if !admin.can(permission) {
            warn!(%actor, ?permission, "Admin action denied");
            return Err(Error::permission(format!(
                "{} role lacks {:?} permission",
                admin.role, permission
            )));
        }
        Ok(admin)
    }

    // Reports

    /// Reports waiting for review, newest first.
    pub async fn pending_reports(&self, actor: Uuid) -> Result<Vec<Report>> {
        self.require_admin(actor).await?;
        self.repo.list_reports(Some(ReportStatus::Pending)).await
    }

    pub async fn dismiss_report(&self, actor: Uuid, report_id: Uuid) -> Result<Report> {
        self.require_admin(actor).await?;
        let report = self
            .repo
            .set_report_status(report_id, ReportStatus::Dismissed)
            .await?;
        info!(%actor, %report_id, "Report dismissed");
        Ok(report)
    }

    /// Delete the reported content and mark the report actioned.
    ///
    /// Reported profiles cannot be deleted from here; ban the user instead.
    pub async fn action_report(&self, actor: Uuid, report_id: Uuid) -> Result<Report> {
        self.require(actor, Permission::DeleteContent).await?;
        let report = self
            .repo
            .get_report(report_id)
            .await?
            .ok_or_else(|| Error::validation("report no longer exists"))?;

        let removed = match report.content_type {
            ContentType::Post => self.repo.delete_post(report.content_id).await?,
            ContentType::Comment => self.repo.delete_comment(report.content_id).await?,
            ContentType::Profile => {
                return Err(Error::validation(
                    "profiles cannot be deleted; ban the user instead",
                ));
            }
        };
        if !removed {
            warn!(%report_id, content_id = %report.content_id, "Reported content was already gone");
        }

        let report = self
            .repo
            .set_report_status(report_id, ReportStatus::Actioned)
            .await?;
        info!(%actor, %report_id, content_type = %report.content_type, "Report actioned");
        Ok(report)
    }

    // Bans

    pub async fn bans(&self, actor: Uuid) -> Result<Vec<Ban>> {
        self.require_admin(actor).await?;
        self.repo.list_bans().await
    }

    /// Ban `user_id`, permanently when `duration` is `None`.
    pub async fn ban_user(
        &self,
        actor: Uuid,
        user_id: Uuid,
        reason: &str,
        duration: Option<Duration>,
    ) -> Result<Ban> {
        self.require(actor, Permission::Ban).await?;
        if actor == user_id {
            return Err(Error::validation("you cannot ban yourself"));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(Error::validation("a ban reason is required"));
        }

        let ban = self
            .repo
            .create_ban(&NewBan {
                user_id,
                banned_by: actor,
                reason: reason.to_string(),
                expires_at: duration.map(|d| Utc::now() + d),
            })
            .await?;
        info!(%actor, %user_id, expires_at = ?ban.expires_at, "User banned");
        Ok(ban)
    }

    /// Lift every ban on `user_id`. Returns how many were removed.
    pub async fn unban_user(&self, actor: Uuid, user_id: Uuid) -> Result<usize> {
        self.require(actor, Permission::Ban).await?;
        let removed = self.repo.delete_bans(user_id).await?;
        info!(%actor, %user_id, removed, "User unbanned");
        Ok(removed)
    }

    // Roles

    pub async fn admins(&self, actor: Uuid) -> Result<Vec<Admin>> {
        self.require_admin(actor).await?;
        self.repo.list_admins().await
    }

    pub async fn set_role(&self, actor: Uuid, user_id: Uuid, role: AdminRole) -> Result<Admin> {
        self.require(actor, Permission::ManageRoles).await?;
        if actor == user_id {
            return Err(Error::validation("you cannot change your own role"));
        }
        let admin = self.repo.set_admin_role(user_id, role).await?;
        info!(%actor, %user_id, %role, "Admin role set");
        Ok(admin)
    }

    pub async fn revoke(&self, actor: Uuid, user_id: Uuid) -> Result<bool> {
        self.require(actor, Permission::ManageRoles).await?;
        if actor == user_id {
            return Err(Error::validation("you cannot change your own role"));
        }
        let removed = self.repo.remove_admin(user_id).await?;
        info!(%actor, %user_id, removed, "Admin revoked");
        Ok(removed)
    }
}

/// Parse ban composer text: an optional leading duration such as `7d` or
/// `12h`, then the reason. No duration means a permanent ban.
pub fn parse_ban_input(input: &str) -> (Option<Duration>, String) {
    let input = input.trim();
    let (first, rest) = input.split_once(char::is_whitespace).unwrap_or((input, ""));

    let duration = first
        .strip_suffix('d')
        .and_then(|n| n.parse::<i64>().ok())
        .and_then(Duration::try_days)
        .or_else(|| {
            first
                .strip_suffix('h')
                .and_then(|n| n.parse::<i64>().ok())
                .and_then(Duration::try_hours)
        })
        .filter(|d| *d > Duration::zero());

    match duration {
        Some(duration) => (Some(duration), rest.trim().to_string()),
        None => (None, input.to_string()),
    }
}
