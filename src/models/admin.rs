//! Moderation rows: reports, admins and bans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of content a report points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Post,
    Comment,
    Profile,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Post => write!(f, "post"),
            Self::Comment => write!(f, "comment"),
            Self::Profile => write!(f, "profile"),
        }
    }
}

/// Review state of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Reviewed,
    Dismissed,
    Actioned,
}

impl ReportStatus {
    /// Column value used in backend filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Dismissed => "dismissed",
            Self::Actioned => "actioned",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user report against some content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub content_type: ContentType,
    pub content_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReport {
    pub content_type: ContentType,
    pub content_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: String,
    pub status: ReportStatus,
}

/// Administrative role, ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Moderator,
    Admin,
    SuperAdmin,
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Moderator => write!(f, "Moderator"),
            Self::Admin => write!(f, "Admin"),
            Self::SuperAdmin => write!(f, "Super Admin"),
        }
    }
}

impl std::str::FromStr for AdminRole {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "moderator" | "mod" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            "super_admin" | "superadmin" => Ok(Self::SuperAdmin),
            other => Err(crate::Error::validation(format!(
                "unknown admin role '{}'",
                other
            ))),
        }
    }
}

/// Individually grantable admin capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Ban,
    DeleteContent,
    ManageRoles,
}

/// An admin-console member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admin {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: AdminRole,
    #[serde(default)]
    pub can_ban: bool,
    #[serde(default)]
    pub can_delete_content: bool,
    #[serde(default)]
    pub can_manage_roles: bool,
    pub created_at: DateTime<Utc>,
}

impl Admin {
    /// Whether this admin may perform `permission`. Super admins may do anything.
    pub fn can(&self, permission: Permission) -> bool {
        if self.role == AdminRole::SuperAdmin {
            return true;
        }
        match permission {
            Permission::Ban => self.can_ban,
            Permission::DeleteContent => self.can_delete_content,
            Permission::ManageRoles => self.can_manage_roles,
        }
    }

    /// Default permission flags granted with a role.
    pub fn flags_for(role: AdminRole) -> (bool, bool, bool) {
        match role {
            AdminRole::Moderator => (false, true, false),
            AdminRole::Admin => (true, true, false),
            AdminRole::SuperAdmin => (true, true, true),
        }
    }
}

/// A ban on a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ban {
    pub id: Uuid,
    pub user_id: Uuid,
    pub banned_by: Uuid,
    pub reason: String,
    /// `None` means permanent.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Ban {
    /// Whether the ban still applies at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires| expires > now)
    }
}

/// Insert payload for a ban.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBan {
    pub user_id: Uuid,
    pub banned_by: Uuid,
    pub reason: String,
    pub expires_at: Option<DateTime<Utc>>,
}
