//! Posts, comments, likes and watchlist rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Market opinion attached to a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "Bullish"),
            Self::Bearish => write!(f, "Bearish"),
            Self::Neutral => write!(f, "Neutral"),
        }
    }
}

impl Sentiment {
    /// Next sentiment in the compose-form cycle.
    pub fn cycle(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(Self::Bullish),
            Some(Self::Bullish) => Some(Self::Bearish),
            Some(Self::Bearish) => Some(Self::Neutral),
            Some(Self::Neutral) => None,
        }
    }
}

/// A post in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub coin_id: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload for a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub user_id: Uuid,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coin_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
}

/// A like on a post. One per (post, user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a like.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLike {
    pub post_id: Uuid,
    pub user_id: Uuid,
}

/// A coin on a user's watchlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteCoin {
    pub id: Uuid,
    pub user_id: Uuid,
    pub coin_id: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a watchlist entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFavorite {
    pub user_id: Uuid,
    pub coin_id: String,
}
