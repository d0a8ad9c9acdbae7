//! User-facing social operations: posts, comments, likes, watchlist,
//! profiles, price alerts and reports.
//!
//! Every write is validated and passed through the moderation filter
//! before it reaches the backend.

use crate::backend::{FEED_PAGE_SIZE, Repository};
use crate::error::{Error, Result};
use crate::models::{
    AlertCondition, Comment, ContentType, FavoriteCoin, NewComment, NewPost, NewPriceAlert,
    NewReport, Post, PriceAlert, Profile, ProfileUpdate, Report, ReportStatus, Sentiment,
};
use crate::moderation::ModerationFilter;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

pub const MAX_POST_LEN: usize = 1000;
pub const MAX_COMMENT_LEN: usize = 500;
pub const MAX_BIO_LEN: usize = 160;
pub const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=30;
pub const MAX_POST_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

const POST_IMAGE_BUCKET: &str = "post-images";
const AVATAR_BUCKET: &str = "avatars";

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Read an image from disk. The content type follows the extension.
    pub async fn load(path: &Path) -> Result<Self> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::validation(format!("'{}' is not a file", path.display())))?
            .to_string();
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let content_type = match extension.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => {
                return Err(Error::validation(format!(
                    "'{}' is not a png, jpg, gif or webp image",
                    filename
                )));
            }
        };

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::validation(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(Self {
            filename,
            content_type: content_type.to_string(),
            bytes,
        })
    }

    fn extension(&self) -> &str {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or("bin")
    }
}

/// Draft of a post.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub content: String,
    pub coin_id: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub image: Option<Attachment>,
    /// Image named with `img:<path>`, read by [`PostDraft::attach_image`].
    pub image_path: Option<PathBuf>,
}

impl PostDraft {
    /// Build a draft from composer text. A `$coin` word tags the post with a
    /// coin and `#bullish`, `#bearish` or `#neutral` sets the sentiment.
    /// Both stay in the text. An `img:<path>` word names an image to attach
    /// and is removed from the text.
    pub fn parse(input: &str) -> Self {
        let mut image_path = None;
        let mut words = Vec::new();
        for word in input.split_whitespace() {
            match word.strip_prefix("img:") {
                Some(path) if !path.is_empty() && image_path.is_none() => {
                    image_path = Some(PathBuf::from(path));
                }
                _ => words.push(word),
            }
        }
        let content = if image_path.is_some() {
            words.join(" ")
        } else {
            input.trim().to_string()
        };

        // `$70000` is a price, not a coin.
        let coin_id = words
            .iter()
            .filter_map(|word| word.strip_prefix('$'))
            .map(|coin| coin.trim_end_matches(|c: char| !c.is_alphanumeric()))
            .find(|coin| coin.starts_with(|c: char| c.is_ascii_alphabetic()))
            .map(str::to_lowercase);

        let sentiment = input.split_whitespace().find_map(|word| {
            match word.to_lowercase().trim_end_matches(|c: char| !c.is_alphanumeric()) {
                "#bullish" => Some(Sentiment::Bullish),
                "#bearish" => Some(Sentiment::Bearish),
                "#neutral" => Some(Sentiment::Neutral),
                _ => None,
            }
        });

        Self {
            content,
            coin_id,
            sentiment,
            image: None,
            image_path,
        }
    }

    /// Read the image named in the text, if any.
    pub async fn attach_image(&mut self) -> Result<()> {
        if let Some(path) = self.image_path.take() {
            self.image = Some(Attachment::load(&path).await?);
        }
        Ok(())
    }
}

/// Parse profile composer text: a username, or `-` to keep the current
/// one, then an optional bio.
pub fn parse_profile_input(input: &str) -> Result<ProfileUpdate> {
    let input = input.trim();
    let (username, bio) = input.split_once(char::is_whitespace).unwrap_or((input, ""));
    if username.is_empty() {
        return Err(Error::validation("enter: username|- bio"));
    }

    let bio = bio.trim();
    Ok(ProfileUpdate {
        username: (username != "-").then(|| username.to_string()),
        bio: (!bio.is_empty()).then(|| bio.to_string()),
        ..Default::default()
    })
}

/// Parse alert composer text such as `above 70000` or `< 2500.5`.
pub fn parse_alert_input(input: &str) -> Result<(AlertCondition, Decimal)> {
    let mut parts = input.split_whitespace();
    let (Some(condition), Some(price), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(Error::validation("expected '<above|below> <price>'"));
    };

    let condition: AlertCondition = condition.parse()?;
    let price: Decimal = price
        .trim_start_matches('$')
        .replace(',', "")
        .parse()
        .map_err(|_| Error::validation(format!("'{}' is not a price", price)))?;
    Ok((condition, price))
}

/// A post with what the feed shows next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub post: Post,
    pub author: Option<Profile>,
    pub like_count: usize,
    pub liked_by_me: bool,
}

impl FeedItem {
    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .map(|p| p.username.as_str())
            .unwrap_or("unknown")
    }
}

/// Social operations on behalf of a user.
#[derive(Clone)]
pub struct SocialService {
    repo: Repository,
    filter: ModerationFilter,
}

impl SocialService {
    pub fn new(repo: Repository, filter: ModerationFilter) -> Self {
        Self { repo, filter }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    async fn ensure_not_banned(&self, user_id: Uuid) -> Result<()> {
        match self.repo.active_ban(user_id, Utc::now()).await? {
            Some(ban) => Err(Error::permission(format!("you are banned: {}", ban.reason))),
            None => Ok(()),
        }
    }

    fn moderate(&self, text: &str, filename: Option<&str>) -> Result<()> {
        self.filter.check(text, filename).into_result()
    }

    // Feed

    /// Newest posts with authors and like counts.
    pub async fn load_feed(&self, viewer: Option<Uuid>) -> Result<Vec<FeedItem>> {
        let posts = self.repo.list_posts(FEED_PAGE_SIZE).await?;
        self.decorate(posts, viewer).await
    }

    async fn decorate(&self, posts: Vec<Post>, viewer: Option<Uuid>) -> Result<Vec<FeedItem>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let author_ids: Vec<Uuid> = posts
            .iter()
            .map(|p| p.user_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let (likes, profiles) = futures::try_join!(
            self.repo.likes_for_posts(&post_ids),
            self.repo.list_profiles(&author_ids)
        )?;

        let profiles: HashMap<Uuid, Profile> =
            profiles.into_iter().map(|p| (p.id, p)).collect();
        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        let mut mine: HashSet<Uuid> = HashSet::new();
        for like in likes {
            *counts.entry(like.post_id).or_default() += 1;
            if Some(like.user_id) == viewer {
                mine.insert(like.post_id);
            }
        }

        Ok(posts
            .into_iter()
            .map(|post| FeedItem {
                author: profiles.get(&post.user_id).cloned(),
                like_count: counts.get(&post.id).copied().unwrap_or(0),
                liked_by_me: mine.contains(&post.id),
                post,
            })
            .collect())
    }

    // Posts

    pub async fn create_post(&self, user_id: Uuid, draft: PostDraft) -> Result<Post> {
        let content = draft.content.trim();
        if content.is_empty() {
            return Err(Error::validation("post cannot be empty"));
        }
        if content.chars().count() > MAX_POST_LEN {
            return Err(Error::validation(format!(
                "post is limited to {} characters",
                MAX_POST_LEN
            )));
        }
        if let Some(image) = &draft.image
            && image.bytes.len() > MAX_POST_IMAGE_BYTES
        {
            return Err(Error::validation("image must be 5 MB or smaller"));
        }

        self.moderate(content, draft.image.as_ref().map(|i| i.filename.as_str()))?;
        self.ensure_not_banned(user_id).await?;

        let image_url = match &draft.image {
            Some(image) => {
                let path = format!("{}/{}.{}", user_id, Uuid::new_v4(), image.extension());
                Some(
                    self.repo
                        .upload(
                            POST_IMAGE_BUCKET,
                            &path,
                            image.bytes.clone(),
                            &image.content_type,
                        )
                        .await?,
                )
            }
            None => None,
        };

        let post = self
            .repo
            .create_post(&NewPost {
                user_id,
                content: content.to_string(),
                coin_id: draft.coin_id.filter(|c| !c.trim().is_empty()),
                sentiment: draft.sentiment,
                image_url,
            })
            .await?;
        info!(post_id = %post.id, "Post created");
        Ok(post)
    }

    /// Delete one of the user's own posts.
    pub async fn delete_own_post(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        let post = self
            .repo
            .get_post(post_id)
            .await?
            .ok_or_else(|| Error::validation("post no longer exists"))?;
        if post.user_id != user_id {
            return Err(Error::permission("you can only delete your own posts"));
        }
        self.repo.delete_post(post_id).await?;
        Ok(())
    }

    // Comments

    pub async fn comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        self.repo.list_comments(post_id).await
    }

    pub async fn add_comment(&self, user_id: Uuid, post_id: Uuid, content: &str) -> Result<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::validation("comment cannot be empty"));
        }
        if content.chars().count() > MAX_COMMENT_LEN {
            return Err(Error::validation(format!(
                "comment is limited to {} characters",
                MAX_COMMENT_LEN
            )));
        }
        self.moderate(content, None)?;
        self.ensure_not_banned(user_id).await?;

        self.repo
            .create_comment(&NewComment {
                post_id,
                user_id,
                content: content.to_string(),
            })
            .await
    }

    // Likes and watchlist

    /// Returns whether the post is liked afterwards.
    pub async fn toggle_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        self.repo.toggle_like(post_id, user_id).await
    }

    pub async fn watchlist(&self, user_id: Uuid) -> Result<Vec<FavoriteCoin>> {
        self.repo.list_favorites(user_id).await
    }

    /// Returns whether the coin is watched afterwards.
    pub async fn toggle_favorite(&self, user_id: Uuid, coin_id: &str) -> Result<bool> {
        if coin_id.trim().is_empty() {
            return Err(Error::validation("coin id is required"));
        }
        self.repo.toggle_favorite(user_id, coin_id).await
    }

    // Profiles

    pub async fn profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.repo.get_profile(user_id).await
    }

    pub async fn update_profile(&self, user_id: Uuid, mut update: ProfileUpdate) -> Result<Profile> {
        if let Some(username) = update.username.as_mut() {
            *username = username.trim().to_string();
            validate_username(username)?;
            self.moderate(username, None)?;
            if let Some(existing) = self.repo.find_profile_by_username(username).await?
                && existing.id != user_id
            {
                return Err(Error::validation(format!(
                    "username '{}' is already taken",
                    username
                )));
            }
        }
        if let Some(bio) = update.bio.as_mut() {
            *bio = bio.trim().to_string();
            if bio.chars().count() > MAX_BIO_LEN {
                return Err(Error::validation(format!(
                    "bio is limited to {} characters",
                    MAX_BIO_LEN
                )));
            }
            self.moderate(bio, None)?;
        }

        self.repo.update_profile(user_id, &update).await
    }

    pub async fn upload_avatar(&self, user_id: Uuid, image: Attachment) -> Result<Profile> {
        if image.bytes.len() > MAX_AVATAR_BYTES {
            return Err(Error::validation("avatar must be 2 MB or smaller"));
        }
        self.moderate("", Some(&image.filename))?;

        let path = format!("{}/avatar.{}", user_id, image.extension());
        let url = self
            .repo
            .upload(AVATAR_BUCKET, &path, image.bytes, &image.content_type)
            .await?;
        debug!(%user_id, "Avatar uploaded");

        self.repo
            .update_profile(
                user_id,
                &ProfileUpdate {
                    avatar_url: Some(url),
                    ..Default::default()
                },
            )
            .await
    }

    // Alerts

    pub async fn alerts(&self, user_id: Uuid) -> Result<Vec<PriceAlert>> {
        self.repo.list_alerts(user_id).await
    }

    pub async fn create_alert(
        &self,
        user_id: Uuid,
        coin_id: &str,
        target_price: Decimal,
        condition: AlertCondition,
    ) -> Result<PriceAlert> {
        let coin_id = coin_id.trim();
        if coin_id.is_empty() {
            return Err(Error::validation("coin id is required"));
        }
        if target_price <= Decimal::ZERO {
            return Err(Error::validation("target price must be greater than zero"));
        }

        let alert = self
            .repo
            .create_alert(&NewPriceAlert::new(user_id, coin_id, target_price, condition))
            .await?;
        info!(alert_id = %alert.id, coin_id, %condition, %target_price, "Price alert created");
        Ok(alert)
    }

    pub async fn delete_alert(&self, user_id: Uuid, alert_id: Uuid) -> Result<()> {
        let owned = self
            .repo
            .list_alerts(user_id)
            .await?
            .iter()
            .any(|a| a.id == alert_id);
        if !owned {
            return Err(Error::permission("you can only delete your own alerts"));
        }
        self.repo.delete_alert(alert_id).await?;
        Ok(())
    }

    // Reports

    pub async fn report(
        &self,
        reporter_id: Uuid,
        content_type: ContentType,
        content_id: Uuid,
        reason: &str,
    ) -> Result<Report> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(Error::validation("a reason is required"));
        }
        let report = self
            .repo
            .create_report(&NewReport {
                content_type,
                content_id,
                reporter_id,
                reason: reason.to_string(),
                status: ReportStatus::Pending,
            })
            .await?;
        info!(report_id = %report.id, %content_type, "Content reported");
        Ok(report)
    }
}

/// 3-30 characters of letters, digits and underscores.
pub fn validate_username(username: &str) -> Result<()> {
    if !USERNAME_LEN.contains(&username.chars().count()) {
        return Err(Error::validation("username must be 3-30 characters"));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(Error::validation(
            "username may only contain letters, numbers and underscores",
        ));
    }
    Ok(())
}
