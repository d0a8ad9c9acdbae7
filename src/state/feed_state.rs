//! Social feed state.

use crate::models::Comment;
use crate::social::FeedItem;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Posts in the feed and the thread opened from it.
#[derive(Debug, Default)]
pub struct FeedState {
    pub items: Vec<FeedItem>,
    pub selected_index: Option<usize>,
    /// Post whose comments are shown.
    pub open_post: Option<Uuid>,
    pub comments: Vec<Comment>,
    /// Selected comment of the open thread.
    pub comment_index: Option<usize>,
    pub loading: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

impl FeedState {
    pub fn selected_item(&self) -> Option<&FeedItem> {
        self.selected_index.and_then(|i| self.items.get(i))
    }

    pub fn selected_comment(&self) -> Option<&Comment> {
        self.open_post?;
        self.comment_index.and_then(|i| self.comments.get(i))
    }

    pub fn open_item(&self) -> Option<&FeedItem> {
        let id = self.open_post?;
        self.items.iter().find(|item| item.post.id == id)
    }

    /// Replace the feed, keeping the selection on the same post if it is
    /// still there.
    pub fn set_items(&mut self, items: Vec<FeedItem>) {
        let selected = self.selected_item().map(|item| item.post.id);
        self.items = items;
        self.selected_index = match selected {
            Some(id) => self
                .items
                .iter()
                .position(|item| item.post.id == id)
                .or(Some(0)),
            None => Some(0),
        }
        .filter(|_| !self.items.is_empty());

        if let Some(id) = self.open_post
            && !self.items.iter().any(|item| item.post.id == id)
        {
            self.close_post();
        }
    }

    pub fn close_post(&mut self) {
        self.open_post = None;
        self.comments.clear();
        self.comment_index = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Post;

    fn item(content: &str) -> FeedItem {
        FeedItem {
            post: Post {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                content: content.to_string(),
                coin_id: None,
                sentiment: None,
                image_url: None,
                created_at: Utc::now(),
                updated_at: None,
            },
            author: None,
            like_count: 0,
            liked_by_me: false,
        }
    }

    #[test]
    fn test_selection_follows_post_across_reload() {
        let (a, b) = (item("a"), item("b"));
        let mut state = FeedState::default();
        state.set_items(vec![a.clone(), b.clone()]);
        state.selected_index = Some(1);

        let c = item("c");
        state.set_items(vec![c, a, b.clone()]);
        assert_eq!(state.selected_item().map(|i| i.post.id), Some(b.post.id));
    }

    #[test]
    fn test_deleted_open_post_closes_thread() {
        let a = item("a");
        let mut state = FeedState::default();
        state.set_items(vec![a.clone()]);
        state.open_post = Some(a.post.id);

        state.set_items(Vec::new());
        assert_eq!(state.open_post, None);
        assert_eq!(state.selected_index, None);
    }
}
