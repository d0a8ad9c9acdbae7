//! Event handler for processing input events.

use super::InputEvent;
use crate::config::KeyBindings;
use crate::error::Result;
use crate::models::ContentType;
use crate::state::{Action, AdminPane, ComposeTarget, InputMode, Notification, Store, View};
use crossterm::event::{
    self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind,
};
use std::time::Duration;
use uuid::Uuid;

/// Handles input events and produces actions.
pub struct EventHandler {
    keybindings: KeyBindings,
    poll_timeout: Duration,
    mouse_support: bool,
    snapshot: StoreSnapshot,
}

/// Snapshot of the store state that decides what a key means.
#[derive(Debug, Clone, Default)]
struct StoreSnapshot {
    input_mode: InputMode,
    current_view: View,
    show_help: bool,
    signed_in: bool,
    is_admin: bool,
    selected_coin: Option<String>,
    selected_post: Option<Uuid>,
    /// Author of the open post, else of the selected one.
    post_author: Option<Uuid>,
    open_post: Option<Uuid>,
    /// Selected comment of the open thread and its author.
    selected_comment: Option<(Uuid, Uuid)>,
    selected_favorite: Option<String>,
    selected_report_author: Option<Uuid>,
    admin_pane: AdminPane,
}

impl EventHandler {
    pub fn new(keybindings: KeyBindings, poll_timeout: Duration, mouse_support: bool) -> Self {
        Self {
            keybindings,
            poll_timeout,
            mouse_support,
            snapshot: StoreSnapshot::default(),
        }
    }

    /// Update the store snapshot for state-aware event handling.
    pub fn update_store_snapshot(&mut self, store: &Store) {
        self.snapshot = StoreSnapshot {
            input_mode: store.app.input_mode,
            current_view: store.app.current_view,
            show_help: store.app.show_help,
            signed_in: store.app.session.is_some(),
            is_admin: store.app.is_admin(),
            selected_coin: store.markets.selected_coin().map(|c| c.id.clone()),
            selected_post: store.feed.selected_item().map(|i| i.post.id),
            post_author: store
                .feed
                .open_item()
                .or_else(|| store.feed.selected_item())
                .map(|i| i.post.user_id),
            open_post: store.feed.open_post,
            selected_comment: store.feed.selected_comment().map(|c| (c.id, c.user_id)),
            selected_favorite: store.watchlist.selected().map(|f| f.coin_id.clone()),
            selected_report_author: store.admin.selected().and_then(|r| r.author_id),
            admin_pane: store.admin.pane,
        };
    }

    /// Get the next action from user input.
    pub async fn next(&mut self) -> Result<Option<Action>> {
        if event::poll(self.poll_timeout)? {
            match event::read()? {
                CrosstermEvent::Key(key) => return Ok(self.handle_key(key)),
                CrosstermEvent::Mouse(mouse) if self.mouse_support => {
                    return Ok(self.handle_mouse(mouse));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    /// Handle a key event and return an optional action.
    fn handle_key(&self, key: KeyEvent) -> Option<Action> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match self.snapshot.input_mode {
            InputMode::Normal => self.handle_normal_mode(key),
            InputMode::Search | InputMode::Compose => self.handle_input_mode(key),
        }
    }

    fn handle_mouse(&self, mouse: MouseEvent) -> Option<Action> {
        match mouse.kind {
            MouseEventKind::ScrollUp => Some(Action::ScrollUp),
            MouseEventKind::ScrollDown => Some(Action::ScrollDown),
            _ => None,
        }
    }

    fn handle_normal_mode(&self, key: KeyEvent) -> Option<Action> {
        let input = InputEvent::from(key);
        let kb = &self.keybindings;
        let snapshot = &self.snapshot;

        // Global shortcuts
        if input.matches(&kb.quit) {
            return Some(Action::Quit);
        }
        if input.matches(&kb.help) {
            return Some(Action::ToggleHelp);
        }
        if input.matches(&kb.back) {
            return Some(if snapshot.show_help {
                Action::ToggleHelp
            } else if snapshot.current_view == View::Feed && snapshot.open_post.is_some() {
                Action::ClosePost
            } else {
                Action::DismissNotification
            });
        }
        if input.matches(&kb.refresh) {
            return Some(Action::RefreshAll);
        }

        // Account
        if input.matches(&kb.sign_in) && !snapshot.signed_in {
            return Some(Action::StartCompose(ComposeTarget::SignIn));
        }
        if input.matches(&kb.sign_up) && !snapshot.signed_in {
            return Some(Action::StartCompose(ComposeTarget::SignUp));
        }
        if input.matches(&kb.sign_out) && snapshot.signed_in {
            return Some(Action::SignOut);
        }
        if input.matches(&kb.profile) {
            return self.signed_in(Action::StartCompose(ComposeTarget::Profile));
        }
        if input.matches(&kb.avatar) {
            return self.signed_in(Action::StartCompose(ComposeTarget::Avatar));
        }

        // View switching
        let views = [
            (&kb.markets, View::Markets),
            (&kb.feed, View::Feed),
            (&kb.watchlist, View::Watchlist),
            (&kb.alerts, View::Alerts),
            (&kb.admin, View::Admin),
        ];
        if let Some((_, view)) = views.iter().find(|(binding, _)| input.matches(binding)) {
            if *view == View::Admin && !snapshot.is_admin {
                return Some(Action::ShowNotification(Notification::warning(
                    "Admin access required",
                )));
            }
            return Some(Action::SetView(*view));
        }

        // Navigation
        if input.matches(&kb.up) || key.code == KeyCode::Up {
            return Some(Action::ScrollUp);
        }
        if input.matches(&kb.down) || key.code == KeyCode::Down {
            return Some(Action::ScrollDown);
        }
        match key.code {
            KeyCode::PageUp => return Some(Action::PageUp),
            KeyCode::PageDown => return Some(Action::PageDown),
            KeyCode::Home | KeyCode::Char('g') => return Some(Action::GoToTop),
            KeyCode::End | KeyCode::Char('G') => return Some(Action::GoToBottom),
            _ => {}
        }

        match snapshot.current_view {
            View::Markets => self.handle_markets_view(input),
            View::Feed => self.handle_feed_view(input),
            View::Watchlist => self.handle_watchlist_view(input),
            View::Alerts => self.handle_alerts_view(input),
            View::Admin => self.handle_admin_view(input),
        }
    }

    /// Actions that need a session turn into a hint when signed out.
    fn signed_in(&self, action: Action) -> Option<Action> {
        if self.snapshot.signed_in {
            Some(action)
        } else {
            let hint = format!("Sign in first ({})", self.keybindings.sign_in);
            Some(Action::ShowNotification(Notification::warning(hint)))
        }
    }

    fn handle_markets_view(&self, input: InputEvent) -> Option<Action> {
        let kb = &self.keybindings;

        if input.matches(&kb.search) {
            return Some(Action::SetInputMode(InputMode::Search));
        }
        if input.matches(&kb.select) {
            return Some(Action::LoadChart);
        }
        match input.text() {
            Some(']') => return Some(Action::NextPage),
            Some('[') => return Some(Action::PrevPage),
            _ => {}
        }

        let coin_id = self.snapshot.selected_coin.clone()?;
        if input.matches(&kb.favorite) {
            return self.signed_in(Action::ToggleFavorite);
        }
        if input.matches(&kb.compose) {
            return self.signed_in(Action::StartCompose(ComposeTarget::Alert { coin_id }));
        }
        None
    }

    fn handle_feed_view(&self, input: InputEvent) -> Option<Action> {
        let kb = &self.keybindings;
        let snapshot = &self.snapshot;

        if input.matches(&kb.compose) {
            let target = match snapshot.open_post {
                Some(post_id) => ComposeTarget::Comment { post_id },
                None => ComposeTarget::Post,
            };
            return self.signed_in(Action::StartCompose(target));
        }

        let post_id = snapshot.open_post.or(snapshot.selected_post)?;
        if input.matches(&kb.select) && snapshot.open_post.is_none() {
            return Some(Action::OpenPost);
        }
        if input.matches(&kb.like) {
            return self.signed_in(Action::ToggleLike);
        }
        if input.matches(&kb.report) {
            let (content_type, content_id) = match snapshot.selected_comment {
                Some((comment_id, _)) => (ContentType::Comment, comment_id),
                None => (ContentType::Post, post_id),
            };
            return self.signed_in(Action::StartCompose(ComposeTarget::Report {
                content_type,
                content_id,
            }));
        }
        if input.matches(&kb.report_author) {
            let author = snapshot
                .selected_comment
                .map(|(_, author)| author)
                .or(snapshot.post_author)?;
            return self.signed_in(Action::StartCompose(ComposeTarget::Report {
                content_type: ContentType::Profile,
                content_id: author,
            }));
        }
        if input.matches(&kb.delete) {
            return self.signed_in(Action::DeleteSelected);
        }
        None
    }

    fn handle_watchlist_view(&self, input: InputEvent) -> Option<Action> {
        let kb = &self.keybindings;
        let coin_id = self.snapshot.selected_favorite.clone()?;

        if input.matches(&kb.favorite) || input.matches(&kb.delete) {
            return Some(Action::ToggleFavorite);
        }
        if input.matches(&kb.compose) {
            return Some(Action::StartCompose(ComposeTarget::Alert { coin_id }));
        }
        None
    }

    fn handle_alerts_view(&self, input: InputEvent) -> Option<Action> {
        if input.matches(&self.keybindings.delete) {
            return self.signed_in(Action::DeleteSelected);
        }
        None
    }

    fn handle_admin_view(&self, input: InputEvent) -> Option<Action> {
        let kb = &self.keybindings;

        if input.matches(&kb.next_pane) {
            return Some(Action::CycleAdminPane);
        }
        if input.matches(&kb.compose) {
            return Some(Action::StartCompose(ComposeTarget::Role));
        }

        match self.snapshot.admin_pane {
            AdminPane::Reports => {
                if input.matches(&kb.select) {
                    return Some(Action::ActionReport);
                }
                if input.matches(&kb.delete) {
                    return Some(Action::DismissReport);
                }
                if input.text() == Some('b') {
                    let user_id = self.snapshot.selected_report_author?;
                    return Some(Action::StartCompose(ComposeTarget::Ban { user_id }));
                }
            }
            AdminPane::Bans if input.matches(&kb.delete) => return Some(Action::UnbanSelected),
            AdminPane::Admins if input.matches(&kb.delete) => return Some(Action::RevokeSelected),
            _ => {}
        }
        None
    }

    fn handle_input_mode(&self, key: KeyEvent) -> Option<Action> {
        let input = InputEvent::from(key);
        match key.code {
            KeyCode::Esc => Some(Action::CancelInput),
            KeyCode::Enter => Some(Action::SubmitInput),
            KeyCode::Backspace => Some(Action::InputBackspace),
            KeyCode::Left => Some(Action::InputLeft),
            KeyCode::Right => Some(Action::InputRight),
            _ => input.text().map(Action::InputChar),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionInfo;
    use crossterm::event::KeyModifiers;
    use tokio::sync::mpsc;

    fn handler(store: &Store) -> EventHandler {
        let mut handler = EventHandler::new(KeyBindings::default(), Duration::from_millis(10), true);
        handler.update_store_snapshot(store);
        handler
    }

    fn store() -> Store {
        let (tx, _rx) = mpsc::unbounded_channel();
        Store::new(tx)
    }

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn sign_in(store: &mut Store) {
        store.reduce(Action::SessionChanged(Some(SessionInfo {
            user_id: Uuid::new_v4(),
            email: "me@example.com".to_string(),
            username: None,
            admin_role: None,
        })));
    }

    #[test]
    fn test_view_switching() {
        let store = store();
        let handler = handler(&store);
        assert!(matches!(
            handler.handle_key(key('2')),
            Some(Action::SetView(View::Feed))
        ));
        assert!(matches!(
            handler.handle_key(key('5')),
            Some(Action::ShowNotification(_))
        ));
    }

    #[test]
    fn test_compose_requires_session() {
        let mut store = store();
        store.reduce(Action::SetView(View::Feed));
        assert!(matches!(
            handler(&store).handle_key(key('n')),
            Some(Action::ShowNotification(_))
        ));

        sign_in(&mut store);
        assert!(matches!(
            handler(&store).handle_key(key('n')),
            Some(Action::StartCompose(ComposeTarget::Post))
        ));
    }

    #[test]
    fn test_typing_in_compose_mode() {
        let mut store = store();
        store.reduce(Action::StartCompose(ComposeTarget::SignIn));
        let handler = handler(&store);

        // Bound keys are plain text while composing.
        assert!(matches!(handler.handle_key(key('q')), Some(Action::InputChar('q'))));
        assert!(matches!(
            handler.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
            Some(Action::SubmitInput)
        ));
        assert!(matches!(
            handler.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
            Some(Action::CancelInput)
        ));
    }

    fn open_thread(store: &mut Store) -> (Uuid, Uuid) {
        use crate::models::{Comment, Post};
        use crate::social::FeedItem;
        use chrono::Utc;

        let author = Uuid::new_v4();
        let post = Post {
            id: Uuid::new_v4(),
            user_id: author,
            content: "gm".to_string(),
            coin_id: None,
            sentiment: None,
            image_url: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: post.id,
            user_id: Uuid::new_v4(),
            content: "wagmi".to_string(),
            created_at: Utc::now(),
        };
        let ids = (post.id, comment.id);
        store.reduce(Action::SetView(View::Feed));
        store.reduce(Action::FeedLoaded(vec![FeedItem {
            post,
            author: None,
            like_count: 0,
            liked_by_me: false,
        }]));
        store.reduce(Action::CommentsLoaded(ids.0, vec![comment]));
        ids
    }

    fn report_target(action: Option<Action>) -> (ContentType, Uuid) {
        match action {
            Some(Action::StartCompose(ComposeTarget::Report {
                content_type,
                content_id,
            })) => (content_type, content_id),
            other => panic!("expected a report composer, got {other:?}"),
        }
    }

    #[test]
    fn test_report_follows_thread_selection() {
        let mut store = store();
        sign_in(&mut store);
        let (post_id, comment_id) = open_thread(&mut store);
        let author = store.feed.items[0].post.user_id;

        assert_eq!(
            report_target(handler(&store).handle_key(key('!'))),
            (ContentType::Post, post_id)
        );
        assert_eq!(
            report_target(handler(&store).handle_key(key('@'))),
            (ContentType::Profile, author)
        );

        store.reduce(Action::ScrollDown);
        assert_eq!(
            report_target(handler(&store).handle_key(key('!'))),
            (ContentType::Comment, comment_id)
        );
        let commenter = store.feed.comments[0].user_id;
        assert_eq!(
            report_target(handler(&store).handle_key(key('@'))),
            (ContentType::Profile, commenter)
        );
    }

    #[test]
    fn test_profile_keys() {
        let mut store = store();
        assert!(matches!(
            handler(&store).handle_key(key('p')),
            Some(Action::ShowNotification(_))
        ));

        sign_in(&mut store);
        assert!(matches!(
            handler(&store).handle_key(key('p')),
            Some(Action::StartCompose(ComposeTarget::Profile))
        ));
        assert!(matches!(
            handler(&store).handle_key(KeyEvent::new(KeyCode::Char('P'), KeyModifiers::SHIFT)),
            Some(Action::StartCompose(ComposeTarget::Avatar))
        ));
    }

    #[test]
    fn test_admin_keys_follow_pane() {
        let mut store = store();
        store.reduce(Action::SetView(View::Admin));
        assert!(matches!(
            handler(&store).handle_key(key('d')),
            Some(Action::DismissReport)
        ));

        let tab = KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE);
        assert!(matches!(
            handler(&store).handle_key(tab),
            Some(Action::CycleAdminPane)
        ));

        store.reduce(Action::CycleAdminPane);
        assert!(matches!(
            handler(&store).handle_key(key('d')),
            Some(Action::UnbanSelected)
        ));
        store.reduce(Action::CycleAdminPane);
        assert!(matches!(
            handler(&store).handle_key(key('d')),
            Some(Action::RevokeSelected)
        ));
        assert!(matches!(
            handler(&store).handle_key(key('n')),
            Some(Action::StartCompose(ComposeTarget::Role))
        ));
    }

    #[test]
    fn test_account_keys_follow_session() {
        let mut store = store();
        assert!(matches!(
            handler(&store).handle_key(key('a')),
            Some(Action::StartCompose(ComposeTarget::SignIn))
        ));
        assert!(handler(&store).handle_key(key('o')).is_none());

        sign_in(&mut store);
        assert!(matches!(handler(&store).handle_key(key('o')), Some(Action::SignOut)));
    }
}
