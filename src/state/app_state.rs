//! Application-level state.

use super::Notification;
use crate::models::{AdminRole, ContentType};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// The current view/screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Markets,
    Feed,
    Watchlist,
    Alerts,
    Admin,
}

impl View {
    pub const ALL: [View; 5] = [
        View::Markets,
        View::Feed,
        View::Watchlist,
        View::Alerts,
        View::Admin,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            View::Markets => "Markets",
            View::Feed => "Feed",
            View::Watchlist => "Watchlist",
            View::Alerts => "Alerts",
            View::Admin => "Admin",
        }
    }
}

/// Input mode for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Search,
    Compose,
}

/// What the composer is editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeTarget {
    Post,
    Comment { post_id: Uuid },
    Alert { coin_id: String },
    Report { content_type: ContentType, content_id: Uuid },
    Ban { user_id: Uuid },
    /// Grant an admin role by username.
    Role,
    Profile,
    Avatar,
    SignIn,
    SignUp,
}

impl ComposeTarget {
    /// Prompt shown before the input.
    pub fn prompt(&self) -> String {
        match self {
            ComposeTarget::Post => "New post ($coin #bullish img:path)".to_string(),
            ComposeTarget::Comment { .. } => "Comment".to_string(),
            ComposeTarget::Alert { coin_id } => format!("Alert for {} (above|below price)", coin_id),
            ComposeTarget::Report { content_type, .. } => format!("Report {} (reason)", content_type),
            ComposeTarget::Ban { .. } => "Ban ([7d|12h] reason)".to_string(),
            ComposeTarget::Role => "Grant role (username moderator|admin|super_admin)".to_string(),
            ComposeTarget::Profile => "Profile (username|- bio)".to_string(),
            ComposeTarget::Avatar => "Avatar (path to png, jpg, gif or webp)".to_string(),
            ComposeTarget::SignIn => "Sign in (email password)".to_string(),
            ComposeTarget::SignUp => "Sign up (email password username)".to_string(),
        }
    }

    /// Whether the input holds a password that must not be echoed.
    pub fn has_secret(&self) -> bool {
        matches!(self, ComposeTarget::SignIn | ComposeTarget::SignUp)
    }
}

/// The signed-in user as the UI needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub user_id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub admin_role: Option<AdminRole>,
}

impl SessionInfo {
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.email)
    }
}

/// Global application state.
#[derive(Debug, Default)]
pub struct AppState {
    /// Current view.
    pub current_view: View,
    /// Current input mode.
    pub input_mode: InputMode,
    /// Composer target while in compose mode.
    pub compose: Option<ComposeTarget>,
    /// Signed-in user.
    pub session: Option<SessionInfo>,
    /// Whether to show help overlay.
    pub show_help: bool,
    /// Current notification and when it appeared.
    pub notification: Option<(Notification, Instant)>,
    /// Whether the app is loading data.
    pub loading: bool,
    /// Whether the market API answered the last request.
    pub connected: bool,
    /// Whether the backend is the in-process store.
    pub offline: bool,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Current search/compose input.
    pub input_buffer: String,
    /// Cursor position in input buffer, in characters.
    pub cursor_position: usize,
}

impl AppState {
    /// Check if in an input mode.
    pub fn is_editing(&self) -> bool {
        self.input_mode != InputMode::Normal
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.user_id)
    }

    pub fn is_admin(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.admin_role.is_some())
    }

    /// Drop the notification once its time is up.
    pub fn expire_notification(&mut self, now: Instant) {
        if let Some((notification, shown_at)) = &self.notification
            && now.duration_since(*shown_at) >= Duration::from_secs(notification.duration_secs)
        {
            self.notification = None;
        }
    }

    /// Clear the input buffer.
    pub fn clear_input(&mut self) {
        self.input_buffer.clear();
        self.cursor_position = 0;
    }

    fn byte_index(&self) -> usize {
        self.input_buffer
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.input_buffer.len())
    }

    /// Add a character to the input buffer.
    pub fn push_char(&mut self, c: char) {
        let index = self.byte_index();
        self.input_buffer.insert(index, c);
        self.cursor_position += 1;
    }

    /// Remove the character before the cursor.
    pub fn pop_char(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            let index = self.byte_index();
            self.input_buffer.remove(index);
        }
    }

    /// Move cursor left.
    pub fn cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    /// Move cursor right.
    pub fn cursor_right(&mut self) {
        if self.cursor_position < self.input_buffer.chars().count() {
            self.cursor_position += 1;
        }
    }

    /// Input as displayed. Everything after the first word is masked when
    /// the composer holds a password.
    pub fn display_input(&self) -> String {
        match &self.compose {
            Some(target) if target.has_secret() => match self.input_buffer.split_once(' ') {
                Some((email, rest)) => format!("{} {}", email, "*".repeat(rest.chars().count())),
                None => self.input_buffer.clone(),
            },
            _ => self.input_buffer.clone(),
        }
    }
}
