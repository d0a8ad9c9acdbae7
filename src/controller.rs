//! Side effects behind the store.
//!
//! The [`Controller`] owns the [`Store`] and every service. Actions that
//! need the network or the backend are performed here; the outcome is
//! reduced back into the store as `*Loaded` actions or toasts.

use crate::admin::{AdminService, parse_ban_input};
use crate::alerts::{AlertMonitor, AlertSink, AlertStore, AlertTrigger, TerminalBell};
use crate::backend::{Backend, ChangeEvent, Query, Repository, Session, Table};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::market::{MarketClient, PriceSource};
use crate::models::{AdminRole, ContentType};
use crate::moderation::ModerationFilter;
use crate::session::SessionController;
use crate::social::{
    Attachment, PostDraft, SocialService, parse_alert_input, parse_profile_input,
    validate_username,
};
use crate::state::{
    Action, ChartSeries, ComposeTarget, InputMode, Notification, ReportRow, SessionInfo, Store,
    View,
};
use futures::future::try_join_all;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::{Stream, StreamExt, StreamMap};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Days of history shown in the coin chart.
const CHART_DAYS: u32 = 7;

/// Characters of reported content shown in the admin console.
const PREVIEW_CHARS: usize = 80;

type ChangeStream = Pin<Box<dyn Stream<Item = ChangeEvent> + Send>>;

/// Performs side-effect actions against the services.
pub struct Controller {
    store: Store,
    market: Arc<MarketClient>,
    repo: Repository,
    social: SocialService,
    admin: AdminService,
    session: SessionController,
    /// Live change feeds of the signed-in session, keyed by table.
    changes: StreamMap<Table, ChangeStream>,
}

impl Controller {
    /// Wire the services together. Fired alerts reach the store through
    /// its action channel.
    pub fn new(
        config: &Config,
        backend: Arc<dyn Backend>,
        market: Arc<MarketClient>,
        store: Store,
    ) -> Self {
        let repo = Repository::new(backend);
        let social = SocialService::new(
            repo.clone(),
            ModerationFilter::new(config.moderation.extra_terms.iter().cloned()),
        );
        let admin = AdminService::new(repo.clone());

        let monitor = config.alerts.enabled.then(|| {
            let tx = store.sender();
            let sink = move |trigger: &AlertTrigger| {
                if tx.send(Action::AlertTriggered(trigger.clone())).is_err() {
                    debug!(alert_id = %trigger.alert.id, "UI closed, dropping alert");
                }
            };
            let prices: Arc<dyn PriceSource> = market.clone();
            let alert_store: Arc<dyn AlertStore> = Arc::new(repo.clone());
            let sink: Arc<dyn AlertSink> = Arc::new(sink);
            AlertMonitor::new(prices, alert_store, sink)
                .with_notifier(Arc::new(TerminalBell), config.alerts.desktop_notifications)
        });
        let session = SessionController::new(monitor, config.alerts.poll_interval());

        Self {
            store,
            market,
            repo,
            social,
            admin,
            session,
            changes: StreamMap::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn market(&self) -> &MarketClient {
        &self.market
    }

    /// Whether the alert monitor is polling.
    pub fn is_monitoring(&self) -> bool {
        self.session.is_monitoring()
    }

    /// Whether any backend change feed is subscribed.
    pub fn has_live_feeds(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Apply a pure state change.
    pub fn reduce(&mut self, action: Action) {
        self.store.reduce(action);
    }

    /// Table of the next change pushed by the backend. Pending forever
    /// while nothing is subscribed.
    pub async fn next_change(&mut self) -> Option<Table> {
        if self.changes.is_empty() {
            return std::future::pending().await;
        }
        self.changes.next().await.map(|(table, _)| table)
    }

    /// Refresh needed after `table` changed.
    pub fn change_action(&self, table: Table) -> Option<Action> {
        match table {
            Table::Posts | Table::Likes => Some(Action::RefreshFeed),
            Table::Comments if self.store.feed.open_post.is_some() => Some(Action::OpenPost),
            Table::FavoriteCoins => Some(Action::RefreshWatchlist),
            Table::PriceAlerts => Some(Action::RefreshAlerts),
            Table::Reports | Table::Bans if self.store.app.is_admin() => Some(Action::RefreshAdmin),
            _ => None,
        }
    }

    /// Handle an action. Failures become toasts: a warning when retrying
    /// may help, an error otherwise.
    pub async fn handle_action(&mut self, action: Action) {
        if let Err(e) = self.perform(action).await {
            warn!("Action failed: {}", e);
            self.fail(&e);
        }
    }

    /// Stop background work before exit.
    pub async fn shutdown(&mut self) {
        self.changes.clear();
        self.session.logout().await;
    }

    async fn perform(&mut self, action: Action) -> Result<()> {
        match action {
            Action::RefreshAll => self.refresh_all().await,
            Action::RefreshMarkets => self.refresh_markets().await,
            Action::RefreshFeed => self.refresh_feed().await,
            Action::RefreshWatchlist => self.refresh_watchlist().await,
            Action::RefreshAlerts => self.refresh_alerts().await,
            Action::RefreshAdmin => self.refresh_admin().await,
            Action::NextPage | Action::PrevPage => {
                self.store.reduce(action);
                self.refresh_markets().await
            }
            Action::LoadChart => self.load_chart().await,
            Action::OpenPost => self.open_post().await,
            Action::ToggleLike => self.toggle_like().await,
            Action::ToggleFavorite => self.toggle_favorite().await,
            Action::DeleteSelected => self.delete_selected().await,
            Action::ActionReport => self.review_report(true).await,
            Action::DismissReport => self.review_report(false).await,
            Action::UnbanSelected => self.unban_selected().await,
            Action::RevokeSelected => self.revoke_selected().await,
            Action::SignOut => self.sign_out().await,
            Action::SubmitInput => self.submit_input().await,
            other => {
                self.store.reduce(other);
                Ok(())
            }
        }
    }

    fn require_user(&self) -> Result<Uuid> {
        self.store
            .app
            .user_id()
            .ok_or_else(|| Error::auth("sign in first"))
    }

    fn notify(&mut self, notification: Notification) {
        self.store.reduce(Action::ShowNotification(notification));
    }

    fn apply<T>(&mut self, result: Result<T>, loaded: impl FnOnce(T) -> Action) {
        match result {
            Ok(value) => self.store.reduce(loaded(value)),
            Err(e) => {
                warn!("Refresh failed: {}", e);
                self.fail(&e);
            }
        }
    }

    fn fail(&mut self, e: &Error) {
        let action = if e.is_recoverable() {
            Action::SetWarning(e.to_string())
        } else {
            Action::SetError(e.to_string())
        };
        self.store.reduce(action);
    }

    // Refresh

    async fn refresh_all(&mut self) -> Result<()> {
        self.store.reduce(Action::RefreshAll);

        let user = self.store.app.user_id();
        let page = self.store.markets.current_page();
        let social = &self.social;

        let (coins, feed, watchlist, alerts) = futures::join!(
            self.market.fetch_coins(page),
            social.load_feed(user),
            async {
                match user {
                    Some(user) => social.watchlist(user).await.map(Some),
                    None => Ok(None),
                }
            },
            async {
                match user {
                    Some(user) => social.alerts(user).await.map(Some),
                    None => Ok(None),
                }
            },
        );

        self.store.reduce(Action::SetConnected(coins.is_ok()));
        self.apply(coins, Action::MarketsLoaded);
        self.apply(feed, Action::FeedLoaded);
        if let Some(watchlist) = watchlist.transpose() {
            self.apply(watchlist, Action::WatchlistLoaded);
        }
        if let Some(alerts) = alerts.transpose() {
            self.apply(alerts, Action::AlertsLoaded);
        }

        if self.store.app.is_admin() {
            self.refresh_admin().await?;
        }

        self.store.reduce(Action::SetLoading(false));
        Ok(())
    }

    async fn refresh_markets(&mut self) -> Result<()> {
        self.store.reduce(Action::RefreshMarkets);
        let coins = self.market.fetch_coins(self.store.markets.current_page()).await;
        self.store.reduce(Action::SetConnected(coins.is_ok()));
        self.apply(coins, Action::MarketsLoaded);
        Ok(())
    }

    async fn refresh_feed(&mut self) -> Result<()> {
        self.store.reduce(Action::RefreshFeed);
        let feed = self.social.load_feed(self.store.app.user_id()).await;
        self.apply(feed, Action::FeedLoaded);
        Ok(())
    }

    async fn refresh_watchlist(&mut self) -> Result<()> {
        let Some(user) = self.store.app.user_id() else {
            return Ok(());
        };
        self.store.reduce(Action::RefreshWatchlist);
        let favorites = self.social.watchlist(user).await;
        self.apply(favorites, Action::WatchlistLoaded);
        Ok(())
    }

    async fn refresh_alerts(&mut self) -> Result<()> {
        let Some(user) = self.store.app.user_id() else {
            return Ok(());
        };
        self.store.reduce(Action::RefreshAlerts);
        let alerts = self.social.alerts(user).await;
        self.apply(alerts, Action::AlertsLoaded);
        Ok(())
    }

    async fn refresh_admin(&mut self) -> Result<()> {
        let actor = self.require_user()?;
        self.store.reduce(Action::RefreshAdmin);

        let me = self.admin.admin(actor).await?;
        if me.is_none() {
            self.store.reduce(Action::AdminLoaded {
                me,
                reports: Vec::new(),
                bans: Vec::new(),
                admins: Vec::new(),
            });
            return Ok(());
        }

        let (reports, bans, admins) = futures::try_join!(
            self.admin.pending_reports(actor),
            self.admin.bans(actor),
            self.admin.admins(actor)
        )?;
        let reports =
            try_join_all(reports.into_iter().map(|report| self.report_row(report))).await?;

        self.store.reduce(Action::AdminLoaded {
            me,
            reports,
            bans,
            admins,
        });
        Ok(())
    }

    /// Resolve the author and an excerpt of the reported content.
    async fn report_row(&self, report: crate::models::Report) -> Result<ReportRow> {
        let (author_id, preview) = match report.content_type {
            ContentType::Post => self
                .repo
                .get_post(report.content_id)
                .await?
                .map(|p| (p.user_id, p.content))
                .unzip(),
            ContentType::Comment => self
                .repo
                .get_comment(report.content_id)
                .await?
                .map(|c| (c.user_id, c.content))
                .unzip(),
            ContentType::Profile => self
                .repo
                .get_profile(report.content_id)
                .await?
                .map(|p| (p.id, p.username))
                .unzip(),
        };

        Ok(ReportRow {
            report,
            author_id,
            preview: preview.map(|text: String| text.chars().take(PREVIEW_CHARS).collect()),
        })
    }

    // Markets

    async fn load_chart(&mut self) -> Result<()> {
        let Some(coin_id) = self.store.markets.selected_coin().map(|c| c.id.clone()) else {
            return Ok(());
        };
        let points = self.market.fetch_chart(&coin_id, CHART_DAYS).await?;
        self.store.reduce(Action::ChartLoaded(ChartSeries {
            coin_id,
            days: CHART_DAYS,
            points,
        }));
        Ok(())
    }

    // Feed

    async fn open_post(&mut self) -> Result<()> {
        let Some(post_id) = self.target_post() else {
            return Ok(());
        };
        let comments = self.social.comments(post_id).await?;
        self.store.reduce(Action::CommentsLoaded(post_id, comments));
        Ok(())
    }

    /// The open post, else the selected one.
    fn target_post(&self) -> Option<Uuid> {
        let feed = &self.store.feed;
        feed.open_post
            .or_else(|| feed.selected_item().map(|item| item.post.id))
    }

    async fn toggle_like(&mut self) -> Result<()> {
        let user = self.require_user()?;
        let Some(post_id) = self.target_post() else {
            return Ok(());
        };
        self.social.toggle_like(user, post_id).await?;
        self.refresh_feed().await
    }

    // Watchlist

    async fn toggle_favorite(&mut self) -> Result<()> {
        let user = self.require_user()?;
        let coin_id = match self.store.app.current_view {
            View::Markets => self.store.markets.selected_coin().map(|c| c.id.clone()),
            View::Watchlist => self.store.watchlist.selected().map(|f| f.coin_id.clone()),
            _ => None,
        };
        let Some(coin_id) = coin_id else {
            return Ok(());
        };

        let added = self.social.toggle_favorite(user, &coin_id).await?;
        let message = if added {
            format!("Watching {}", coin_id)
        } else {
            format!("Removed {} from watchlist", coin_id)
        };
        self.notify(Notification::success(message));
        self.refresh_watchlist().await
    }

    async fn delete_selected(&mut self) -> Result<()> {
        let user = self.require_user()?;
        match self.store.app.current_view {
            View::Feed => {
                let Some(post_id) = self.target_post() else {
                    return Ok(());
                };
                self.social.delete_own_post(user, post_id).await?;
                self.store.reduce(Action::ClosePost);
                self.notify(Notification::success("Post deleted"));
                self.refresh_feed().await
            }
            View::Alerts => {
                let Some(alert_id) = self.store.alerts.selected().map(|a| a.id) else {
                    return Ok(());
                };
                self.social.delete_alert(user, alert_id).await?;
                self.notify(Notification::success("Alert deleted"));
                self.refresh_alerts().await
            }
            _ => Ok(()),
        }
    }

    // Admin

    async fn review_report(&mut self, action_it: bool) -> Result<()> {
        let actor = self.require_user()?;
        let Some(report_id) = self.store.admin.selected().map(|row| row.report.id) else {
            return Ok(());
        };

        if action_it {
            self.admin.action_report(actor, report_id).await?;
            self.notify(Notification::success("Content removed"));
            self.refresh_feed().await?;
        } else {
            self.admin.dismiss_report(actor, report_id).await?;
            self.notify(Notification::info("Report dismissed"));
        }
        self.refresh_admin().await
    }

    async fn unban_selected(&mut self) -> Result<()> {
        let actor = self.require_user()?;
        let Some(user_id) = self.store.admin.selected_ban().map(|ban| ban.user_id) else {
            return Ok(());
        };
        let removed = self.admin.unban_user(actor, user_id).await?;
        self.notify(Notification::success(format!("Lifted {} ban(s)", removed)));
        self.refresh_admin().await
    }

    async fn revoke_selected(&mut self) -> Result<()> {
        let actor = self.require_user()?;
        let Some(user_id) = self.store.admin.selected_admin().map(|admin| admin.user_id) else {
            return Ok(());
        };
        if self.admin.revoke(actor, user_id).await? {
            self.notify(Notification::success("Admin access revoked"));
        }
        self.refresh_admin().await
    }

    // Session

    async fn sign_out(&mut self) -> Result<()> {
        self.changes.clear();
        self.session.logout().await;
        let result = self.repo.sign_out().await;

        self.store.reduce(Action::SessionChanged(None));
        self.notify(Notification::info("Signed out"));
        self.refresh_feed().await?;
        result
    }

    async fn signed_in(&mut self, session: Session) -> Result<()> {
        let user_id = session.user_id;
        let email = session.email.clone();
        self.session.login(session).await;

        let (profile, grant) =
            futures::join!(self.social.profile(user_id), self.admin.admin(user_id));
        let info = SessionInfo {
            user_id,
            email,
            username: profile?.map(|p| p.username),
            admin_role: grant?.map(|a| a.role),
        };
        let greeting = format!("Signed in as {}", info.display_name());
        self.store.reduce(Action::SessionChanged(Some(info)));
        self.notify(Notification::success(greeting));

        self.subscribe_changes(user_id);
        self.refresh_all().await
    }

    fn set_username(&mut self, username: String) {
        if let Some(mut info) = self.store.app.session.clone() {
            info.username = Some(username);
            self.store.reduce(Action::SessionChanged(Some(info)));
        }
    }

    fn subscribe_changes(&mut self, user_id: Uuid) {
        self.changes.clear();

        let own = || Query::new().eq("user_id", user_id.to_string());
        let feeds = [
            (Table::Posts, Query::new()),
            (Table::Likes, Query::new()),
            (Table::Comments, Query::new()),
            (Table::FavoriteCoins, own()),
            (Table::PriceAlerts, own()),
            (Table::Reports, Query::new()),
            (Table::Bans, Query::new()),
        ];

        for (table, filter) in feeds {
            match self.repo.subscribe(table, filter) {
                Ok(feed) => {
                    self.changes.insert(table, Box::pin(feed.into_stream()));
                }
                Err(Error::Unsupported(_)) => {
                    debug!(%table, "Change feed unsupported, relying on timed refresh");
                }
                Err(e) => warn!(%table, "Change feed subscription failed: {}", e),
            }
        }
    }

    // Compose

    /// Submit the input line. On failure the composer stays open with its
    /// text so the user can fix it.
    async fn submit_input(&mut self) -> Result<()> {
        let target = match (&self.store.app.input_mode, &self.store.app.compose) {
            (InputMode::Compose, Some(target)) => target.clone(),
            _ => {
                self.store.reduce(Action::SubmitInput);
                return Ok(());
            }
        };
        let input = self.store.app.input_buffer.trim().to_string();

        match target {
            ComposeTarget::Post => {
                let user = self.require_user()?;
                let mut draft = PostDraft::parse(&input);
                draft.attach_image().await?;
                self.social.create_post(user, draft).await?;
                self.store.reduce(Action::SubmitInput);
                self.notify(Notification::success("Posted"));
                self.refresh_feed().await
            }
            ComposeTarget::Comment { post_id } => {
                let user = self.require_user()?;
                self.social.add_comment(user, post_id, &input).await?;
                self.store.reduce(Action::SubmitInput);
                let comments = self.social.comments(post_id).await?;
                self.store.reduce(Action::CommentsLoaded(post_id, comments));
                Ok(())
            }
            ComposeTarget::Alert { coin_id } => {
                let user = self.require_user()?;
                let (condition, target_price) = parse_alert_input(&input)?;
                let alert = self
                    .social
                    .create_alert(user, &coin_id, target_price, condition)
                    .await?;
                self.store.reduce(Action::SubmitInput);
                self.notify(Notification::success(format!(
                    "Alert set: {} {} {}",
                    alert.coin_id,
                    alert.condition,
                    alert.target_price.normalize()
                )));
                self.refresh_alerts().await
            }
            ComposeTarget::Report {
                content_type,
                content_id,
            } => {
                let user = self.require_user()?;
                self.social
                    .report(user, content_type, content_id, &input)
                    .await?;
                self.store.reduce(Action::SubmitInput);
                self.notify(Notification::success("Report sent"));
                Ok(())
            }
            ComposeTarget::Ban { user_id } => {
                let actor = self.require_user()?;
                let (duration, reason) = parse_ban_input(&input);
                self.admin.ban_user(actor, user_id, &reason, duration).await?;
                self.store.reduce(Action::SubmitInput);
                self.notify(Notification::success("User banned"));
                self.refresh_admin().await
            }
            ComposeTarget::Role => {
                let actor = self.require_user()?;
                let mut parts = input.split_whitespace();
                let (Some(username), Some(role), None) = (parts.next(), parts.next(), parts.next())
                else {
                    return Err(Error::validation("enter: username role"));
                };
                let role: AdminRole = role.parse()?;
                let profile = self
                    .repo
                    .find_profile_by_username(username)
                    .await?
                    .ok_or_else(|| Error::validation(format!("no user named '{}'", username)))?;
                self.admin.set_role(actor, profile.id, role).await?;
                self.store.reduce(Action::SubmitInput);
                self.notify(Notification::success(format!("{} is now {}", username, role)));
                self.refresh_admin().await
            }
            ComposeTarget::Profile => {
                let user = self.require_user()?;
                let profile = self
                    .social
                    .update_profile(user, parse_profile_input(&input)?)
                    .await?;
                self.store.reduce(Action::SubmitInput);
                self.set_username(profile.username);
                self.notify(Notification::success("Profile updated"));
                Ok(())
            }
            ComposeTarget::Avatar => {
                let user = self.require_user()?;
                let image = Attachment::load(Path::new(&input)).await?;
                self.social.upload_avatar(user, image).await?;
                self.store.reduce(Action::SubmitInput);
                self.notify(Notification::success("Avatar uploaded"));
                self.refresh_feed().await
            }
            ComposeTarget::SignIn => {
                let mut parts = input.split_whitespace();
                let (Some(email), Some(password)) = (parts.next(), parts.next()) else {
                    return Err(Error::validation("enter: email password"));
                };
                let session = self.repo.sign_in(email, password).await?;
                info!(user_id = %session.user_id, "Signed in");
                self.store.reduce(Action::SubmitInput);
                self.signed_in(session).await
            }
            ComposeTarget::SignUp => {
                let mut parts = input.split_whitespace();
                let (Some(email), Some(password), Some(username)) =
                    (parts.next(), parts.next(), parts.next())
                else {
                    return Err(Error::validation("enter: email password username"));
                };
                validate_username(username)?;
                let session = self.repo.sign_up(email, password, username).await?;
                info!(user_id = %session.user_id, "Account created");
                self.store.reduce(Action::SubmitInput);
                self.signed_in(session).await
            }
        }
    }
}
