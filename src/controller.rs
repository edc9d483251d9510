//! View controller: owns the collaborators and turns state into view models
//!
//! `TripApp` is the single place where failures stop. Every operation
//! catches its own errors, records them in the activity log and queues a
//! [`Notice`] for the user; the session always stays usable.

use crate::config::AppConfig;
use crate::error::{CollaboratorError, ConfigError, GuardError, TripError, ValidationError};
use crate::formatter::{display_name_identity, FinanceFormatter};
use crate::insights::InsightRotation;
use crate::logging::{ActivityLog, LogEntry, LogLevel};
use crate::reconcile::{
    AnalyticsView, FeedView, FinancialSummary, MemberBalanceCard, ParticipantChip,
    ReconciliationEngine, SettingsView,
};
use crate::revocation::{ResetOutcome, RevocationOutcome, RevocationService};
use crate::state::{SessionState, StatePatch, Subscription, TripStore};
use crate::sync::{ExpenseDraft, SyncAdapter, WorkspaceCard};
use crate::traits::{AuthProvider, ChartSurface, IntervalScheduler, Prompter, RealtimeBackend};
use crate::types::{ExpenseId, GroupId, UserIdentity, View};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// Transient message shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Figures kept current by the store subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub summary: FinancialSummary,
    pub ribbon: Vec<MemberBalanceCard>,
    pub feed: FeedView,
}

impl DashboardView {
    fn render(engine: &ReconciliationEngine, state: &SessionState) -> Self {
        Self {
            summary: engine.reconcile_financials(state),
            ribbon: engine.render_ribbon(state),
            feed: engine.render_feed(state),
        }
    }
}

/// Header of the workspace currently open
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceHeader {
    pub id: GroupId,
    pub name: String,
    /// First six characters of the id
    pub short_id: String,
}

impl WorkspaceHeader {
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            short_id: id.short().to_string(),
            name: name.into(),
            id,
        }
    }
}

/// Everything the presentation layer needs after a refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub active_view: View,
    pub workspace: Option<WorkspaceHeader>,
    /// Length of the view switch animation
    pub transition: Duration,
    pub dashboard: DashboardView,
    pub participants: Vec<ParticipantChip>,
    pub analytics: Option<AnalyticsView>,
    pub settings: Option<SettingsView>,
    /// Banner the insight timer shows on its next tick
    pub insight: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuthScreen {
    Unauthorized,
    Authorized {
        avatar_url: String,
        /// Whether the admin pillar is shown
        is_admin: bool,
        workspaces: Vec<WorkspaceCard>,
    },
}

/// Application facade wiring the store, the engine and the collaborators
pub struct TripApp<B, A, C, T> {
    config: AppConfig,
    store: TripStore,
    engine: ReconciliationEngine,
    sync: SyncAdapter,
    revocation: RevocationService,
    backend: B,
    auth: A,
    chart: C,
    scheduler: T,
    insights: InsightRotation,
    workspace: Option<WorkspaceHeader>,
    notices: Vec<Notice>,
    dashboard: Rc<RefCell<Option<DashboardView>>>,
    _dashboard_subscription: Subscription,
}

impl<B, A, C, T> TripApp<B, A, C, T>
where
    B: RealtimeBackend,
    A: AuthProvider,
    C: ChartSurface,
    T: IntervalScheduler,
{
    pub fn builder() -> TripAppBuilder<B, A, C, T> {
        TripAppBuilder::new()
    }

    fn new(
        config: AppConfig,
        log: ActivityLog,
        backend: B,
        auth: A,
        chart: C,
        scheduler: T,
    ) -> Self {
        let store = TripStore::with_log(SessionState::default(), log);
        let formatter = FinanceFormatter::from_config(&config);
        let engine = ReconciliationEngine::new(formatter.clone());

        let dashboard = Rc::new(RefCell::new(None));
        let subscription = {
            let engine = engine.clone();
            let dashboard = Rc::clone(&dashboard);
            store.subscribe(move |state| {
                *dashboard.borrow_mut() = Some(DashboardView::render(&engine, state));
            })
        };

        Self {
            sync: SyncAdapter::new(store.clone(), formatter),
            revocation: RevocationService::new(
                store.clone(),
                config.admin_privilege.clone(),
                config.purge_token.clone(),
            ),
            config,
            store,
            engine,
            backend,
            auth,
            chart,
            scheduler,
            insights: InsightRotation::for_members(0),
            workspace: None,
            notices: Vec::new(),
            dashboard,
            _dashboard_subscription: subscription,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &TripStore {
        &self.store
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn chart(&self) -> &C {
        &self.chart
    }

    pub fn scheduler(&self) -> &T {
        &self.scheduler
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Drain queued notices, oldest first
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Dashboard as last rendered by the store subscription
    pub fn latest_dashboard(&self) -> Option<DashboardView> {
        self.dashboard.borrow().clone()
    }

    pub fn active_workspace_id(&self) -> Option<GroupId> {
        self.store.snapshot().active_group_id.clone()
    }

    pub fn workspace(&self) -> Option<&WorkspaceHeader> {
        self.workspace.as_ref()
    }

    /// Full id of the open workspace, for sharing with other members
    pub fn copy_workspace_id(&mut self) -> Option<String> {
        let id = self.workspace.as_ref()?.id.to_string();
        self.notify(NoticeLevel::Success, "Cloud ID copied");
        Some(id)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        let log_level = match level {
            NoticeLevel::Success | NoticeLevel::Info => LogLevel::Info,
            NoticeLevel::Warning => LogLevel::Warn,
            NoticeLevel::Error => LogLevel::Error,
        };
        self.store.record(LogEntry::new(log_level, Utc::now(), message.clone()));
        self.notices.push(Notice::new(level, message));
    }

    /// Terminal handling of a failed operation
    fn fail(&mut self, err: &TripError, collaborator_message: &str) {
        let (level, message) = match err {
            TripError::Validation(e) => (NoticeLevel::Warning, format!("Missing details: {}", e)),
            TripError::Guard(GuardError::RootAdminProtected { .. }) => {
                (NoticeLevel::Warning, "Root admin protection is active".to_string())
            }
            TripError::Guard(GuardError::ConfirmationMismatch) => {
                (NoticeLevel::Info, "Security override: reset aborted".to_string())
            }
            TripError::Collaborator(CollaboratorError::NotFound { .. }) => {
                (NoticeLevel::Error, "Cloud ID not found".to_string())
            }
            _ => (NoticeLevel::Error, collaborator_message.to_string()),
        };
        let log_level = match err {
            TripError::Validation(_) | TripError::Guard(_) => LogLevel::Warn,
            _ => LogLevel::Error,
        };
        let mut entry = LogEntry::new(log_level, Utc::now(), message.clone())
            .with_metadata("error", err.to_string());
        if let Some(group) = self.active_workspace_id() {
            entry = entry.with_group(group);
        }
        self.store.record(entry);
        self.notices.push(Notice::new(level, message));
    }

    pub fn sign_in(&mut self) -> AuthScreen {
        match self.auth.sign_in() {
            Ok(user) => {
                let name = user.display_name.clone().unwrap_or_default();
                self.notify(NoticeLevel::Success, format!("Authorized: {}", name));
                self.on_auth_changed(Some(user))
            }
            Err(err) => {
                self.fail(&err, "SSO handshake failed");
                AuthScreen::Unauthorized
            }
        }
    }

    pub fn sign_out(&mut self) -> AuthScreen {
        if let Err(err) = self.auth.sign_out() {
            self.fail(&err, "Sign out failed");
        }
        let user = self.auth.current_user();
        self.on_auth_changed(user)
    }

    /// React to the provider's "current user changed" notification
    pub fn on_auth_changed(&mut self, user: Option<UserIdentity>) -> AuthScreen {
        let user = match user {
            Some(user) => user,
            None => {
                self.store.update(StatePatch::new().current_user(None));
                return AuthScreen::Unauthorized;
            }
        };
        self.store.update(StatePatch::new().current_user(Some(user.clone())));

        let avatar_url = user.photo_url.clone().unwrap_or_else(|| {
            format!(
                "{}{}",
                self.config.avatar_fallback_url,
                user.display_name.as_deref().unwrap_or_default()
            )
        });
        let email = user.normalized_email();
        let workspaces = match self.sync.discover_workspaces(&self.backend, &email) {
            Ok(workspaces) => workspaces,
            Err(err) => {
                self.fail(&err, "Workspace discovery failed");
                Vec::new()
            }
        };

        AuthScreen::Authorized {
            avatar_url,
            is_admin: self.config.is_admin(&user.email),
            workspaces,
        }
    }

    /// Activate a workspace and load its first snapshot
    pub fn enter_workspace(&mut self, id: &GroupId, name: &str) -> Option<ViewModel> {
        if let Err(err) = self.sync.stream_workspace(&mut self.backend, id) {
            self.fail(&err, "Workspace stream failed");
            return None;
        }
        self.workspace = Some(WorkspaceHeader::new(id.clone(), name));
        self.store.record(
            LogEntry::new(LogLevel::Info, Utc::now(), format!("entered workspace {}", id.short()))
                .with_group(id.clone()),
        );
        self.sync()
    }

    pub fn create_workspace(&mut self, name: &str) -> Option<GroupId> {
        let result = match self.store.snapshot().current_user.clone() {
            Some(user) => self.sync.create_workspace(&mut self.backend, name, &user),
            None => Err(ValidationError::NotSignedIn.into()),
        };
        match result {
            Ok(id) => {
                self.notify(NoticeLevel::Success, "Workspace initialized");
                self.enter_workspace(&id, name.trim());
                Some(id)
            }
            Err(err) => {
                self.fail(&err, "Creation API error");
                None
            }
        }
    }

    pub fn join_workspace(&mut self, id: &str) -> Option<GroupId> {
        let result = match self.store.snapshot().current_user.clone() {
            Some(user) => self.sync.join_workspace(&mut self.backend, id, &user),
            None => Err(ValidationError::NotSignedIn.into()),
        };
        match result {
            Ok((id, group)) => {
                self.notify(NoticeLevel::Success, "Handshake successful");
                self.enter_workspace(&id, &group.name);
                Some(id)
            }
            Err(err) => {
                self.fail(&err, "Network rejection");
                None
            }
        }
    }

    /// Apply a pending remote snapshot and refresh when one arrived
    pub fn sync(&mut self) -> Option<ViewModel> {
        match self.sync.pull(&mut self.backend) {
            Ok(true) => Some(self.refresh()),
            Ok(false) => None,
            Err(err) => {
                self.fail(&err, "Cloud sync interrupted");
                None
            }
        }
    }

    pub fn navigate(&mut self, view: View) -> ViewModel {
        self.store.update(StatePatch::new().active_view(view));
        self.refresh()
    }

    pub fn toggle_panel(&mut self, open: bool) {
        self.store.update(StatePatch::new().panel_open(open));
    }

    pub fn publish(&mut self, draft: &ExpenseDraft) -> Option<ExpenseId> {
        self.publish_at(draft, Utc::now())
    }

    /// Publish with an explicit client clock for the date label
    pub fn publish_at(&mut self, draft: &ExpenseDraft, now: DateTime<Utc>) -> Option<ExpenseId> {
        match self.sync.publish_expense(&mut self.backend, draft, now) {
            Ok(id) => {
                self.notify(NoticeLevel::Success, "Cloud ledger updated");
                self.toggle_panel(false);
                Some(id)
            }
            Err(err) => {
                self.fail(&err, "Publication error");
                None
            }
        }
    }

    pub fn revoke<P: Prompter>(
        &mut self,
        email: &str,
        prompter: &mut P,
    ) -> Option<RevocationOutcome> {
        match self.revocation.execute(&mut self.backend, prompter, email) {
            Ok(outcome) => {
                if matches!(outcome, RevocationOutcome::Revoked { .. }) {
                    self.notify(NoticeLevel::Success, "Access rights terminated");
                }
                Some(outcome)
            }
            Err(err) => {
                self.fail(&err, "API authorization denied");
                None
            }
        }
    }

    pub fn reset_ledger<P: Prompter>(&mut self, prompter: &mut P) -> Option<ResetOutcome> {
        match self.revocation.hard_reset(&mut self.backend, prompter) {
            Ok(ResetOutcome::Purged) => {
                self.notify(NoticeLevel::Success, "Cloud ledger purged");
                self.navigate(View::Dashboard);
                Some(ResetOutcome::Purged)
            }
            Ok(outcome) => Some(outcome),
            Err(err) => {
                self.fail(&err, "Critical system error");
                None
            }
        }
    }

    /// Recompute every derived view from the full state.
    ///
    /// Also redraws the chart on the analytics view and restarts the insight
    /// timer, cancelling the previous one.
    pub fn refresh(&mut self) -> ViewModel {
        let state = self.store.snapshot();
        let dashboard = DashboardView::render(&self.engine, &state);
        let participants = self.engine.participant_chips(&state);

        let analytics = if state.active_view == View::Analytics {
            match self.engine.render_chart(&self.store, &mut self.chart) {
                Ok(analytics) => analytics,
                Err(err) => {
                    self.store.update(StatePatch::new().chart(None));
                    self.fail(&err, "Chart rendering failed");
                    None
                }
            }
        } else {
            None
        };
        let settings =
            (state.active_view == View::Settings).then(|| self.engine.render_settings(&state));

        self.restart_insights(state.members.len());

        ViewModel {
            active_view: state.active_view,
            workspace: self.workspace.clone(),
            transition: Duration::from_millis(self.config.anim_duration_ms),
            dashboard,
            participants,
            analytics,
            settings,
            insight: self.insights.peek().map(str::to_string),
        }
    }

    fn restart_insights(&mut self, member_count: usize) {
        if let Some(previous) = self.store.snapshot().insights_timer {
            self.scheduler.cancel(previous);
        }
        let timer = self
            .scheduler
            .start_interval(Duration::from_millis(self.config.insight_interval_ms));
        self.insights = InsightRotation::for_members(member_count);
        self.store.update(StatePatch::new().insights_timer(Some(timer)));
    }

    /// Advance the rotation on a timer tick and return its banner
    pub fn tick_insights(&mut self) -> Option<String> {
        self.insights.next_message().map(str::to_string)
    }

    /// Identity the ledger uses for the signed-in user
    pub fn current_identity(&self) -> String {
        display_name_identity(self.store.snapshot().current_user.as_ref())
    }
}

/// Builder for constructing a [`TripApp`]
pub struct TripAppBuilder<B, A, C, T> {
    config: AppConfig,
    log: ActivityLog,
    backend: Option<B>,
    auth: Option<A>,
    chart: Option<C>,
    scheduler: Option<T>,
}

impl<B, A, C, T> TripAppBuilder<B, A, C, T>
where
    B: RealtimeBackend,
    A: AuthProvider,
    C: ChartSurface,
    T: IntervalScheduler,
{
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            log: ActivityLog::default(),
            backend: None,
            auth: None,
            chart: None,
            scheduler: None,
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_log(mut self, log: ActivityLog) -> Self {
        self.log = log;
        self
    }

    pub fn with_backend(mut self, backend: B) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_auth(mut self, auth: A) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_chart(mut self, chart: C) -> Self {
        self.chart = Some(chart);
        self
    }

    pub fn with_scheduler(mut self, scheduler: T) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn build(self) -> Result<TripApp<B, A, C, T>, ConfigError> {
        self.config.validate()?;
        let missing = |component: &str| ConfigError::MissingComponent {
            component: component.to_string(),
        };
        let backend = self.backend.ok_or_else(|| missing("backend"))?;
        let auth = self.auth.ok_or_else(|| missing("auth"))?;
        let chart = self.chart.ok_or_else(|| missing("chart"))?;
        let scheduler = self.scheduler.ok_or_else(|| missing("scheduler"))?;

        Ok(TripApp::new(self.config, self.log, backend, auth, chart, scheduler))
    }
}

impl<B, A, C, T> Default for TripAppBuilder<B, A, C, T>
where
    B: RealtimeBackend,
    A: AuthProvider,
    C: ChartSurface,
    T: IntervalScheduler,
{
    fn default() -> Self {
        Self::new()
    }
}
