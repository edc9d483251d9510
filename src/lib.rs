//! TripSplit shared expense ledger
//!
//! A single-threaded session core for splitting group trip expenses: a
//! shallow-merge state store with ordered subscribers, a reconciliation
//! engine that derives every balance from the raw ledger, and adapters to a
//! realtime document store, an auth provider, a chart surface and timers.

pub mod config;
pub mod controller;
pub mod error;
pub mod formatter;
pub mod hasher;
pub mod insights;
pub mod logging;
pub mod memory;
pub mod reconcile;
pub mod revocation;
pub mod state;
pub mod sync;
pub mod traits;
pub mod types;

// Re-export core types and traits
pub use config::AppConfig;
pub use controller::{
    AuthScreen, DashboardView, Notice, NoticeLevel, TripApp, TripAppBuilder, ViewModel,
    WorkspaceHeader,
};
pub use error::{
    CollaboratorError, ConfigError, GuardError, SerializationError, StateError, TripError,
    ValidationError,
};
pub use formatter::{balance_over, calc_balance, display_name_identity, FinanceFormatter, Grouping};
pub use hasher::StateHasher;
pub use insights::InsightRotation;
pub use logging::{ActivityLog, LogEntry, LogLevel};
pub use memory::{ManualScheduler, MemoryBackend, RecordingChart, ScriptedPrompter, StaticAuth};
pub use reconcile::{
    AnalyticsView, BalanceStatus, ChartPoint, ExpenseCard, FeedView, FinancialSummary,
    MemberBalanceCard, MemberRow, ParticipantChip, ReconciliationEngine, SettingsView,
};
pub use revocation::{ResetOutcome, RevocationOutcome, RevocationService};
pub use state::{SessionState, StatePatch, Subscription, TripStore};
pub use sync::{decode_snapshot, ExpenseDraft, SyncAdapter, WorkspaceCard};
pub use traits::{AuthProvider, ChartSurface, IntervalScheduler, Prompter, RealtimeBackend};
pub use types::{
    ChartHandle, Expense, ExpenseId, Group, GroupId, Ledger, Member, NewExpense, StateHash,
    TimerId, UserIdentity, View, WorkspaceSnapshot,
};
