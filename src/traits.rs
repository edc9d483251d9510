//! Collaborator seams: realtime store, auth, charting, timers and dialogs

use crate::error::TripError;
use crate::reconcile::ChartPoint;
use crate::types::{
    ChartHandle, ExpenseId, Group, GroupId, Member, NewExpense, TimerId, UserIdentity,
    WorkspaceSnapshot,
};
use std::time::Duration;

/// Realtime document store holding every group
pub trait RealtimeBackend {
    fn fetch_group(&self, id: &GroupId) -> Result<Option<Group>, TripError>;

    /// Every group the store holds, in key order
    fn list_groups(&self) -> Result<Vec<(GroupId, Group)>, TripError>;

    fn create_group(&mut self, group: Group) -> Result<GroupId, TripError>;

    /// Replace the whole member list of a group
    fn replace_members(&mut self, id: &GroupId, members: Vec<Member>) -> Result<(), TripError>;

    /// Append an expense; the store assigns key and timestamp
    fn push_expense(&mut self, id: &GroupId, expense: NewExpense) -> Result<ExpenseId, TripError>;

    /// Remove every expense of a group
    fn remove_expenses(&mut self, id: &GroupId) -> Result<(), TripError>;

    /// Start delivering snapshots of a group through `poll_snapshot`
    fn watch(&mut self, id: &GroupId) -> Result<(), TripError>;

    /// Next pending snapshot of a watched group, if it changed since the last poll.
    ///
    /// A group that no longer exists yields `None`.
    fn poll_snapshot(&mut self, id: &GroupId) -> Result<Option<WorkspaceSnapshot>, TripError>;
}

/// Authentication provider
pub trait AuthProvider {
    fn sign_in(&mut self) -> Result<UserIdentity, TripError>;

    fn sign_out(&mut self) -> Result<(), TripError>;

    fn current_user(&self) -> Option<UserIdentity>;
}

/// Charting library surface
pub trait ChartSurface {
    fn draw(&mut self, series: &[ChartPoint]) -> Result<ChartHandle, TripError>;

    /// Release a chart previously returned by `draw`
    fn dispose(&mut self, handle: ChartHandle);
}

/// Host timer facility
pub trait IntervalScheduler {
    fn start_interval(&mut self, period: Duration) -> TimerId;

    fn cancel(&mut self, timer: TimerId);
}

/// Modal dialogs shown to the user
pub trait Prompter {
    /// Yes/no confirmation
    fn confirm(&mut self, message: &str) -> bool;

    /// Free text answer; `None` when dismissed
    fn prompt(&mut self, message: &str) -> Option<String>;
}
