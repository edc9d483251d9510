//! Session state container with shallow-merge updates and ordered subscribers
//!
//! `TripStore` is a cheap-to-clone handle to a single-threaded state cell.
//! `update` is the only mutation path: it merges the fields set on a
//! [`StatePatch`], swaps in the new state, then calls every live subscriber
//! synchronously, in registration order, before returning.

use crate::hasher::StateHasher;
use crate::logging::{ActivityLog, LogEntry, LogLevel};
use crate::types::{ChartHandle, GroupId, Ledger, Member, StateHash, TimerId, UserIdentity, View};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// The whole session state. Each field is replaced wholesale on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub active_group_id: Option<GroupId>,
    pub members: Vec<Member>,
    pub expenses: Ledger,
    pub active_view: View,
    pub current_user: Option<UserIdentity>,
    pub panel_open: bool,
    pub chart: Option<ChartHandle>,
    pub insights_timer: Option<TimerId>,
}

/// A partial state. Unset fields are left untouched by `TripStore::update`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub active_group_id: Option<Option<GroupId>>,
    pub members: Option<Vec<Member>>,
    pub expenses: Option<Ledger>,
    pub active_view: Option<View>,
    pub current_user: Option<Option<UserIdentity>>,
    pub panel_open: Option<bool>,
    pub chart: Option<Option<ChartHandle>>,
    pub insights_timer: Option<Option<TimerId>>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_group_id(mut self, id: Option<GroupId>) -> Self {
        self.active_group_id = Some(id);
        self
    }

    pub fn members(mut self, members: Vec<Member>) -> Self {
        self.members = Some(members);
        self
    }

    pub fn expenses(mut self, expenses: Ledger) -> Self {
        self.expenses = Some(expenses);
        self
    }

    pub fn active_view(mut self, view: View) -> Self {
        self.active_view = Some(view);
        self
    }

    pub fn current_user(mut self, user: Option<UserIdentity>) -> Self {
        self.current_user = Some(user);
        self
    }

    pub fn panel_open(mut self, open: bool) -> Self {
        self.panel_open = Some(open);
        self
    }

    pub fn chart(mut self, chart: Option<ChartHandle>) -> Self {
        self.chart = Some(chart);
        self
    }

    pub fn insights_timer(mut self, timer: Option<TimerId>) -> Self {
        self.insights_timer = Some(timer);
        self
    }

    /// Names of the fields this patch sets, in declaration order
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.active_group_id.is_some() {
            names.push("active_group_id");
        }
        if self.members.is_some() {
            names.push("members");
        }
        if self.expenses.is_some() {
            names.push("expenses");
        }
        if self.active_view.is_some() {
            names.push("active_view");
        }
        if self.current_user.is_some() {
            names.push("current_user");
        }
        if self.panel_open.is_some() {
            names.push("panel_open");
        }
        if self.chart.is_some() {
            names.push("chart");
        }
        if self.insights_timer.is_some() {
            names.push("insights_timer");
        }
        names
    }

    fn apply_to(self, base: &SessionState) -> SessionState {
        SessionState {
            active_group_id: self.active_group_id.unwrap_or_else(|| base.active_group_id.clone()),
            members: self.members.unwrap_or_else(|| base.members.clone()),
            expenses: self.expenses.unwrap_or_else(|| base.expenses.clone()),
            active_view: self.active_view.unwrap_or(base.active_view),
            current_user: self.current_user.unwrap_or_else(|| base.current_user.clone()),
            panel_open: self.panel_open.unwrap_or(base.panel_open),
            chart: self.chart.unwrap_or(base.chart),
            insights_timer: self.insights_timer.unwrap_or(base.insights_timer),
        }
    }
}

type Callback = Rc<dyn Fn(&SessionState)>;

struct StoreInner {
    state: RefCell<Rc<SessionState>>,
    subscribers: RefCell<Vec<(u64, Callback)>>,
    next_subscriber: Cell<u64>,
    revision: Cell<u64>,
    hasher: StateHasher,
    log: RefCell<ActivityLog>,
}

/// Owned handle to the session state. Clones share the same state.
#[derive(Clone)]
pub struct TripStore {
    inner: Rc<StoreInner>,
}

impl fmt::Debug for TripStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TripStore")
            .field("revision", &self.inner.revision.get())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl TripStore {
    pub fn new(initial: SessionState) -> Self {
        Self::with_log(initial, ActivityLog::default())
    }

    pub fn with_log(initial: SessionState, log: ActivityLog) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(Rc::new(initial)),
                subscribers: RefCell::new(Vec::new()),
                next_subscriber: Cell::new(0),
                revision: Cell::new(0),
                hasher: StateHasher::new(),
                log: RefCell::new(log),
            }),
        }
    }

    /// Current state reference; later updates do not affect it
    pub fn snapshot(&self) -> Rc<SessionState> {
        Rc::clone(&self.inner.state.borrow())
    }

    /// Number of updates applied so far
    pub fn revision(&self) -> u64 {
        self.inner.revision.get()
    }

    /// Shallow-merge `patch` into the state, then notify every subscriber
    pub fn update(&self, patch: StatePatch) {
        let fields = patch.field_names().join(",");
        let next = {
            let current = self.inner.state.borrow();
            Rc::new(patch.apply_to(&current))
        };
        *self.inner.state.borrow_mut() = Rc::clone(&next);
        self.inner.revision.set(self.inner.revision.get() + 1);

        // Hashing encodes the whole ledger; skip it unless Debug entries are kept
        if self.inner.log.borrow().accepts(LogLevel::Debug) {
            let message = format!("state update: {}", fields);
            let mut entry = LogEntry::new(LogLevel::Debug, Utc::now(), message)
                .with_metadata("revision", self.revision().to_string());
            if let Some(group) = &next.active_group_id {
                entry = entry.with_group(group.clone());
            }
            if let Ok(hash) = self.inner.hasher.hash(next.as_ref()) {
                entry = entry.with_state_hash(hash);
            }
            self.inner.log.borrow_mut().log(entry);
        }

        // Callbacks may subscribe or update re-entrantly, so no borrow is held.
        let subscribers: Vec<Callback> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for callback in subscribers {
            callback(&next);
        }
    }

    /// Register a callback for every future update.
    ///
    /// The callback lives as long as the returned handle.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SessionState) + 'static,
    {
        let id = self.inner.next_subscriber.get();
        self.inner.next_subscriber.set(id + 1);
        self.inner.subscribers.borrow_mut().push((id, Rc::new(callback)));
        Subscription {
            store: Rc::downgrade(&self.inner),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Fingerprint of the current state
    pub fn current_hash(&self) -> Result<StateHash, crate::error::StateError> {
        self.inner.hasher.hash(self.snapshot().as_ref())
    }

    pub fn record(&self, entry: LogEntry) {
        self.inner.log.borrow_mut().log(entry);
    }

    /// Copy of the activity log collected so far
    pub fn log(&self) -> ActivityLog {
        self.inner.log.borrow().clone()
    }
}

/// Registration of a store subscriber. Dropping it removes the callback.
pub struct Subscription {
    store: Weak<StoreInner>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            inner.subscribers.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_update_merges_only_set_fields() {
        let store = TripStore::new(SessionState::default());
        store.update(StatePatch::new().panel_open(true));
        store.update(StatePatch::new().active_view(View::Settings));

        let state = store.snapshot();
        assert!(state.panel_open);
        assert_eq!(state.active_view, View::Settings);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn test_snapshot_is_not_mutated_by_later_updates() {
        let store = TripStore::new(SessionState::default());
        let before = store.snapshot();
        store.update(StatePatch::new().panel_open(true));

        assert!(!before.panel_open);
        assert!(store.snapshot().panel_open);
    }

    #[test]
    fn test_subscription_drop_unsubscribes() {
        let store = TripStore::new(SessionState::default());
        let calls = Rc::new(RefCell::new(0));

        let counter = Rc::clone(&calls);
        let subscription = store.subscribe(move |_| *counter.borrow_mut() += 1);
        store.update(StatePatch::new().panel_open(true));
        drop(subscription);
        store.update(StatePatch::new().panel_open(false));

        assert_eq!(*calls.borrow(), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_reentrant_update_from_subscriber() {
        let store = TripStore::new(SessionState::default());
        let handle = store.clone();
        let _subscription = store.subscribe(move |state| {
            if state.active_view == View::Analytics && !state.panel_open {
                handle.update(StatePatch::new().panel_open(true));
            }
        });

        store.update(StatePatch::new().active_view(View::Analytics));
        assert!(store.snapshot().panel_open);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn test_update_skipped_below_log_level() {
        let store = TripStore::new(SessionState::default());
        store.update(StatePatch::new().panel_open(true));

        assert!(store.log().is_empty());
        assert!(!store.log().accepts(LogLevel::Debug));
        assert!(store.log().accepts(LogLevel::Info));
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_update_is_logged_with_fields() {
        let store = TripStore::with_log(SessionState::default(), ActivityLog::all());
        store.update(StatePatch::new().members(Vec::new()).expenses(Ledger::new()));

        let log = store.log();
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].message, "state update: members,expenses");
        assert!(log.entries()[0].state_hash.is_some());
    }
}
