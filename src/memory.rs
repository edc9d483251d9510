//! In-process collaborators
//!
//! Deterministic implementations of every collaborator trait. The backend
//! draws push keys from a seeded generator and stamps records from a
//! monotonic server clock, so two runs with the same seed produce the same
//! keys and timestamps.

use crate::error::{CollaboratorError, TripError};
use crate::reconcile::ChartPoint;
use crate::traits::{AuthProvider, ChartSurface, IntervalScheduler, Prompter, RealtimeBackend};
use crate::types::{
    ChartHandle, ExpenseId, Group, GroupId, Member, NewExpense, TimerId, UserIdentity,
    WorkspaceSnapshot,
};
use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;

const PUSH_CHARS: &[u8] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Generates chronologically ordered push keys from a seed
#[derive(Debug, Clone)]
pub struct PushKeyGenerator {
    rng: ChaCha8Rng,
}

impl PushKeyGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Key whose prefix sorts by `millis`, followed by random characters
    pub fn next_key(&mut self, millis: i64) -> String {
        let mut key = format!("-{:012x}", millis.max(0));
        for _ in 0..8 {
            let idx = self.rng.gen_range(0..PUSH_CHARS.len());
            key.push(PUSH_CHARS[idx] as char);
        }
        key
    }
}

const CLOCK_STEP_MILLIS: i64 = 1000;

/// Monotonic server clock in milliseconds, one second per write
#[derive(Debug, Clone)]
pub struct ServerClock {
    now_millis: i64,
}

impl ServerClock {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now_millis: start.timestamp_millis(),
        }
    }

    /// Current server time, then advance one step
    pub fn tick(&mut self) -> i64 {
        let now = self.now_millis;
        self.now_millis += CLOCK_STEP_MILLIS;
        now
    }
}

/// Realtime store kept entirely in memory
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    groups: BTreeMap<GroupId, Group>,
    watched: BTreeSet<GroupId>,
    pending: BTreeSet<GroupId>,
    keys: PushKeyGenerator,
    clock: ServerClock,
    failures: RefCell<VecDeque<String>>,
}

impl MemoryBackend {
    pub fn new(seed: u64, start: DateTime<Utc>) -> Self {
        Self {
            groups: BTreeMap::new(),
            watched: BTreeSet::new(),
            pending: BTreeSet::new(),
            keys: PushKeyGenerator::new(seed),
            clock: ServerClock::starting_at(start),
            failures: RefCell::new(VecDeque::new()),
        }
    }

    /// Insert a group under a fixed key, bypassing key generation
    pub fn seed_group(&mut self, id: GroupId, group: Group) {
        self.mark_changed(&id);
        self.groups.insert(id, group);
    }

    /// Make the next call fail with a network error
    pub fn fail_next(&mut self, reason: impl Into<String>) {
        self.failures.get_mut().push_back(reason.into());
    }

    pub fn group(&self, id: &GroupId) -> Option<&Group> {
        self.groups.get(id)
    }

    /// Overwrite a group's members as if another session wrote them
    pub fn write_members_remotely(&mut self, id: &GroupId, members: Vec<Member>) {
        if let Some(group) = self.groups.get_mut(id) {
            group.members = members;
        }
        self.mark_changed(id);
    }

    fn check_failure(&self) -> Result<(), TripError> {
        match self.failures.borrow_mut().pop_front() {
            Some(reason) => Err(CollaboratorError::Network { reason }.into()),
            None => Ok(()),
        }
    }

    fn mark_changed(&mut self, id: &GroupId) {
        if self.watched.contains(id) {
            self.pending.insert(id.clone());
        }
    }

    fn group_mut(&mut self, id: &GroupId) -> Result<&mut Group, TripError> {
        self.groups.get_mut(id).ok_or_else(|| {
            CollaboratorError::NotFound {
                id: id.to_string(),
            }
            .into()
        })
    }
}

impl RealtimeBackend for MemoryBackend {
    fn fetch_group(&self, id: &GroupId) -> Result<Option<Group>, TripError> {
        self.check_failure()?;
        Ok(self.groups.get(id).cloned())
    }

    fn list_groups(&self) -> Result<Vec<(GroupId, Group)>, TripError> {
        self.check_failure()?;
        Ok(self
            .groups
            .iter()
            .map(|(id, group)| (id.clone(), group.clone()))
            .collect())
    }

    fn create_group(&mut self, mut group: Group) -> Result<GroupId, TripError> {
        self.check_failure()?;
        let now = self.clock.tick();
        let id = GroupId::new(self.keys.next_key(now));
        group.created_at = now;
        self.groups.insert(id.clone(), group);
        Ok(id)
    }

    fn replace_members(&mut self, id: &GroupId, members: Vec<Member>) -> Result<(), TripError> {
        self.check_failure()?;
        self.group_mut(id)?.members = members;
        self.mark_changed(id);
        Ok(())
    }

    fn push_expense(&mut self, id: &GroupId, expense: NewExpense) -> Result<ExpenseId, TripError> {
        self.check_failure()?;
        let now = self.clock.tick();
        let key = ExpenseId::new(self.keys.next_key(now));
        self.group_mut(id)?.expenses.insert(key.clone(), expense.stamp(now));
        self.mark_changed(id);
        Ok(key)
    }

    fn remove_expenses(&mut self, id: &GroupId) -> Result<(), TripError> {
        self.check_failure()?;
        self.group_mut(id)?.expenses.clear();
        self.mark_changed(id);
        Ok(())
    }

    fn watch(&mut self, id: &GroupId) -> Result<(), TripError> {
        self.check_failure()?;
        self.watched.insert(id.clone());
        self.pending.insert(id.clone());
        Ok(())
    }

    fn poll_snapshot(&mut self, id: &GroupId) -> Result<Option<WorkspaceSnapshot>, TripError> {
        self.check_failure()?;
        if !self.pending.remove(id) {
            return Ok(None);
        }
        Ok(self.groups.get(id).map(WorkspaceSnapshot::from))
    }
}

/// Auth provider that signs in a fixed identity
#[derive(Debug, Clone)]
pub struct StaticAuth {
    identity: UserIdentity,
    signed_in: bool,
    reject_with: Option<String>,
}

impl StaticAuth {
    pub fn new(identity: UserIdentity) -> Self {
        Self {
            identity,
            signed_in: false,
            reject_with: None,
        }
    }

    /// Make every sign-in attempt fail
    pub fn rejecting(mut self, reason: impl Into<String>) -> Self {
        self.reject_with = Some(reason.into());
        self
    }
}

impl AuthProvider for StaticAuth {
    fn sign_in(&mut self) -> Result<UserIdentity, TripError> {
        if let Some(reason) = &self.reject_with {
            return Err(CollaboratorError::Auth { reason: reason.clone() }.into());
        }
        self.signed_in = true;
        Ok(self.identity.clone())
    }

    fn sign_out(&mut self) -> Result<(), TripError> {
        self.signed_in = false;
        Ok(())
    }

    fn current_user(&self) -> Option<UserIdentity> {
        self.signed_in.then(|| self.identity.clone())
    }
}

/// Chart surface that records draws and disposals
#[derive(Debug, Clone, Default)]
pub struct RecordingChart {
    next: u64,
    live: BTreeSet<u64>,
    pub disposed: Vec<ChartHandle>,
    pub drawn: Vec<Vec<ChartPoint>>,
}

impl RecordingChart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl ChartSurface for RecordingChart {
    fn draw(&mut self, series: &[ChartPoint]) -> Result<ChartHandle, TripError> {
        self.next += 1;
        self.live.insert(self.next);
        self.drawn.push(series.to_vec());
        Ok(ChartHandle(self.next))
    }

    fn dispose(&mut self, handle: ChartHandle) {
        self.live.remove(&handle.0);
        self.disposed.push(handle);
    }
}

/// Scheduler whose timers only fire when the host says so
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    next: u64,
    active: BTreeMap<u64, Duration>,
    pub cancelled: Vec<TimerId>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn period_of(&self, timer: TimerId) -> Option<Duration> {
        self.active.get(&timer.0).copied()
    }
}

impl IntervalScheduler for ManualScheduler {
    fn start_interval(&mut self, period: Duration) -> TimerId {
        self.next += 1;
        self.active.insert(self.next, period);
        TimerId(self.next)
    }

    fn cancel(&mut self, timer: TimerId) {
        self.active.remove(&timer.0);
        self.cancelled.push(timer);
    }
}

/// Prompter that replays queued answers
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter {
    confirmations: VecDeque<bool>,
    answers: VecDeque<Option<String>>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirming(mut self, answer: bool) -> Self {
        self.confirmations.push_back(answer);
        self
    }

    pub fn answering(mut self, answer: Option<&str>) -> Self {
        self.answers.push_back(answer.map(str::to_string));
        self
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, message: &str) -> bool {
        self.asked.push(message.to_string());
        self.confirmations.pop_front().unwrap_or(false)
    }

    fn prompt(&mut self, message: &str) -> Option<String> {
        self.asked.push(message.to_string());
        self.answers.pop_front().flatten()
    }
}
