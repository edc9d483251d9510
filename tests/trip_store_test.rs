//! Tests for the session store
//!
//! These tests verify:
//! - Exactly one synchronous notification per update, per subscriber
//! - Notifications follow registration order
//! - Shallow merge leaves unset fields untouched

use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use tripsplit::{
    ActivityLog, GroupId, LogLevel, Member, SessionState, StatePatch, TripStore, UserIdentity, View,
};

fn arb_patch() -> impl Strategy<Value = StatePatch> {
    (
        prop::option::of(any::<bool>()),
        prop::option::of(prop_oneof![
            Just(View::Dashboard),
            Just(View::Feed),
            Just(View::Analytics),
            Just(View::Settings),
        ]),
        prop::option::of(prop::option::of("[a-z]{4,8}")),
    )
        .prop_map(|(panel, view, group)| {
            let mut patch = StatePatch::new();
            if let Some(open) = panel {
                patch = patch.panel_open(open);
            }
            if let Some(view) = view {
                patch = patch.active_view(view);
            }
            if let Some(group) = group {
                patch = patch.active_group_id(group.map(GroupId::new));
            }
            patch
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every subscriber sees every update exactly once, in registration order.
    #[test]
    fn property_each_update_notifies_each_subscriber_once(
        patches in prop::collection::vec(arb_patch(), 1..20),
        subscribers in 1usize..5
    ) {
        let store = TripStore::new(SessionState::default());
        let seen: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));

        let _subscriptions: Vec<_> = (0..subscribers)
            .map(|i| {
                let seen = Rc::clone(&seen);
                store.subscribe(move |_| seen.borrow_mut().push(i))
            })
            .collect();

        for patch in &patches {
            seen.borrow_mut().clear();
            store.update(patch.clone());
            let expected: Vec<usize> = (0..subscribers).collect();
            prop_assert_eq!(&*seen.borrow(), &expected);
        }
        prop_assert_eq!(store.revision(), patches.len() as u64);
    }

    /// Fields a patch does not set keep their previous value.
    #[test]
    fn property_shallow_merge_preserves_unset_fields(patch in arb_patch()) {
        let members = vec![Member::new("Ann", "ann@x.io", "u1")];
        let store = TripStore::new(SessionState {
            members: members.clone(),
            current_user: Some(UserIdentity::new("Ann Lee", "ann@x.io", "u1")),
            ..SessionState::default()
        });
        let before = store.snapshot();
        store.update(patch.clone());
        let after = store.snapshot();

        prop_assert_eq!(&after.members, &members);
        prop_assert_eq!(&after.current_user, &before.current_user);
        if patch.panel_open.is_none() {
            prop_assert_eq!(after.panel_open, before.panel_open);
        }
        if patch.active_view.is_none() {
            prop_assert_eq!(after.active_view, before.active_view);
        }
        if patch.active_group_id.is_none() {
            prop_assert_eq!(&after.active_group_id, &before.active_group_id);
        }
    }
}

#[test]
fn test_subscriber_sees_new_state() {
    let store = TripStore::new(SessionState::default());
    let observed = Rc::new(RefCell::new(None));

    let sink = Rc::clone(&observed);
    let _subscription = store.subscribe(move |state| *sink.borrow_mut() = Some(state.active_view));
    store.update(StatePatch::new().active_view(View::Feed));

    assert_eq!(*observed.borrow(), Some(View::Feed));
}

#[test]
fn test_explicit_unsubscribe_stops_notifications() {
    let store = TripStore::new(SessionState::default());
    let calls = Rc::new(RefCell::new(0));

    let counter = Rc::clone(&calls);
    let subscription = store.subscribe(move |_| *counter.borrow_mut() += 1);
    store.update(StatePatch::new().panel_open(true));
    subscription.unsubscribe();
    store.update(StatePatch::new().panel_open(false));

    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn test_subscription_outliving_store_is_harmless() {
    let store = TripStore::new(SessionState::default());
    let subscription = store.subscribe(|_| {});
    drop(store);
    drop(subscription);
}

#[test]
fn test_clones_share_state() {
    let store = TripStore::new(SessionState::default());
    let other = store.clone();
    other.update(StatePatch::new().panel_open(true));
    assert!(store.snapshot().panel_open);
}

#[test]
fn test_update_log_carries_group_and_hash() {
    let store = TripStore::with_log(SessionState::default(), ActivityLog::all());
    let group = GroupId::new("-Ngoa01");
    store.update(StatePatch::new().active_group_id(Some(group.clone())));

    let log = store.log();
    let entries = log.filter_by_group(&group);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level, LogLevel::Debug);
    assert_eq!(entries[0].metadata_value("revision"), Some("1"));
    assert_eq!(entries[0].state_hash.as_ref(), store.current_hash().ok().as_ref());
}

#[test]
fn test_identical_states_hash_equal() {
    let a = TripStore::new(SessionState::default());
    let b = TripStore::new(SessionState::default());
    assert_eq!(a.current_hash().unwrap(), b.current_hash().unwrap());

    b.update(StatePatch::new().panel_open(true));
    assert_ne!(a.current_hash().unwrap(), b.current_hash().unwrap());
}
