//! Tests for member revocation and ledger purge

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use tripsplit::{
    Expense, ExpenseId, Group, GroupId, GuardError, Ledger, Member, MemoryBackend, RealtimeBackend,
    ResetOutcome, RevocationOutcome, RevocationService, ScriptedPrompter, SessionState, StatePatch,
    TripError, TripStore, ValidationError,
};

const ROOT: &str = "root@trip.io";

fn members() -> Vec<Member> {
    vec![
        Member::new("Root", ROOT, "u0"),
        Member::new("Ann", "ann@x.io", "u1"),
        Member::new("Bob", "bob@x.io", "u2"),
    ]
}

fn ledger() -> Ledger {
    let mut ledger = Ledger::new();
    ledger.insert(
        ExpenseId::new("-a"),
        Expense {
            title: "Hotel".to_string(),
            amount: 300.0,
            by: "Ann".to_string(),
            involved: vec!["Ann".to_string(), "Bob".to_string()],
            timestamp: 1,
            date: "01 Mar".to_string(),
        },
    );
    ledger
}

fn setup() -> (TripStore, MemoryBackend, GroupId) {
    let id = GroupId::new("-Ngoa01");
    let mut backend = MemoryBackend::new(7, Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
    backend.seed_group(
        id.clone(),
        Group {
            name: "Goa".to_string(),
            admin: "ann@x.io".to_string(),
            created_at: 0,
            members: members(),
            expenses: ledger(),
        },
    );
    let store = TripStore::new(SessionState {
        active_group_id: Some(id.clone()),
        members: members(),
        expenses: ledger(),
        ..SessionState::default()
    });
    (store, backend, id)
}

fn service(store: &TripStore) -> RevocationService {
    RevocationService::new(store.clone(), ROOT, "PURGE")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The root admin is protected whatever the letter case and whatever the dialog answers.
    #[test]
    fn property_root_admin_is_never_revoked(
        upper in prop::collection::vec(any::<bool>(), ROOT.len()),
        answer in any::<bool>(),
    ) {
        let (store, mut backend, id) = setup();
        let email: String = ROOT
            .chars()
            .zip(upper)
            .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
            .collect();
        let mut prompter = ScriptedPrompter::new().confirming(answer);

        let result = service(&store).execute(&mut backend, &mut prompter, &email);

        prop_assert!(
            matches!(result, Err(TripError::Guard(GuardError::RootAdminProtected { .. }))),
            "root admin revocation must be rejected"
        );
        prop_assert!(prompter.asked.is_empty());
        prop_assert_eq!(&backend.group(&id).unwrap().members, &members());
        prop_assert_eq!(&store.snapshot().members, &members());
    }
}

#[test]
fn test_declined_confirmation_writes_nothing() {
    let (store, mut backend, id) = setup();
    let mut prompter = ScriptedPrompter::new().confirming(false);

    let outcome = service(&store).execute(&mut backend, &mut prompter, "bob@x.io").unwrap();

    assert_eq!(outcome, RevocationOutcome::Declined);
    assert_eq!(prompter.asked.len(), 1);
    assert_eq!(backend.group(&id).unwrap().members.len(), 3);
}

#[test]
fn test_revocation_replaces_member_list() {
    let (store, mut backend, id) = setup();
    let mut prompter = ScriptedPrompter::new().confirming(true);

    let outcome = service(&store).execute(&mut backend, &mut prompter, "BOB@x.io").unwrap();

    let remaining = vec![members()[0].clone(), members()[1].clone()];
    assert_eq!(outcome, RevocationOutcome::Revoked { remaining: remaining.clone() });
    assert_eq!(backend.group(&id).unwrap().members, remaining);
    // Local state waits for the next snapshot
    assert_eq!(store.snapshot().members.len(), 3);
}

#[test]
fn test_group_admin_field_does_not_protect() {
    let (store, mut backend, id) = setup();
    let mut prompter = ScriptedPrompter::new().confirming(true);

    service(&store).execute(&mut backend, &mut prompter, "ann@x.io").unwrap();
    assert!(!backend.group(&id).unwrap().members.iter().any(|m| m.has_email("ann@x.io")));
}

#[test]
fn test_revocation_without_workspace() {
    let (store, mut backend, _) = setup();
    store.update(StatePatch::new().active_group_id(None));
    let mut prompter = ScriptedPrompter::new().confirming(true);

    let result = service(&store).execute(&mut backend, &mut prompter, "bob@x.io");
    assert!(matches!(result, Err(TripError::Validation(ValidationError::NoActiveWorkspace))));
}

#[test]
fn test_revocation_network_failure_propagates() {
    let (store, mut backend, id) = setup();
    backend.fail_next("offline");
    let mut prompter = ScriptedPrompter::new().confirming(true);

    assert!(service(&store).execute(&mut backend, &mut prompter, "bob@x.io").is_err());
    assert_eq!(backend.group(&id).unwrap().members.len(), 3);
}

#[test]
fn test_purge_token_mismatch_aborts() {
    let (store, mut backend, id) = setup();
    let mut prompter = ScriptedPrompter::new().answering(Some("purge"));

    let result = service(&store).hard_reset(&mut backend, &mut prompter);

    assert!(matches!(result, Err(TripError::Guard(GuardError::ConfirmationMismatch))));
    assert_eq!(backend.group(&id).unwrap().expenses.len(), 1);
}

#[test]
fn test_purge_dismissed_dialog_aborts() {
    let (store, mut backend, id) = setup();
    let mut prompter = ScriptedPrompter::new().answering(None);

    assert!(service(&store).hard_reset(&mut backend, &mut prompter).is_err());
    assert_eq!(backend.group(&id).unwrap().expenses.len(), 1);
}

#[test]
fn test_purge_with_matching_token() {
    let (store, mut backend, id) = setup();
    let mut prompter = ScriptedPrompter::new().answering(Some("PURGE"));

    let outcome = service(&store).hard_reset(&mut backend, &mut prompter).unwrap();

    assert_eq!(outcome, ResetOutcome::Purged);
    assert!(backend.group(&id).unwrap().expenses.is_empty());
    assert_eq!(backend.group(&id).unwrap().members.len(), 3);
}

#[test]
fn test_purge_without_workspace_is_a_no_op() {
    let (store, mut backend, _) = setup();
    store.update(StatePatch::new().active_group_id(None));
    let mut prompter = ScriptedPrompter::new();

    let outcome = service(&store).hard_reset(&mut backend, &mut prompter).unwrap();
    assert_eq!(outcome, ResetOutcome::NoWorkspace);
    assert!(prompter.asked.is_empty());
}

#[test]
fn test_purged_ledger_reaches_watchers() {
    let (store, mut backend, id) = setup();
    backend.watch(&id).unwrap();
    backend.poll_snapshot(&id).unwrap();
    let mut prompter = ScriptedPrompter::new().answering(Some("PURGE"));

    service(&store).hard_reset(&mut backend, &mut prompter).unwrap();
    let snapshot = backend.poll_snapshot(&id).unwrap().unwrap();
    assert!(snapshot.expenses.is_empty());
}
