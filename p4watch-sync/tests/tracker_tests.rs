mod common;

use common::{init_logging, FakeDepot, DEPOT, WORKSPACE};
use p4watch_core::{ChangeNumber, ChangesetEntry};
use p4watch_sync::{
    Operation, RevisionTracker, StaleReason, SyncError, MAX_CHANGELISTS_TO_FETCH,
};

fn tracker(depot: &FakeDepot) -> RevisionTracker<&FakeDepot> {
    init_logging();
    RevisionTracker::new(depot, DEPOT, WORKSPACE)
}

fn numbers(revisions: &[p4watch_core::Revision]) -> Vec<u64> {
    revisions.iter().map(|r| r.number.get()).collect()
}

// ---------------------------------------------------------------------------
// Latest revision queries
// ---------------------------------------------------------------------------

#[test]
fn latest_remote_revision_is_fully_described() {
    let depot = FakeDepot::with_changes([3, 7, 5]);
    let latest = tracker(&depot).latest_remote_revision().expect("latest");

    assert_eq!(latest.number, ChangeNumber(7));
    assert_eq!(latest.author, "alice");
    assert_eq!(latest.timestamp.timestamp(), 1_007);
    assert_eq!(latest.message, "change 7\n");
    assert_eq!(
        latest.changeset(),
        &[
            ChangesetEntry::new("add", "//proj/a7.txt"),
            ChangesetEntry::new("edit", "//proj/z7.txt"),
        ]
    );
    assert_eq!(depot.calls_of(Operation::Changes), vec!["-m 1 //proj/..."]);
    assert_eq!(depot.calls_of(Operation::Describe), vec!["-s 7"]);
}

#[test]
fn empty_depot_reports_no_revisions() {
    let depot = FakeDepot::default();
    let err = tracker(&depot).latest_remote_revision().unwrap_err();
    match err {
        SyncError::NoRevisionsFound { scope } => assert_eq!(scope, DEPOT),
        other => panic!("expected no revisions, got {other:?}"),
    }
}

#[test]
fn latest_local_revision_is_scoped_to_workspace() {
    let depot = FakeDepot {
        have: Some(5),
        ..FakeDepot::with_changes([3, 5, 7])
    };
    let local = tracker(&depot).latest_local_revision().expect("local");

    assert_eq!(local.number, ChangeNumber(5));
    assert_eq!(depot.calls_of(Operation::Changes), vec!["-m 1 @ci-ws"]);
}

#[test]
fn unsynced_workspace_reports_no_revisions() {
    let depot = FakeDepot::with_changes([3]);
    let err = tracker(&depot).latest_local_revision().unwrap_err();
    assert!(matches!(err, SyncError::NoRevisionsFound { .. }), "got: {err}");
    assert!(err.to_string().contains("@ci-ws"));
}

#[test]
fn malformed_describe_surfaces() {
    let depot = FakeDepot {
        broken_describe: vec![7],
        ..FakeDepot::with_changes([7])
    };
    let err = tracker(&depot).latest_remote_revision().unwrap_err();
    assert!(matches!(err, SyncError::MalformedOutput(_)), "got: {err}");
    assert!(err.to_string().contains("user"));
}

// ---------------------------------------------------------------------------
// Up-to-date checks
// ---------------------------------------------------------------------------

#[test]
fn equal_head_is_up_to_date_without_reasons() {
    let depot = FakeDepot::with_changes(1..=10);
    let check = tracker(&depot).is_up_to_date(10u64).expect("check");

    assert!(check.up_to_date);
    assert!(check.reasons.is_empty());
    assert_eq!(depot.calls_of(Operation::Changes).len(), 1, "no range query");
}

#[test]
fn older_head_is_up_to_date() {
    let depot = FakeDepot::with_changes(1..=8);
    let check = tracker(&depot).is_up_to_date(10u64).expect("check");
    assert!(check.up_to_date);
    assert!(check.reasons.is_empty());
}

#[test]
fn newer_head_lists_intervening_revisions() {
    let depot = FakeDepot::with_changes(1..=12);
    let tracker = tracker(&depot);
    let check = tracker.is_up_to_date(10u64).expect("check");

    assert!(!check.up_to_date);
    assert_eq!(
        check.reasons[0],
        StaleReason::NewRevision {
            number: ChangeNumber(12)
        }
    );
    assert_eq!(check.reasons[0].to_string(), "New revision 12 detected");
    assert_eq!(numbers(check.intervening()), vec![12, 11]);
    assert_eq!(
        check.reasons[1].to_string(),
        "2 revision(s) since last build: 12, 11"
    );

    let since = tracker.revisions_since(10u64).expect("since");
    assert_eq!(check.intervening(), since.as_slice());
}

#[test]
fn unreachable_server_is_never_up_to_date() {
    let depot = FakeDepot {
        fail_on: Some(Operation::Changes),
        ..FakeDepot::with_changes(1..=3)
    };
    let err = tracker(&depot).is_up_to_date(1u64).unwrap_err();
    assert!(matches!(err, SyncError::RemoteExecution { .. }), "got: {err}");
}

#[test]
fn describe_failure_during_history_fetch_propagates() {
    let depot = FakeDepot {
        broken_describe: vec![11],
        ..FakeDepot::with_changes(1..=12)
    };
    let err = tracker(&depot).is_up_to_date(10u64).unwrap_err();
    assert!(matches!(err, SyncError::MalformedOutput(_)), "got: {err}");
}

#[test]
fn workspace_check_compares_against_have() {
    let depot = FakeDepot {
        have: Some(9),
        ..FakeDepot::with_changes(1..=11)
    };
    let check = tracker(&depot).is_workspace_up_to_date().expect("check");

    assert!(!check.up_to_date);
    assert_eq!(numbers(check.intervening()), vec![11, 10]);
    assert!(depot
        .calls_of(Operation::Changes)
        .contains(&"-m 25 //proj/...@9,#head".to_string()));
}

// ---------------------------------------------------------------------------
// History fetch
// ---------------------------------------------------------------------------

#[test]
fn revisions_since_drops_inclusive_boundary() {
    let depot = FakeDepot {
        inclusive_range: true,
        ..FakeDepot::with_changes(1..=12)
    };
    let since = tracker(&depot).revisions_since(10u64).expect("since");

    assert_eq!(numbers(&since), vec![12, 11]);
    assert_eq!(
        depot.calls_of(Operation::Describe),
        vec!["-s 12", "-s 11"],
        "boundary change is never described"
    );
}

#[test]
fn revisions_since_with_exclusive_range_keeps_everything() {
    let depot = FakeDepot::with_changes(1..=12);
    let since = tracker(&depot).revisions_since(10u64).expect("since");
    assert_eq!(numbers(&since), vec![12, 11]);
}

#[test]
fn revisions_since_keeps_server_order() {
    let depot = FakeDepot::with_changes([20, 14, 31, 17]);
    let since = tracker(&depot).revisions_since(15u64).expect("since");
    assert_eq!(numbers(&since), vec![31, 20, 17]);
}

#[test]
fn revisions_since_head_is_empty() {
    let depot = FakeDepot {
        inclusive_range: true,
        ..FakeDepot::with_changes(1..=12)
    };
    let since = tracker(&depot).revisions_since(12u64).expect("since");
    assert!(since.is_empty());
}

#[test]
fn history_is_capped_and_oldest_changes_are_dropped() {
    let depot = FakeDepot {
        inclusive_range: true,
        ..FakeDepot::with_changes(1..=40)
    };
    let since = tracker(&depot).revisions_since(0u64).expect("since");

    assert_eq!(MAX_CHANGELISTS_TO_FETCH, 25);
    assert_eq!(since.len(), MAX_CHANGELISTS_TO_FETCH);
    assert_eq!(since.first().map(|r| r.number.get()), Some(40));
    assert_eq!(since.last().map(|r| r.number.get()), Some(16));
    assert!(since.iter().all(|r| r.number.get() > 15), "1..=15 are lost");
    assert_eq!(
        depot.calls_of(Operation::Changes),
        vec!["-m 25 //proj/...@0,#head"]
    );
}

#[test]
fn cap_holds_when_server_ignores_max() {
    let depot = FakeDepot {
        ignore_max: true,
        ..FakeDepot::with_changes(1..=60)
    };
    let since = tracker(&depot).revisions_since(5u64).expect("since");

    assert_eq!(since.len(), MAX_CHANGELISTS_TO_FETCH);
    assert_eq!(
        depot.calls_of(Operation::Describe).len(),
        MAX_CHANGELISTS_TO_FETCH
    );
}

#[test]
fn boundary_inside_capped_window_shrinks_result() {
    let depot = FakeDepot {
        inclusive_range: true,
        ..FakeDepot::with_changes(1..=30)
    };
    let since = tracker(&depot).revisions_since(6u64).expect("since");

    // Window is 30..=6 (25 changes); 6 itself is removed.
    assert_eq!(since.len(), MAX_CHANGELISTS_TO_FETCH - 1);
    assert!(since.iter().all(|r| r.number != ChangeNumber(6)));
}
