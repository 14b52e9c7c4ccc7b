//! Tests for the multicast subject

use super::*;
use crate::test_utils::ProbeObserver;

fn probe() -> Arc<ProbeObserver<u32>> {
    ProbeObserver::new()
}

// ============================================================================
// Delivery tests
// ============================================================================

#[test]
fn test_push_reaches_all_subscribers() {
    let subject = Subject::new();
    let first = probe();
    let second = probe();

    subject.subscribe(first.clone());
    subject.subscribe(second.clone());

    assert!(subject.push(1));
    assert!(subject.push(2));

    assert_eq!(first.items(), vec![1, 2]);
    assert_eq!(second.items(), vec![1, 2]);
}

#[test]
fn test_no_replay_for_late_subscriber() {
    let subject = Subject::new();
    subject.push(1);

    let late = probe();
    subject.subscribe(late.clone());
    subject.push(2);

    assert_eq!(late.items(), vec![2]);
}

#[test]
fn test_push_without_subscribers_is_accepted() {
    let subject: Subject<u32> = Subject::new();
    assert!(subject.push(1));
    assert!(!subject.is_terminated());
}

// ============================================================================
// Terminal tests
// ============================================================================

#[test]
fn test_complete_notifies_and_latches() {
    let subject: Subject<u32> = Subject::new();
    let observer = probe();
    subject.subscribe(observer.clone());

    assert!(subject.complete());
    assert!(!subject.complete());
    assert!(!subject.push(9));

    assert!(observer.completed_cleanly());
    assert!(subject.is_terminated());
}

#[test]
fn test_fail_notifies_every_subscriber() {
    let subject: Subject<u32> = Subject::new();
    let first = probe();
    let second = probe();
    subject.subscribe(first.clone());
    subject.subscribe(second.clone());

    assert!(subject.fail(FlowError::upstream("producer died")));

    assert_eq!(first.failure(), Some(FlowError::upstream("producer died")));
    assert_eq!(second.failure(), Some(FlowError::upstream("producer died")));
}

#[test]
fn test_fail_after_complete_keeps_first_terminal() {
    let subject: Subject<u32> = Subject::new();
    subject.complete();
    assert!(!subject.fail(FlowError::PredicateProtocol));

    // A late subscriber sees the original terminal
    let late = probe();
    subject.subscribe(late.clone());
    assert!(late.completed_cleanly());
}

#[test]
fn test_late_subscriber_after_failure_gets_failure() {
    let subject: Subject<u32> = Subject::new();
    subject.fail(FlowError::PredicateProtocol);

    let late = probe();
    subject.subscribe(late.clone());
    assert_eq!(late.failure(), Some(FlowError::PredicateProtocol));
    assert_eq!(late.items(), Vec::<u32>::new());
}

// ============================================================================
// Unsubscription tests
// ============================================================================

#[test]
fn test_disposed_subscriber_stops_receiving() {
    let subject = Subject::new();
    let observer = probe();
    let sub = subject.subscribe(observer.clone());

    subject.push(1);
    sub.dispose();
    subject.push(2);

    assert_eq!(observer.items(), vec![1]);
    assert_eq!(subject.observer_count(), 0);
}

#[test]
fn test_dispose_only_removes_own_registration() {
    let subject = Subject::new();
    let kept = probe();
    let dropped = probe();

    let _keep = subject.subscribe(kept.clone());
    let sub = subject.subscribe(dropped.clone());
    sub.dispose();

    subject.push(5);
    assert_eq!(kept.items(), vec![5]);
    assert!(dropped.items().is_empty());
}

#[test]
fn test_clone_shares_subscribers() {
    let subject = Subject::new();
    let observer = probe();
    subject.subscribe(observer.clone());

    subject.clone().push(3);
    assert_eq!(observer.items(), vec![3]);
}
