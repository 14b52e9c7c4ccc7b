//! Tests for the async-predicate filter

use std::time::Duration;

use super::*;
use rill_sequence::Subject;
use rill_sequence::test_utils::ProbeObserver;

/// Predicate sequence emitting one value synchronously on subscribe
struct Just(bool);

impl Sequence<bool> for Just {
    fn subscribe(&self, observer: Arc<dyn Observer<bool>>) -> Subscription {
        observer.on_item(self.0);
        observer.on_completed();
        Subscription::empty()
    }
}

/// Predicate sequence violating the contract: completes with no value
struct Empty;

impl Sequence<bool> for Empty {
    fn subscribe(&self, observer: Arc<dyn Observer<bool>>) -> Subscription {
        observer.on_completed();
        Subscription::empty()
    }
}

fn const_predicate(verdict: bool) -> PredicateFn<u32> {
    Arc::new(move |_item: &u32| Arc::new(Just(verdict)) as SharedSequence<bool>)
}

/// Predicate resolving `true` after a per-item delay, on its own task
fn delayed_predicate(delay_for: fn(&u32) -> u64) -> PredicateFn<u32> {
    Arc::new(move |item: &u32| {
        let subject: Subject<bool> = Subject::new();
        let handle = subject.handle();
        let millis = delay_for(item);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            subject.push(true);
            subject.complete();
        });
        handle
    })
}

fn filter_under_probe(predicate: PredicateFn<u32>) -> (
    Subject<u32>,
    Arc<ProbeObserver<u32>>,
    Subscription,
) {
    let source: Subject<u32> = Subject::new();
    let filtered = filter_async(source.handle(), predicate);

    let probe = ProbeObserver::new();
    let sub = filtered.subscribe(probe.clone());
    (source, probe, sub)
}

// ============================================================================
// Verdict tests
// ============================================================================

#[test]
fn test_true_predicate_forwards_items() {
    let (source, probe, _sub) = filter_under_probe(const_predicate(true));

    source.push(1);
    source.push(2);
    source.complete();

    assert_eq!(probe.items(), vec![1, 2]);
    assert!(probe.completed_cleanly());
}

#[test]
fn test_false_predicate_drops_items() {
    let (source, probe, _sub) = filter_under_probe(const_predicate(false));

    source.push(1);
    source.push(2);
    source.complete();

    assert!(probe.items().is_empty());
    assert!(probe.completed_cleanly());
}

#[test]
fn test_per_item_verdicts() {
    let even_only: PredicateFn<u32> =
        Arc::new(|item: &u32| Arc::new(Just(item % 2 == 0)) as SharedSequence<bool>);
    let (source, probe, _sub) = filter_under_probe(even_only);

    for n in 1..=6 {
        source.push(n);
    }
    source.complete();

    assert_eq!(probe.items(), vec![2, 4, 6]);
}

// ============================================================================
// Asynchronous settlement tests
// ============================================================================

#[tokio::test]
async fn test_delayed_predicates_emit_full_set() {
    // Delays 30/10/20: settlement order differs from input order
    let (source, probe, _sub) = filter_under_probe(delayed_predicate(|item| match item {
        1 => 30,
        2 => 10,
        _ => 20,
    }));

    source.push(1);
    source.push(2);
    source.push(3);
    source.complete();

    tokio::time::sleep(Duration::from_millis(100)).await;

    // Output order is unspecified; the set is not
    let mut items = probe.items();
    items.sort_unstable();
    assert_eq!(items, vec![1, 2, 3]);
    assert!(probe.completed_cleanly());
}

#[tokio::test]
async fn test_completion_waits_for_outstanding_evaluations() {
    let (source, probe, _sub) = filter_under_probe(delayed_predicate(|_| 50));

    source.push(1);
    source.complete();

    // Source is done but the evaluation is still pending
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!probe.log().is_terminated());

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(probe.items(), vec![1]);
    assert!(probe.completed_cleanly());
}

// ============================================================================
// Failure tests
// ============================================================================

#[test]
fn test_zero_value_predicate_fails_operator() {
    let empty: PredicateFn<u32> = Arc::new(|_item: &u32| Arc::new(Empty) as SharedSequence<bool>);
    let (source, probe, _sub) = filter_under_probe(empty);

    source.push(1);
    source.push(2);

    assert_eq!(probe.failure(), Some(FlowError::PredicateProtocol));
    // First violation terminates; nothing further is emitted
    assert_eq!(probe.notification_count(), 1);
    assert_eq!(source.observer_count(), 0);
}

#[test]
fn test_predicate_failure_fails_operator() {
    let failing: PredicateFn<u32> = Arc::new(|_item: &u32| {
        let subject: Subject<bool> = Subject::new();
        subject.fail(FlowError::upstream("predicate source lost"));
        subject.handle()
    });
    let (source, probe, _sub) = filter_under_probe(failing);

    source.push(1);

    assert_eq!(
        probe.failure(),
        Some(FlowError::upstream("predicate source lost"))
    );
    assert_eq!(source.observer_count(), 0);
}

#[test]
fn test_source_failure_forwarded() {
    let (source, probe, _sub) = filter_under_probe(const_predicate(true));

    source.push(1);
    source.fail(FlowError::upstream("source died"));

    assert_eq!(probe.items(), vec![1]);
    assert_eq!(probe.failure(), Some(FlowError::upstream("source died")));
}

// ============================================================================
// Disposal tests
// ============================================================================

#[test]
fn test_dispose_cancels_source_and_pending_predicates() {
    let pending: Subject<bool> = Subject::new();
    let pending_handle = pending.handle();
    let hanging: PredicateFn<u32> = Arc::new(move |_item: &u32| Arc::clone(&pending_handle));

    let (source, probe, sub) = filter_under_probe(hanging);

    source.push(1);
    assert_eq!(pending.observer_count(), 1);

    sub.dispose();

    assert_eq!(source.observer_count(), 0);
    assert_eq!(pending.observer_count(), 0);

    // A predicate settling after disposal must not reach the observer
    pending.push(true);
    pending.complete();
    assert_eq!(probe.notification_count(), 0);
}
