//! Tests for subscription disposal

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

#[test]
fn test_dispose_runs_actions_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sub = Subscription::new();

    for tag in ["gate", "outer", "inner"] {
        let log = Arc::clone(&log);
        sub.add_action(move || log.lock().push(tag));
    }

    sub.dispose();
    assert_eq!(*log.lock(), vec!["gate", "outer", "inner"]);
}

#[test]
fn test_dispose_is_idempotent() {
    let count = Arc::new(AtomicUsize::new(0));
    let sub = Subscription::new();

    let c = Arc::clone(&count);
    sub.add_action(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });

    sub.dispose();
    sub.dispose();
    sub.dispose();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(sub.is_disposed());
}

#[test]
fn test_action_added_after_dispose_runs_immediately() {
    let count = Arc::new(AtomicUsize::new(0));
    let sub = Subscription::new();
    sub.dispose();

    let c = Arc::clone(&count);
    sub.add_action(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_child_subscription_disposed_with_parent() {
    let parent = Subscription::new();
    let child = Subscription::new();

    parent.add(child.clone());
    assert!(!child.is_disposed());

    parent.dispose();
    assert!(child.is_disposed());
}

#[test]
fn test_clones_share_disposal_state() {
    let sub = Subscription::new();
    let other = sub.clone();

    other.dispose();
    assert!(sub.is_disposed());
}

#[test]
fn test_drop_does_not_dispose() {
    let count = Arc::new(AtomicUsize::new(0));
    let sub = Subscription::new();

    let c = Arc::clone(&count);
    sub.add_action(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });

    let clone = sub.clone();
    drop(clone);
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(!sub.is_disposed());
}

#[test]
fn test_concurrent_dispose_runs_actions_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let sub = Subscription::new();

    let c = Arc::clone(&count);
    sub.add_action(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let sub = sub.clone();
            std::thread::spawn(move || sub.dispose())
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(count.load(Ordering::SeqCst), 1);
}
