//! MergeJoinGroup - keyed group join with live sub-sequences
//!
//! One result per outer item, paired with a live sub-sequence of the
//! inner items sharing its key - past (replayed in arrival order) and
//! future (pushed as they arrive). The outer item's presence in the
//! output never waits for a matching inner item.
//!
//! # Locking discipline
//!
//! Both add-paths (outer registers a sub-sequence, inner appends to the
//! history and fans out) run under the same per-bucket mutex. Leaving
//! them unserialized would let a new sub-sequence miss or double-see an
//! inner item that arrives during registration.
//!
//! # Sub-sequence lifetime
//!
//! A sub-sequence, once opened, stays open until the whole operator
//! completes or fails - there is no per-key early completion. On
//! completion of both sources every still-open sub-sequence is
//! completed (order across buckets unspecified) and only then the
//! top-level observer.

use std::hash::Hash;
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use rill_sequence::{
    FlowError, GatedObserver, Observer, SelectorError, Sequence, SharedSequence, Subject,
    Subscription,
};

use crate::selector::KeyFn;

/// Result selector pairing an outer item with its live sub-sequence
pub type GroupResultFn<O, I, R> =
    Arc<dyn Fn(&O, SharedSequence<I>) -> Result<R, SelectorError> + Send + Sync>;

/// Build a keyed group join over two sequences
///
/// Each outer item yields exactly one result, emitted immediately; the
/// sub-sequence handed to the result selector replays the inner history
/// already buffered for the key, then stays live for future arrivals.
pub fn group_join<O, I, K, R>(
    outer: SharedSequence<O>,
    inner: SharedSequence<I>,
    outer_key: KeyFn<O, K>,
    inner_key: KeyFn<I, K>,
    result: GroupResultFn<O, I, R>,
) -> SharedSequence<R>
where
    O: Clone + Send + Sync + 'static,
    I: Clone + Send + Sync + 'static,
    K: Eq + Hash + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    Arc::new(GroupJoin {
        outer,
        inner,
        outer_key,
        inner_key,
        result,
    })
}

struct GroupJoin<O, I, K, R> {
    outer: SharedSequence<O>,
    inner: SharedSequence<I>,
    outer_key: KeyFn<O, K>,
    inner_key: KeyFn<I, K>,
    result: GroupResultFn<O, I, R>,
}

/// Per-key state: buffered inner history plus open sub-sequences
struct GroupBucket<I> {
    inner: Vec<I>,
    groups: Vec<Subject<I>>,
}

impl<I> GroupBucket<I> {
    fn new() -> Self {
        Self {
            inner: Vec::new(),
            groups: Vec::new(),
        }
    }
}

type SharedGroupBucket<I> = Arc<Mutex<GroupBucket<I>>>;

struct GroupCore<I, K, R> {
    gate: GatedObserver<R>,
    buckets: DashMap<K, SharedGroupBucket<I>>,
    unkeyed: OnceLock<SharedGroupBucket<I>>,
    outer_done: AtomicBool,
    inner_done: AtomicBool,
    teardown: Subscription,
}

impl<I, K, R> GroupCore<I, K, R>
where
    I: Clone + Send + Sync + 'static,
    K: Eq + Hash,
{
    fn bucket(&self, key: Option<K>) -> SharedGroupBucket<I> {
        match key {
            None => Arc::clone(
                self.unkeyed
                    .get_or_init(|| Arc::new(Mutex::new(GroupBucket::new()))),
            ),
            Some(key) => {
                if let Some(bucket) = self.buckets.get(&key) {
                    return Arc::clone(&bucket);
                }
                Arc::clone(
                    &self
                        .buckets
                        .entry(key)
                        .or_insert_with(|| Arc::new(Mutex::new(GroupBucket::new()))),
                )
            }
        }
    }

    /// Visit every bucket, shared unkeyed bucket included
    fn for_each_bucket(&self, mut visit: impl FnMut(&SharedGroupBucket<I>)) {
        if let Some(bucket) = self.unkeyed.get() {
            visit(bucket);
        }
        for entry in self.buckets.iter() {
            visit(entry.value());
        }
    }

    fn fail(&self, error: FlowError) {
        if self.gate.fail(error.clone()) {
            debug!("group join failed, tearing down sub-sequences");
            self.for_each_bucket(|bucket| {
                let groups = std::mem::take(&mut bucket.lock().groups);
                for group in groups {
                    group.fail(error.clone());
                }
            });
            self.teardown.dispose();
        }
    }

    fn side_completed(&self, done: &AtomicBool) {
        done.store(true, Ordering::SeqCst);
        if !(self.outer_done.load(Ordering::SeqCst) && self.inner_done.load(Ordering::SeqCst)) {
            return;
        }

        // Close every still-open sub-sequence before the top observer;
        // order across buckets is unspecified
        let mut closed = 0usize;
        self.for_each_bucket(|bucket| {
            let groups = std::mem::take(&mut bucket.lock().groups);
            for group in &groups {
                group.complete();
            }
            closed += groups.len();
        });

        if self.gate.complete() {
            debug!(sub_sequences = closed, "group join completed");
            self.teardown.dispose();
        }
    }
}

struct OuterEnd<O, I, K, R> {
    core: Arc<GroupCore<I, K, R>>,
    key: KeyFn<O, K>,
    result: GroupResultFn<O, I, R>,
}

impl<O, I, K, R> Observer<O> for OuterEnd<O, I, K, R>
where
    O: Clone + Send + Sync + 'static,
    I: Clone + Send + Sync + 'static,
    K: Eq + Hash + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    fn on_item(&self, item: O) {
        if !self.core.gate.is_active() {
            return;
        }

        let key = match (self.key)(&item) {
            Ok(key) => key,
            Err(err) => {
                self.core.fail(err.into());
                return;
            }
        };

        let bucket = self.core.bucket(key);
        let mut guard = bucket.lock();

        // Register first, emit immediately, then replay the history;
        // the result never waits for a matching inner item
        let group = Subject::new();
        guard.groups.push(group.clone());

        let paired = match (self.result)(&item, group.handle()) {
            Ok(paired) => paired,
            Err(err) => {
                // Release the bucket before failing: teardown walks
                // every bucket to fail the open sub-sequences
                drop(guard);
                self.core.fail(err.into());
                return;
            }
        };
        self.core.gate.item(paired);

        trace!(replayed = guard.inner.len(), "sub-sequence opened");
        for existing in &guard.inner {
            group.push(existing.clone());
        }
    }

    fn on_completed(&self) {
        self.core.side_completed(&self.core.outer_done);
    }

    fn on_failed(&self, error: FlowError) {
        self.core.fail(error);
    }
}

struct InnerEnd<I, K, R> {
    core: Arc<GroupCore<I, K, R>>,
    key: KeyFn<I, K>,
}

impl<I, K, R> Observer<I> for InnerEnd<I, K, R>
where
    I: Clone + Send + Sync + 'static,
    K: Eq + Hash + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    fn on_item(&self, item: I) {
        if !self.core.gate.is_active() {
            return;
        }

        let key = match (self.key)(&item) {
            Ok(key) => key,
            Err(err) => {
                self.core.fail(err.into());
                return;
            }
        };

        let bucket = self.core.bucket(key);
        let mut guard = bucket.lock();

        // Buffer for future sub-sequences, then fan out to open ones
        guard.inner.push(item.clone());
        for group in &guard.groups {
            group.push(item.clone());
        }
    }

    fn on_completed(&self) {
        self.core.side_completed(&self.core.inner_done);
    }

    fn on_failed(&self, error: FlowError) {
        self.core.fail(error);
    }
}

impl<O, I, K, R> Sequence<R> for GroupJoin<O, I, K, R>
where
    O: Clone + Send + Sync + 'static,
    I: Clone + Send + Sync + 'static,
    K: Eq + Hash + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    fn subscribe(&self, observer: Arc<dyn Observer<R>>) -> Subscription {
        let teardown = Subscription::new();
        let core = Arc::new(GroupCore {
            gate: GatedObserver::new(observer),
            buckets: DashMap::new(),
            unkeyed: OnceLock::new(),
            outer_done: AtomicBool::new(false),
            inner_done: AtomicBool::new(false),
            teardown: teardown.clone(),
        });

        let weak = Arc::downgrade(&core);
        teardown.add_action(move || {
            if let Some(core) = weak.upgrade() {
                core.gate.dispose();
            }
        });

        debug!("group join subscribing to both sources");
        teardown.add(self.outer.subscribe(Arc::new(OuterEnd {
            core: Arc::clone(&core),
            key: Arc::clone(&self.outer_key),
            result: Arc::clone(&self.result),
        })));
        teardown.add(self.inner.subscribe(Arc::new(InnerEnd {
            core,
            key: Arc::clone(&self.inner_key),
        })));

        teardown
    }
}

#[cfg(test)]
#[path = "group_join_test.rs"]
mod tests;
