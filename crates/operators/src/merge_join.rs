//! MergeJoin - flat keyed equi-join across two live sequences
//!
//! An incremental nested-loop equi-join: each arriving item is appended
//! to its key's bucket and paired, inside that bucket's critical
//! section, against the full recorded history of the opposite side.
//! Emission order follows the arrival order of the triggering item, not
//! a canonical join ordering.
//!
//! # Guarantees
//!
//! - A late arrival matches every previously seen counterpart: buckets
//!   retain full history and are never evicted (deliberate scaling
//!   constraint, not an oversight)
//! - Concurrent arrivals on the same key are serialized by the bucket
//!   mutex - no torn pairing loop, no duplicate or lost emission;
//!   different keys proceed without contention
//! - Completion is forwarded once both sources have completed; the
//!   first failure anywhere (source or selector) wins and tears the
//!   operator down

use std::hash::Hash;
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use rill_sequence::{
    FlowError, GatedObserver, Observer, SelectorError, Sequence, SharedSequence, Subscription,
};

use crate::selector::KeyFn;

/// Result selector for the flat join; a failure fails the operator
pub type JoinResultFn<O, I, R> = Arc<dyn Fn(&O, &I) -> Result<R, SelectorError> + Send + Sync>;

/// Build a flat keyed equi-join over two sequences
///
/// Subscribing to the returned sequence subscribes to both sources.
/// For every (outer, inner) pair sharing a key, one result is emitted.
/// Items whose key selector returns `None` join only against other
/// `None`-keyed items, via a single lazily-created shared bucket.
pub fn merge_join<O, I, K, R>(
    outer: SharedSequence<O>,
    inner: SharedSequence<I>,
    outer_key: KeyFn<O, K>,
    inner_key: KeyFn<I, K>,
    result: JoinResultFn<O, I, R>,
) -> SharedSequence<R>
where
    O: Clone + Send + Sync + 'static,
    I: Clone + Send + Sync + 'static,
    K: Eq + Hash + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    Arc::new(MergeJoin {
        outer,
        inner,
        outer_key,
        inner_key,
        result,
    })
}

struct MergeJoin<O, I, K, R> {
    outer: SharedSequence<O>,
    inner: SharedSequence<I>,
    outer_key: KeyFn<O, K>,
    inner_key: KeyFn<I, K>,
    result: JoinResultFn<O, I, R>,
}

/// Per-key accumulated history for both sides
struct JoinBucket<O, I> {
    outer: Vec<O>,
    inner: Vec<I>,
}

impl<O, I> JoinBucket<O, I> {
    fn new() -> Self {
        Self {
            outer: Vec::new(),
            inner: Vec::new(),
        }
    }
}

type SharedBucket<O, I> = Arc<Mutex<JoinBucket<O, I>>>;

/// State shared by both upstream observers for one subscription
struct JoinCore<O, I, K, R> {
    gate: GatedObserver<R>,
    /// Keyed buckets; atomic get-or-create, one bucket per key, ever
    buckets: DashMap<K, SharedBucket<O, I>>,
    /// Shared bucket for absent keys, computed at most once
    unkeyed: OnceLock<SharedBucket<O, I>>,
    outer_done: AtomicBool,
    inner_done: AtomicBool,
    /// Disposes the gate and both upstream subscriptions
    teardown: Subscription,
}

impl<O, I, K, R> JoinCore<O, I, K, R>
where
    K: Eq + Hash,
{
    fn bucket(&self, key: Option<K>) -> SharedBucket<O, I> {
        match key {
            None => Arc::clone(
                self.unkeyed
                    .get_or_init(|| Arc::new(Mutex::new(JoinBucket::new()))),
            ),
            Some(key) => {
                // Fast path: bucket already exists
                if let Some(bucket) = self.buckets.get(&key) {
                    return Arc::clone(&bucket);
                }
                // Entry API handles the create race: one winner per key
                Arc::clone(
                    &self
                        .buckets
                        .entry(key)
                        .or_insert_with(|| Arc::new(Mutex::new(JoinBucket::new()))),
                )
            }
        }
    }

    fn fail(&self, error: FlowError) {
        if self.gate.fail(error) {
            debug!("merge join failed, disposing upstreams");
            self.teardown.dispose();
        }
    }

    fn side_completed(&self, done: &AtomicBool) {
        done.store(true, Ordering::SeqCst);
        if self.outer_done.load(Ordering::SeqCst) && self.inner_done.load(Ordering::SeqCst) {
            // The gate makes the racing second source's call a no-op
            if self.gate.complete() {
                debug!(keys = self.buckets.len(), "merge join completed");
                self.teardown.dispose();
            }
        }
    }
}

struct OuterEnd<O, I, K, R> {
    core: Arc<JoinCore<O, I, K, R>>,
    key: KeyFn<O, K>,
    result: JoinResultFn<O, I, R>,
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
        guard.outer.push(item.clone());

        trace!(matches = guard.inner.len(), "outer item arrived");
        for existing in &guard.inner {
            match (self.result)(&item, existing) {
                Ok(paired) => {
                    self.core.gate.item(paired);
                }
                Err(err) => {
                    self.core.fail(err.into());
                    return;
                }
            }
        }
    }

    fn on_completed(&self) {
        self.core.side_completed(&self.core.outer_done);
    }

    fn on_failed(&self, error: FlowError) {
        self.core.fail(error);
    }
}

struct InnerEnd<O, I, K, R> {
    core: Arc<JoinCore<O, I, K, R>>,
    key: KeyFn<I, K>,
    result: JoinResultFn<O, I, R>,
}

impl<O, I, K, R> Observer<I> for InnerEnd<O, I, K, R>
where
    O: Clone + Send + Sync + 'static,
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
        guard.inner.push(item.clone());

        trace!(matches = guard.outer.len(), "inner item arrived");
        for existing in &guard.outer {
            match (self.result)(existing, &item) {
                Ok(paired) => {
                    self.core.gate.item(paired);
                }
                Err(err) => {
                    self.core.fail(err.into());
                    return;
                }
            }
        }
    }

    fn on_completed(&self) {
        self.core.side_completed(&self.core.inner_done);
    }

    fn on_failed(&self, error: FlowError) {
        self.core.fail(error);
    }
}

impl<O, I, K, R> Sequence<R> for MergeJoin<O, I, K, R>
where
    O: Clone + Send + Sync + 'static,
    I: Clone + Send + Sync + 'static,
    K: Eq + Hash + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    fn subscribe(&self, observer: Arc<dyn Observer<R>>) -> Subscription {
        let teardown = Subscription::new();
        let core = Arc::new(JoinCore {
            gate: GatedObserver::new(observer),
            buckets: DashMap::new(),
            unkeyed: OnceLock::new(),
            outer_done: AtomicBool::new(false),
            inner_done: AtomicBool::new(false),
            teardown: teardown.clone(),
        });

        // Silence the gate before cancelling upstreams, so no in-flight
        // notification crosses a completed dispose()
        let weak = Arc::downgrade(&core);
        teardown.add_action(move || {
            if let Some(core) = weak.upgrade() {
                core.gate.dispose();
            }
        });

        debug!("merge join subscribing to both sources");
        teardown.add(self.outer.subscribe(Arc::new(OuterEnd {
            core: Arc::clone(&core),
            key: Arc::clone(&self.outer_key),
            result: Arc::clone(&self.result),
        })));
        teardown.add(self.inner.subscribe(Arc::new(InnerEnd {
            core,
            key: Arc::clone(&self.inner_key),
            result: Arc::clone(&self.result),
        })));

        teardown
    }
}

#[cfg(test)]
#[path = "merge_join_test.rs"]
mod tests;
