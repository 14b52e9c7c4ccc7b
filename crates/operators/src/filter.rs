//! AsyncPredicateFilter - filter by an asynchronous boolean test
//!
//! Each source item spawns a subscription to its own predicate
//! sequence, contractually single-value-then-complete. The source keeps
//! being consumed while evaluations are pending - fan-out is unbounded,
//! there is no backpressure.
//!
//! # Ordering
//!
//! Output order is explicitly NOT guaranteed to match input order: two
//! items reorder whenever their predicates settle out of sequence. This
//! is inherent to the operator, not a defect to fix.
//!
//! # Completion
//!
//! Source completion alone does not complete the operator: downstream
//! completion is forwarded only once the source has completed AND the
//! outstanding-evaluation counter has reached zero.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use rill_sequence::{FlowError, GatedObserver, Observer, Sequence, SharedSequence, Subscription};

/// Predicate factory: maps an item to its boolean test sequence
///
/// The returned sequence must emit exactly one boolean and complete; a
/// sequence completing with zero values is a protocol violation that
/// fails the whole operator.
pub type PredicateFn<T> = Arc<dyn Fn(&T) -> SharedSequence<bool> + Send + Sync>;

/// Filter a sequence with a per-item asynchronous boolean test
pub fn filter_async<T>(source: SharedSequence<T>, predicate: PredicateFn<T>) -> SharedSequence<T>
where
    T: Clone + Send + Sync + 'static,
{
    Arc::new(AsyncPredicateFilter { source, predicate })
}

struct AsyncPredicateFilter<T> {
    source: SharedSequence<T>,
    predicate: PredicateFn<T>,
}

struct FilterCore<T> {
    gate: GatedObserver<T>,
    /// Evaluations started but not yet settled; gates completion
    outstanding: AtomicUsize,
    source_done: AtomicBool,
    /// Live predicate subscriptions, keyed for targeted removal
    pending: Mutex<HashMap<u64, Subscription>>,
    next_id: AtomicU64,
    teardown: Subscription,
}

impl<T> FilterCore<T> {
    fn fail(&self, error: FlowError) {
        if self.gate.fail(error) {
            debug!("async filter failed, cancelling pending evaluations");
            self.teardown.dispose();
        }
    }

    fn try_complete(&self) {
        if self.source_done.load(Ordering::SeqCst) && self.outstanding.load(Ordering::SeqCst) == 0
        {
            if self.gate.complete() {
                debug!("async filter completed");
                self.teardown.dispose();
            }
        }
    }

    /// Account for one settled evaluation (success or failure)
    fn settle(&self, id: u64) {
        if let Some(sub) = self.pending.lock().remove(&id) {
            sub.dispose();
        }
        let remaining = self.outstanding.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 {
            self.try_complete();
        }
    }
}

/// One in-flight predicate evaluation
struct PendingEvaluation<T> {
    core: Arc<FilterCore<T>>,
    id: u64,
    /// The source item, surrendered on a `true` verdict
    item: Mutex<Option<T>>,
    /// Latched boolean; stays `None` on a protocol violation
    latched: Mutex<Option<bool>>,
    settled: AtomicBool,
}

impl<T> PendingEvaluation<T> {
    fn is_settled(&self) -> bool {
        self.settled.load(Ordering::SeqCst)
    }
}

impl<T: Clone + Send + Sync + 'static> Observer<bool> for PendingEvaluation<T> {
    fn on_item(&self, verdict: bool) {
        // Latch the most recent value; a conforming predicate sends one
        *self.latched.lock() = Some(verdict);
    }

    fn on_completed(&self) {
        if self.settled.swap(true, Ordering::SeqCst) {
            return;
        }

        match self.latched.lock().take() {
            Some(true) => {
                if let Some(item) = self.item.lock().take() {
                    self.core.gate.item(item);
                }
            }
            Some(false) => {
                trace!(evaluation = self.id, "item dropped by predicate");
            }
            None => {
                warn!(evaluation = self.id, "predicate completed without a value");
                self.core.fail(FlowError::PredicateProtocol);
            }
        }

        self.core.settle(self.id);
    }

    fn on_failed(&self, error: FlowError) {
        if self.settled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.core.fail(error);
        self.core.settle(self.id);
    }
}

struct SourceEnd<T> {
    core: Arc<FilterCore<T>>,
    predicate: PredicateFn<T>,
}

impl<T: Clone + Send + Sync + 'static> Observer<T> for SourceEnd<T> {
    fn on_item(&self, item: T) {
        if !self.core.gate.is_active() {
            return;
        }

        self.core.outstanding.fetch_add(1, Ordering::SeqCst);
        let id = self.core.next_id.fetch_add(1, Ordering::Relaxed);
        let sequence = (self.predicate)(&item);

        let evaluation = Arc::new(PendingEvaluation {
            core: Arc::clone(&self.core),
            id,
            item: Mutex::new(Some(item)),
            latched: Mutex::new(None),
            settled: AtomicBool::new(false),
        });

        let sub = sequence.subscribe(Arc::clone(&evaluation) as Arc<dyn Observer<bool>>);

        // The predicate may have settled synchronously during subscribe;
        // only register the subscription while the evaluation is live
        if evaluation.is_settled() {
            sub.dispose();
        } else {
            self.core.pending.lock().insert(id, sub);
            // Close the insert-vs-settle window
            if evaluation.is_settled() {
                if let Some(sub) = self.core.pending.lock().remove(&id) {
                    sub.dispose();
                }
            }
        }
    }

    fn on_completed(&self) {
        self.core.source_done.store(true, Ordering::SeqCst);
        self.core.try_complete();
    }

    fn on_failed(&self, error: FlowError) {
        self.core.fail(error);
    }
}

impl<T> Sequence<T> for AsyncPredicateFilter<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        let teardown = Subscription::new();
        let core = Arc::new(FilterCore {
            gate: GatedObserver::new(observer),
            outstanding: AtomicUsize::new(0),
            source_done: AtomicBool::new(false),
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            teardown: teardown.clone(),
        });

        // Gate first, then pending evaluations, then the source
        let weak = Arc::downgrade(&core);
        teardown.add_action(move || {
            if let Some(core) = weak.upgrade() {
                core.gate.dispose();
                let pending = std::mem::take(&mut *core.pending.lock());
                for sub in pending.into_values() {
                    sub.dispose();
                }
            }
        });

        debug!("async filter subscribing to source");
        teardown.add(self.source.subscribe(Arc::new(SourceEnd {
            core,
            predicate: Arc::clone(&self.predicate),
        })));

        teardown
    }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
