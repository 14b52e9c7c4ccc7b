//! StreamTap - secondary-before-primary relay on a live sequence

use std::sync::Arc;

use tracing::debug;

use rill_sequence::{
    FlowError, GatedObserver, Observer, Sequence, SharedSequence, Subject, Subscription,
};

/// Wraps a sequence so a secondary observer can watch its traffic
///
/// `attach` yields two views of the source:
/// - the **proxy**: subscribing to it subscribes to the underlying
///   source; its subscriber is the primary
/// - the **tracked** sequence: an independent multicast view receiving
///   every notification strictly before the primary, with no replay
///
/// Disposing a primary subscription cancels its source subscription but
/// never retracts items already relayed to the tracked side.
pub struct StreamTap<T> {
    tracked: Subject<T>,
    source: SharedSequence<T>,
}

impl<T: Clone + Send + Sync + 'static> StreamTap<T> {
    /// Attach a tap to a sequence
    pub fn attach(source: SharedSequence<T>) -> Self {
        Self {
            tracked: Subject::new(),
            source,
        }
    }

    /// The secondary view; supports independent subscription
    pub fn tracked(&self) -> SharedSequence<T> {
        self.tracked.handle()
    }

    /// The pass-through view carrying the source's notifications
    pub fn proxy(&self) -> SharedSequence<T> {
        Arc::new(TapProxy {
            tracked: self.tracked.clone(),
            source: Arc::clone(&self.source),
        })
    }
}

struct TapProxy<T> {
    tracked: Subject<T>,
    source: SharedSequence<T>,
}

impl<T: Clone + Send + Sync + 'static> Sequence<T> for TapProxy<T> {
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        let gate = Arc::new(GatedObserver::new(observer));

        let relay = Arc::new(RelayEnd {
            tracked: self.tracked.clone(),
            gate: Arc::clone(&gate),
        });

        debug!("tap proxy subscribing to source");
        let sub = Subscription::new();
        sub.add_action(move || gate.dispose());
        sub.add(self.source.subscribe(relay));
        sub
    }
}

/// Relays each notification to the tracked subject, then the primary
struct RelayEnd<T> {
    tracked: Subject<T>,
    gate: Arc<GatedObserver<T>>,
}

impl<T: Clone + Send + Sync + 'static> Observer<T> for RelayEnd<T> {
    fn on_item(&self, item: T) {
        if !self.tracked.push(item.clone()) {
            // The tracked side was terminated out from under the relay
            self.gate.fail(FlowError::proxy("tracked sequence already terminated"));
            return;
        }
        self.gate.item(item);
    }

    fn on_completed(&self) {
        self.tracked.complete();
        self.gate.complete();
    }

    fn on_failed(&self, error: FlowError) {
        self.tracked.fail(error.clone());
        self.gate.fail(error);
    }
}

#[cfg(test)]
#[path = "stream_tap_test.rs"]
mod tests;
