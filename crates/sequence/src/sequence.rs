//! Sequence - the producing side of the push contract

use std::sync::Arc;

use crate::observer::Observer;
use crate::subscription::Subscription;

/// A push-based, ordered stream of items
///
/// Subscribing registers an observer and returns a cancellable handle.
/// A sequence may be infinite; it ends with at most one terminal
/// notification (completion or failure).
pub trait Sequence<T>: Send + Sync {
    /// Begin delivering notifications to `observer`
    ///
    /// The returned subscription stops future notifications and
    /// releases upstream resources when disposed. Disposal is
    /// idempotent.
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Subscription;
}

/// Shared handle to a sequence, the currency operators exchange
pub type SharedSequence<T> = Arc<dyn Sequence<T>>;
