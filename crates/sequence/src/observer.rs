//! Observer - the receiving side of the push contract
//!
//! One stable two-capability interface (item notification, terminal
//! notification) used uniformly by every operator. Producers promise
//! zero or more `on_item` calls followed by at most one of
//! `on_completed` / `on_failed`.

use crate::error::FlowError;

/// Receiver of push notifications from a sequence
///
/// Implementations must be thread-safe: producers may deliver from any
/// execution context. After a terminal notification a conforming
/// producer makes no further calls.
pub trait Observer<T>: Send + Sync {
    /// A new item arrived
    fn on_item(&self, item: T);

    /// The sequence finished normally; no further notifications follow
    fn on_completed(&self);

    /// The sequence failed; no further notifications follow
    fn on_failed(&self, error: FlowError);
}
