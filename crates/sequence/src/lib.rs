//! Rill - Sequence
//!
//! The shared push-based contract every operator consumes and produces:
//! - `Observer` / `Sequence` - the two-capability notification interface
//! - `Subscription` - idempotent, composable cancellation handle
//! - `Subject` - multicast push endpoint (no buffering, no replay)
//! - `GatedObserver` - guarded terminal-state delivery gate
//! - `FlowError` - the failure taxonomy carried by terminal notifications
//!
//! # Design Principles
//!
//! - **Pure push**: producers call into observers; nothing here blocks
//!   a thread waiting for data
//! - **At most one terminal**: a sequence ends in at most one of
//!   completion or failure; the gate enforces this for operators
//! - **Idempotent disposal**: disposing a subscription twice is a no-op,
//!   and no observer call crosses a completed `dispose()`
//!
//! # Architecture
//!
//! ```text
//! Producer ──→ Subject::push() ──→ [subscriber registry] ──→ Observer
//!                                        │
//! Operator ──→ GatedObserver ────────────┼──→ downstream Observer
//!                  │                     │
//!             Subscription ←── dispose ──┘
//! ```

mod error;
mod gate;
mod observer;
mod sequence;
mod subject;
mod subscription;

pub mod test_utils;

pub use error::{FlowError, FlowResult, SelectorError};
pub use gate::GatedObserver;
pub use observer::Observer;
pub use sequence::{SharedSequence, Sequence};
pub use subject::Subject;
pub use subscription::Subscription;
