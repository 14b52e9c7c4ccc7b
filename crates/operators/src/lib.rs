//! Rill - Operators
//!
//! Concurrency-safe operators over two independently-arriving push
//! sequences, without sorting or external buffering:
//!
//! - `merge_join` - flat keyed equi-join producing one result per
//!   (outer, inner) pair sharing a key
//! - `group_join` - one result per outer item, paired with a live
//!   sub-sequence of matching inner items (past and future)
//! - `filter_async` - per-item asynchronous boolean test, where the
//!   test itself is a sequence
//!
//! # Architecture
//!
//! ```text
//! outer ──┐                      ┌──→ result selector ──→ downstream
//!         ├──→ [key → bucket] ───┤
//! inner ──┘    DashMap + Mutex   └──→ sub-sequence Subjects (group join)
//! ```
//!
//! # Key Design
//!
//! - **Per-key critical sections**: each join bucket sits behind its own
//!   mutex; unrelated keys never contend
//! - **Atomic get-or-create**: the bucket map is a `DashMap`; exactly one
//!   bucket ever exists per key, with a lazily-memoized shared bucket for
//!   absent (`None`) keys
//! - **Unbounded retention**: buckets keep full item history for the
//!   operator's lifetime so a late arrival matches every earlier
//!   counterpart regardless of arrival order. This is a deliberate
//!   scaling constraint; there is no eviction or windowing
//! - **Exactly-once terminal**: all downstream delivery goes through a
//!   `GatedObserver`; the first terminal wins and teardown disposes
//!   every owned upstream subscription

mod filter;
mod group_join;
mod merge_join;
mod selector;

pub use filter::{PredicateFn, filter_async};
pub use group_join::{GroupResultFn, group_join};
pub use merge_join::{JoinResultFn, merge_join};
pub use selector::KeyFn;
