//! Rill - Tap
//!
//! A non-intrusive tap on a live sequence: a secondary observer (a
//! visualizer, a debugger, a metrics probe) sees every notification
//! flowing to the primary subscriber without altering delivery.
//!
//! # Architecture
//!
//! ```text
//! source ──→ proxy subscription ──→ tracked Subject ──→ secondary sinks
//!                    │                    (first)
//!                    └──→ primary subscriber (second, same notification)
//! ```
//!
//! The secondary sink observes strictly before the primary subscriber,
//! on the same notification. The tracked sequence performs no buffering
//! or replay: a subscriber joining late does not see earlier traffic.

mod stream_tap;

pub use stream_tap::StreamTap;
