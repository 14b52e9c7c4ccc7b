//! Error types carried through sequences as failure terminals

use thiserror::Error;

/// Errors that can flow through a sequence as its failure terminal
///
/// Terminal failures fan out to every observer of a sequence (a group
/// join delivers the same failure to each open sub-sequence), so the
/// type is `Clone` with owned message payloads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlowError {
    /// A caller-supplied key or result selector failed
    #[error("selector failed: {message}")]
    Selector { message: String },

    /// An upstream source failed for a producer-side reason
    #[error("upstream failure: {message}")]
    Upstream { message: String },

    /// A predicate sequence completed without producing a value
    #[error("predicate sequence completed without a value")]
    PredicateProtocol,

    /// Relaying a notification through a tap proxy failed
    #[error("proxy relay failed: {message}")]
    Proxy { message: String },
}

impl FlowError {
    /// Build an upstream failure from any displayable producer error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Build a proxy relay failure
    pub fn proxy(message: impl Into<String>) -> Self {
        Self::Proxy {
            message: message.into(),
        }
    }
}

/// Failure raised by a caller-supplied selector closure
///
/// Key selectors, result selectors and group result selectors return
/// this; operators map it to [`FlowError::Selector`] and fail.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct SelectorError {
    /// Human-readable failure description
    pub message: String,
}

impl SelectorError {
    /// Create a selector error with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<SelectorError> for FlowError {
    fn from(err: SelectorError) -> Self {
        FlowError::Selector {
            message: err.message,
        }
    }
}

/// Result type for sequence operations
pub type FlowResult<T> = std::result::Result<T, FlowError>;
