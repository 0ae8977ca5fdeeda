//! Splitting errors

use rift_graph::{CallSiteId, GraphError};
use thiserror::Error;

/// Errors that can occur while splitting
///
/// A negative split decision is never an error; see
/// [`SplitDecision`](crate::SplitDecision).
#[derive(Debug, Error)]
pub enum SplitError {
    /// Call-graph lookup or registration failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The clone operation failed; the call site was left unsplit
    #[error("Cloning the target of call site {call_site} failed: {source}")]
    Clone {
        /// Call site that was being split
        call_site: CallSiteId,
        /// Failure reported by the clone operation
        #[source]
        source: GraphError,
    },

    /// Malformed configuration document
    #[error("Invalid splitting configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration value out of range
    #[error("Invalid splitting option `{option}`: {reason}")]
    InvalidOption {
        /// Option name
        option: &'static str,
        /// Why the value was rejected
        reason: &'static str,
    },
}

/// Result type for splitting operations
pub type Result<T> = std::result::Result<T, SplitError>;
