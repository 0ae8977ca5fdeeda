//! Call-graph errors

use thiserror::Error;

use crate::ids::{CallSiteId, TargetId};

/// Errors raised by call-graph mutation and the clone operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Target id does not name a slot in the graph, or the slot was reclaimed
    #[error("Unknown call target: {0}")]
    UnknownTarget(TargetId),

    /// Call site id does not name a call site in the graph
    #[error("Unknown call site: {0}")]
    UnknownCallSite(CallSiteId),

    /// A call site can belong to exactly one target graph
    #[error("Call site {0} is already attached to a target")]
    CallSiteAlreadyAttached(CallSiteId),

    /// The graph refuses to hold more targets
    #[error("Call graph capacity of {0} targets exceeded")]
    CapacityExceeded(usize),
}

/// Result type for call-graph operations
pub type Result<T> = std::result::Result<T, GraphError>;
