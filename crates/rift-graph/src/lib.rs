//! # Rift Graph
//!
//! Live call-graph model consumed by the Rift splitting engine.
//!
//! ## Design
//!
//! - **Arena-backed**: targets and call sites live in a [`CallGraph`] and are
//!   referred to by [`TargetId`] / [`CallSiteId`], so links never form `Arc` cycles
//! - **Set-once ancestry**: a target's source and originating call site are fixed
//!   at construction, so concurrent readers only ever see "present" or "absent"
//! - **Capability-based cost**: nodes expose their execution cost through
//!   [`GraphNode`], which is all [`metrics`] ever looks at

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod call_site;
pub mod error;
pub mod graph;
pub mod ids;
pub mod metrics;
pub mod node;
pub mod target;

pub use call_site::{CallSite, SplitState};
pub use error::{GraphError, Result};
pub use graph::CallGraph;
pub use ids::{CallSiteId, TargetId};
pub use node::{CostCell, GraphNode, Node, NodeCost, NodeKind};
pub use target::CallTarget;
