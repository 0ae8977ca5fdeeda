//! # Rift Split
//!
//! Decides when a call site should get a private clone of its target.
//!
//! - the eligibility gate and the second-call heuristic
//! - recursive-split detection over split ancestry
//! - the per-engine split budget
//! - split accounting and diagnostics

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

mod decision;
mod engine;
mod engine_data;
mod error;
mod options;
mod stats;
mod strategy;

pub use decision::{AcceptReason, RejectReason, SplitDecision};
pub use engine::Engine;
pub use engine_data::EngineData;
pub use error::{Result, SplitError};
pub use options::{
    DEFAULT_BASE_LIMIT, DEFAULT_LIMIT_GROWTH, DEFAULT_MAX_CALLEE_SIZE, SplittingOptions,
};
pub use stats::{SplittingStats, SplittingStatsSnapshot};
pub use strategy::{RECURSIVE_SPLIT_DEPTH, SPLIT_TRIGGER_COUNT, SplitRuntime, SplittingStrategy};
