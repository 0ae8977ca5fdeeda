//! Splitting statistics
//!
//! Atomic counters updated by the strategy, for diagnostics.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::decision::{AcceptReason, RejectReason, SplitDecision};
use crate::engine_data::EngineData;

/// Decision and split counters of one strategy
#[derive(Debug, Default)]
pub struct SplittingStats {
    evaluations: AtomicU64,
    accepted_single_call: AtomicU64,
    accepted_polymorphic: AtomicU64,
    rejected: [AtomicU64; RejectReason::COUNT],
    forced_splits: AtomicU64,
    splits: AtomicU64,
    clone_failures: AtomicU64,
}

/// Snapshot of splitting stats (for reporting)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplittingStatsSnapshot {
    /// Heuristic evaluations triggered by the second invocation
    pub evaluations: u64,
    /// Evaluations accepted through the single-call shortcut
    pub accepted_single_call: u64,
    /// Evaluations accepted because of polymorphic nodes
    pub accepted_polymorphic: u64,
    /// Rejected: already split, disabled, or cloning not permitted
    pub rejected_ineligible: u64,
    /// Rejected: callee too large
    pub rejected_callee_too_large: u64,
    /// Rejected: not attached to a live target
    pub rejected_detached: u64,
    /// Rejected: direct recursion
    pub rejected_direct_recursion: u64,
    /// Rejected: recursive split ancestry
    pub rejected_recursive_split: u64,
    /// Rejected: engine split budget exhausted
    pub rejected_budget_exhausted: u64,
    /// Rejected: no polymorphism in a multi-call callee
    pub rejected_monomorphic: u64,
    /// Splits requested through the forced path
    pub forced_splits: u64,
    /// Clone operations that completed
    pub splits: u64,
    /// Clone operations that failed
    pub clone_failures: u64,
    /// Engine split count at snapshot time
    pub split_count: u64,
    /// Engine split limit at snapshot time
    pub split_limit: u64,
}

impl SplittingStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one heuristic evaluation
    pub fn record_decision(&self, decision: SplitDecision) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        let counter = match decision {
            SplitDecision::Accept(AcceptReason::SingleCall) => &self.accepted_single_call,
            SplitDecision::Accept(AcceptReason::Polymorphic) => &self.accepted_polymorphic,
            SplitDecision::Reject(reason) => &self.rejected[reason.index()],
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a forced split request that passed the eligibility gate
    #[inline]
    pub fn record_forced(&self) {
        self.forced_splits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed clone
    #[inline]
    pub fn record_split(&self) {
        self.splits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed clone
    #[inline]
    pub fn record_clone_failure(&self) {
        self.clone_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Evaluations seen so far
    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Rejections recorded for `reason`
    pub fn rejections(&self, reason: RejectReason) -> u64 {
        self.rejected[reason.index()].load(Ordering::Relaxed)
    }

    /// Take a snapshot of current stats, with the budget of `engine`
    pub fn snapshot(&self, engine: &EngineData) -> SplittingStatsSnapshot {
        let rejected = |reason: RejectReason| self.rejections(reason);
        SplittingStatsSnapshot {
            evaluations: self.evaluations(),
            accepted_single_call: self.accepted_single_call.load(Ordering::Relaxed),
            accepted_polymorphic: self.accepted_polymorphic.load(Ordering::Relaxed),
            rejected_ineligible: rejected(RejectReason::Ineligible),
            rejected_callee_too_large: rejected(RejectReason::CalleeTooLarge),
            rejected_detached: rejected(RejectReason::Detached),
            rejected_direct_recursion: rejected(RejectReason::DirectRecursion),
            rejected_recursive_split: rejected(RejectReason::RecursiveSplit),
            rejected_budget_exhausted: rejected(RejectReason::BudgetExhausted),
            rejected_monomorphic: rejected(RejectReason::Monomorphic),
            forced_splits: self.forced_splits.load(Ordering::Relaxed),
            splits: self.splits.load(Ordering::Relaxed),
            clone_failures: self.clone_failures.load(Ordering::Relaxed),
            split_count: engine.split_count(),
            split_limit: engine.split_limit(),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.evaluations.store(0, Ordering::Relaxed);
        self.accepted_single_call.store(0, Ordering::Relaxed);
        self.accepted_polymorphic.store(0, Ordering::Relaxed);
        for counter in &self.rejected {
            counter.store(0, Ordering::Relaxed);
        }
        self.forced_splits.store(0, Ordering::Relaxed);
        self.splits.store(0, Ordering::Relaxed);
        self.clone_failures.store(0, Ordering::Relaxed);
    }
}
