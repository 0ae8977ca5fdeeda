//! Per-engine split budget
//!
//! The budget is a lifetime budget: the split count only ever grows over
//! successful splits, while the limit grows with the number of targets loaded
//! into the engine.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::options::SplittingOptions;

/// Split counters shared by every call site of one engine
#[derive(Debug)]
pub struct EngineData {
    split_count: AtomicU64,
    loaded_targets: AtomicU64,
    base_limit: u64,
    limit_growth: f64,
    max_splits: Option<u64>,
}

impl EngineData {
    /// Create an empty budget from `options`
    pub fn new(options: &SplittingOptions) -> Self {
        Self {
            split_count: AtomicU64::new(0),
            loaded_targets: AtomicU64::new(0),
            base_limit: options.base_limit,
            limit_growth: if options.limit_growth.is_finite() {
                options.limit_growth.max(0.0)
            } else {
                0.0
            },
            max_splits: options.max_splits,
        }
    }

    /// Successful splits so far
    #[inline]
    pub fn split_count(&self) -> u64 {
        self.split_count.load(Ordering::Acquire)
    }

    /// Targets currently loaded in the engine
    #[inline]
    pub fn loaded_targets(&self) -> u64 {
        self.loaded_targets.load(Ordering::Relaxed)
    }

    /// `base_limit + floor(limit_growth * loaded_targets)`, capped by `max_splits`
    pub fn split_limit(&self) -> u64 {
        let grown = (self.limit_growth * self.loaded_targets() as f64).floor() as u64;
        let limit = self.base_limit.saturating_add(grown);
        match self.max_splits {
            Some(ceiling) => limit.min(ceiling),
            None => limit,
        }
    }

    /// Check if the engine has used up its split budget
    #[inline]
    pub fn is_budget_exhausted(&self) -> bool {
        self.split_count() > self.split_limit()
    }

    /// Account for a target entering the engine
    pub fn on_target_loaded(&self) {
        self.loaded_targets.fetch_add(1, Ordering::Relaxed);
    }

    /// Account for a target leaving the engine
    pub fn on_target_unloaded(&self) {
        let _ = self
            .loaded_targets
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Count a split that is about to start. Returns the new count.
    pub(crate) fn increment_split_count(&self) -> u64 {
        self.split_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Take back a split whose clone operation failed
    pub(crate) fn revert_split_count(&self) {
        let _ = self
            .split_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Zero both counters.
    ///
    /// Engines never do this on their own; it exists so tests can reuse one
    /// engine across scenarios.
    pub fn reset(&self) {
        self.split_count.store(0, Ordering::Release);
        self.loaded_targets.store(0, Ordering::Relaxed);
    }
}
