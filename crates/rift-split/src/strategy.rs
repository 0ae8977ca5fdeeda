//! Call-site splitting strategy
//!
//! Decides, on the second invocation through a call site, whether the call
//! site should get a private clone of its target.
//!
//! # Decision flow
//!
//! ```text
//! on_invocation_observed(site, count)
//!   count != 2                  → nothing
//!   can_split(site) == false    → reject
//!   try_begin_split(site) lost  → nothing (another thread owns the site)
//!   evaluate heuristic
//!     ├─ accept → count split, clone, publish Split
//!     └─ reject → release the claim
//! ```
//!
//! A failed clone releases the claim and takes the split back out of the
//! engine count, so the call site can still be force-split later.

use std::sync::Arc;

use rift_graph::metrics::{count_direct_calls, count_polymorphic};
use rift_graph::{CallGraph, CallSite, CallSiteId, CallTarget, GraphError, SplitState, TargetId};
use tracing::{debug, info, trace, warn};

use crate::decision::{AcceptReason, RejectReason, SplitDecision};
use crate::engine_data::EngineData;
use crate::error::{Result, SplitError};
use crate::options::SplittingOptions;
use crate::stats::SplittingStats;

/// Invocation count at which the heuristic runs
pub const SPLIT_TRIGGER_COUNT: u64 = 2;

/// Number of times the candidate may appear as a source along the split
/// ancestry before the split counts as recursive
pub const RECURSIVE_SPLIT_DEPTH: u32 = 2;

/// Services the strategy needs from the surrounding runtime
pub trait SplitRuntime {
    /// Look up a live target
    fn call_target(&self, id: TargetId) -> Option<Arc<CallTarget>>;

    /// Look up a call site
    fn call_site(&self, id: CallSiteId) -> Option<Arc<CallSite>>;

    /// Budget of the engine the call site belongs to
    fn engine_data(&self) -> &EngineData;

    /// Clone the target `site` dispatches to and rebind `site` to the clone.
    ///
    /// Called at most once per call site.
    fn split(&self, site: &CallSite) -> std::result::Result<TargetId, GraphError>;
}

/// Graph plus budget, for runtimes that have nothing else to add
impl SplitRuntime for (&CallGraph, &EngineData) {
    fn call_target(&self, id: TargetId) -> Option<Arc<CallTarget>> {
        self.0.call_target(id)
    }

    fn call_site(&self, id: CallSiteId) -> Option<Arc<CallSite>> {
        self.0.call_site(id)
    }

    fn engine_data(&self) -> &EngineData {
        self.1
    }

    fn split(&self, site: &CallSite) -> std::result::Result<TargetId, GraphError> {
        let target = self.0.split_call_site(site)?;
        self.1.on_target_loaded();
        Ok(target)
    }
}

/// Splitting heuristic, eligibility gate, and split transition
#[derive(Debug)]
pub struct SplittingStrategy {
    options: SplittingOptions,
    stats: SplittingStats,
}

impl SplittingStrategy {
    /// Create a strategy with fixed options
    pub fn new(options: SplittingOptions) -> Self {
        Self {
            options,
            stats: SplittingStats::new(),
        }
    }

    /// Options this strategy was created with
    pub fn options(&self) -> &SplittingOptions {
        &self.options
    }

    /// Decision and split counters
    pub fn stats(&self) -> &SplittingStats {
        &self.stats
    }

    /// Notify the strategy of an invocation about to dispatch through `site`.
    ///
    /// `call_count` is the value returned by [`CallSite::record_call`] for
    /// this invocation. Returns the new target if the call site was split.
    pub fn on_invocation_observed<R>(
        &self,
        rt: &R,
        site: &CallSite,
        call_count: u64,
    ) -> Result<Option<TargetId>>
    where
        R: SplitRuntime + ?Sized,
    {
        if call_count != SPLIT_TRIGGER_COUNT {
            return Ok(None);
        }
        if !self.can_split(site) {
            self.log_decision(site, SplitDecision::Reject(RejectReason::Ineligible));
            return Ok(None);
        }
        if !site.try_begin_split() {
            return Ok(None);
        }

        let decision = self.decide(rt, site);
        self.log_decision(site, decision);
        if !decision.is_accept() {
            site.abort_split();
            return Ok(None);
        }
        self.perform_split(rt, site).map(Some)
    }

    /// Split `site` without consulting the heuristic.
    ///
    /// The eligibility gate still applies; `Ok(None)` means the call site
    /// was not eligible or another thread is splitting it.
    pub fn force_split<R>(&self, rt: &R, site: &CallSite) -> Result<Option<TargetId>>
    where
        R: SplitRuntime + ?Sized,
    {
        if !self.can_split(site) || !site.try_begin_split() {
            return Ok(None);
        }
        self.stats.record_forced();
        self.perform_split(rt, site).map(Some)
    }

    /// Hard eligibility gate shared by the heuristic and forced paths
    pub fn can_split(&self, site: &CallSite) -> bool {
        site.split_state() == SplitState::Unsplit
            && self.options.enabled
            && site.is_cloning_allowed()
    }

    /// Whether the heuristic would split `site` now
    pub fn should_split<R>(&self, rt: &R, site: &CallSite) -> bool
    where
        R: SplitRuntime + ?Sized,
    {
        self.evaluate(rt, site).is_accept()
    }

    /// Run the eligibility gate and heuristic without side effects
    pub fn evaluate<R>(&self, rt: &R, site: &CallSite) -> SplitDecision
    where
        R: SplitRuntime + ?Sized,
    {
        if !self.can_split(site) {
            return SplitDecision::Reject(RejectReason::Ineligible);
        }
        self.decide(rt, site)
    }

    fn decide<R>(&self, rt: &R, site: &CallSite) -> SplitDecision
    where
        R: SplitRuntime + ?Sized,
    {
        use SplitDecision::{Accept, Reject};

        let Some(callee) = rt.call_target(site.target()) else {
            return Reject(RejectReason::Detached);
        };
        if callee.non_trivial_node_count() > self.options.max_callee_size {
            return Reject(RejectReason::CalleeTooLarge);
        }

        let Some(enclosing) = site.enclosing().and_then(|id| rt.call_target(id)) else {
            return Reject(RejectReason::Detached);
        };
        if enclosing.id() == callee.id() || enclosing.source() == Some(callee.id()) {
            return Reject(RejectReason::DirectRecursion);
        }

        if self.is_recursive_split(rt, site) {
            return Reject(RejectReason::RecursiveSplit);
        }

        if rt.engine_data().is_budget_exhausted() {
            return Reject(RejectReason::BudgetExhausted);
        }

        if count_direct_calls(callee.root()) <= 1 {
            return Accept(AcceptReason::SingleCall);
        }
        if count_polymorphic(callee.root()) >= 1 {
            return Accept(AcceptReason::Polymorphic);
        }
        Reject(RejectReason::Monomorphic)
    }

    /// Detect a split that would recurse through the split ancestry.
    ///
    /// Walks from the enclosing target of `site` back through the call sites
    /// whose splits produced each target, counting how often the candidate
    /// callee shows up as a source. Missing or reclaimed links end the walk.
    pub fn is_recursive_split<R>(&self, rt: &R, site: &CallSite) -> bool
    where
        R: SplitRuntime + ?Sized,
    {
        let candidate = site.target();
        let Some(mut cursor) = site.enclosing().and_then(|id| rt.call_target(id)) else {
            return false;
        };

        // Each hop moves to a target that existed before the current one was
        // cloned, so ids strictly decrease and the walk terminates.
        let mut depth = 0;
        while let Some(source) = cursor.source() {
            if source == candidate {
                depth += 1;
                if depth == RECURSIVE_SPLIT_DEPTH {
                    return true;
                }
            }

            let Some(split_site) = cursor.split_call_site().and_then(|id| rt.call_site(id)) else {
                break;
            };
            let Some(next) = split_site.enclosing().and_then(|id| rt.call_target(id)) else {
                break;
            };
            cursor = next;
        }
        false
    }

    /// Split transition. The caller holds the split claim on `site`.
    fn perform_split<R>(&self, rt: &R, site: &CallSite) -> Result<TargetId>
    where
        R: SplitRuntime + ?Sized,
    {
        let engine = rt.engine_data();
        let split_count = engine.increment_split_count();

        match rt.split(site) {
            Ok(target) => {
                site.finish_split();
                self.stats.record_split();
                debug!(
                    call_site = %site.id(),
                    source = %site.original_target(),
                    target = %target,
                    split_count,
                    split_limit = engine.split_limit(),
                    "split call site"
                );
                Ok(target)
            }
            Err(err) => {
                engine.revert_split_count();
                site.abort_split();
                self.stats.record_clone_failure();
                warn!(call_site = %site.id(), error = %err, "clone failed, call site left unsplit");
                Err(SplitError::Clone {
                    call_site: site.id(),
                    source: err,
                })
            }
        }
    }

    fn log_decision(&self, site: &CallSite, decision: SplitDecision) {
        self.stats.record_decision(decision);
        if self.options.trace_decisions {
            info!(call_site = %site.id(), target = %site.target(), %decision, "splitting decision");
        } else {
            trace!(call_site = %site.id(), target = %site.target(), %decision, "splitting decision");
        }
    }
}

impl Default for SplittingStrategy {
    fn default() -> Self {
        Self::new(SplittingOptions::default())
    }
}
