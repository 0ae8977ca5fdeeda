//! Execution engine
//!
//! Owns the call graph, the split budget, and the strategy of one engine.
//! Engines share nothing, so several can coexist in a process.

use std::sync::Arc;

use rift_graph::{CallGraph, CallSite, CallSiteId, CallTarget, GraphError, Node, TargetId};
use tracing::debug;

use crate::decision::SplitDecision;
use crate::engine_data::EngineData;
use crate::error::Result;
use crate::options::SplittingOptions;
use crate::stats::SplittingStatsSnapshot;
use crate::strategy::{SplitRuntime, SplittingStrategy};

/// One execution engine and its splitting state
#[derive(Debug)]
pub struct Engine {
    graph: CallGraph,
    data: EngineData,
    strategy: SplittingStrategy,
}

impl Engine {
    /// Create an engine with an empty call graph
    pub fn new(options: SplittingOptions) -> Self {
        Self::with_graph(options, CallGraph::new())
    }

    /// Create an engine configured from the process environment
    pub fn from_env() -> Self {
        Self::new(SplittingOptions::from_env())
    }

    /// Create an engine around `graph`. Targets it already holds count as
    /// loaded.
    pub fn with_graph(options: SplittingOptions, graph: CallGraph) -> Self {
        let data = EngineData::new(&options);
        for _ in 0..graph.loaded_target_count() {
            data.on_target_loaded();
        }
        debug!(?options, "engine created");
        Self {
            graph,
            data,
            strategy: SplittingStrategy::new(options),
        }
    }

    /// Call graph of this engine
    pub fn graph(&self) -> &CallGraph {
        &self.graph
    }

    /// Split budget of this engine
    pub fn engine_data(&self) -> &EngineData {
        &self.data
    }

    /// Splitting strategy of this engine
    pub fn strategy(&self) -> &SplittingStrategy {
        &self.strategy
    }

    /// Load a target whose graph is `root`
    pub fn load_target(&self, name: impl Into<String>, root: Node) -> Result<TargetId> {
        self.load_target_with(name, |_| Ok(root))
    }

    /// Load a target whose graph is built once its id is known
    pub fn load_target_with(
        &self,
        name: impl Into<String>,
        build: impl FnOnce(TargetId) -> rift_graph::Result<Node>,
    ) -> Result<TargetId> {
        let id = self.graph.add_target_with(name, build)?;
        self.data.on_target_loaded();
        Ok(id)
    }

    /// Reclaim a target. Returns `false` if it was not loaded.
    pub fn unload_target(&self, id: TargetId) -> bool {
        let unloaded = self.graph.unload_target(id).is_some();
        if unloaded {
            self.data.on_target_unloaded();
        }
        unloaded
    }

    /// Create a detached call site to `callee`
    pub fn add_call_site(&self, callee: TargetId, cloning_allowed: bool) -> Result<CallSiteId> {
        Ok(self.graph.add_call_site(callee, cloning_allowed)?)
    }

    /// Count an invocation through `site` and return the target to run.
    ///
    /// The second invocation may split the call site, in which case the
    /// returned target is its new private clone.
    pub fn dispatch(&self, site: CallSiteId) -> Result<TargetId> {
        self.dispatch_site(&*self.resolve(site)?)
    }

    /// [`dispatch`](Self::dispatch) for a call site the caller already holds.
    ///
    /// Takes no lock unless this invocation splits the call site.
    #[inline]
    pub fn dispatch_site(&self, site: &CallSite) -> Result<TargetId> {
        let call_count = site.record_call();
        self.strategy
            .on_invocation_observed(self, site, call_count)?;
        Ok(site.target())
    }

    /// Split `site` without consulting the heuristic
    pub fn force_split(&self, site: CallSiteId) -> Result<Option<TargetId>> {
        let site = self.resolve(site)?;
        self.strategy.force_split(self, &site)
    }

    /// Whether the eligibility gate admits `site`
    pub fn can_split(&self, site: CallSiteId) -> Result<bool> {
        Ok(self.strategy.can_split(&*self.resolve(site)?))
    }

    /// Whether the heuristic would split `site` now
    pub fn should_split(&self, site: CallSiteId) -> Result<bool> {
        Ok(self.evaluate(site)?.is_accept())
    }

    /// Heuristic decision for `site`, with its reason
    pub fn evaluate(&self, site: CallSiteId) -> Result<SplitDecision> {
        Ok(self.strategy.evaluate(self, &*self.resolve(site)?))
    }

    /// Snapshot of decision counters and the split budget
    pub fn stats_snapshot(&self) -> SplittingStatsSnapshot {
        self.strategy.stats().snapshot(&self.data)
    }

    fn resolve(&self, site: CallSiteId) -> Result<Arc<CallSite>> {
        Ok(self
            .graph
            .call_site(site)
            .ok_or(GraphError::UnknownCallSite(site))?)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(SplittingOptions::default())
    }
}

impl SplitRuntime for Engine {
    fn call_target(&self, id: TargetId) -> Option<Arc<CallTarget>> {
        self.graph.call_target(id)
    }

    fn call_site(&self, id: CallSiteId) -> Option<Arc<CallSite>> {
        self.graph.call_site(id)
    }

    fn engine_data(&self) -> &EngineData {
        &self.data
    }

    fn split(&self, site: &CallSite) -> std::result::Result<TargetId, GraphError> {
        let target = self.graph.split_call_site(site)?;
        self.data.on_target_loaded();
        Ok(target)
    }
}
