//! Call-graph arena and the clone operation
//!
//! Targets and call sites are stored append-only and addressed by id. A target
//! slot is reserved before its graph is built, which lets a graph contain call
//! sites to its own target. Reclaimed targets leave an empty slot behind so
//! ids stay stable and stale links resolve to `None`. A slot whose
//! registration fails never held a target and is handed out again.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::call_site::CallSite;
use crate::error::{GraphError, Result};
use crate::ids::{CallSiteId, TargetId};
use crate::node::Node;
use crate::target::CallTarget;

/// Default cap on target slots (ids are `u32`)
pub const DEFAULT_MAX_TARGETS: usize = u32::MAX as usize;

#[derive(Debug, Default)]
struct TargetSlots {
    slots: Vec<Option<Arc<CallTarget>>>,
    /// Reserved slots released by a failed registration
    free: Vec<TargetId>,
}

/// All call targets and call sites of one engine
#[derive(Debug)]
pub struct CallGraph {
    targets: RwLock<TargetSlots>,
    call_sites: RwLock<Vec<Arc<CallSite>>>,
    max_targets: usize,
}

impl CallGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::with_max_targets(DEFAULT_MAX_TARGETS)
    }

    /// Create an empty graph that refuses to hold more than `max_targets`
    /// target slots (reclaimed slots included)
    pub fn with_max_targets(max_targets: usize) -> Self {
        Self {
            targets: RwLock::new(TargetSlots::default()),
            call_sites: RwLock::new(Vec::new()),
            max_targets: max_targets.min(DEFAULT_MAX_TARGETS),
        }
    }

    /// Create a detached call site dispatching to `callee`.
    ///
    /// `callee` may be a slot that is still being built, see
    /// [`add_target_with`](Self::add_target_with).
    pub fn add_call_site(&self, callee: TargetId, cloning_allowed: bool) -> Result<CallSiteId> {
        if callee.index() as usize >= self.targets.read().slots.len() {
            return Err(GraphError::UnknownTarget(callee));
        }
        Ok(self.push_call_site(callee, cloning_allowed))
    }

    /// Register a target whose graph is `root`
    pub fn add_target(&self, name: impl Into<String>, root: Node) -> Result<TargetId> {
        self.add_target_with(name, |_| Ok(root))
    }

    /// Register a target whose graph is built once its id is known.
    ///
    /// Every call site referenced by the graph is attached to the new target.
    /// If `build` or the attachment fails, the reserved id is released and no
    /// call site is attached. Call sites created by `build` for the released
    /// id must not be used afterwards.
    pub fn add_target_with(
        &self,
        name: impl Into<String>,
        build: impl FnOnce(TargetId) -> Result<Node>,
    ) -> Result<TargetId> {
        let id = self.reserve_target()?;
        let installed = build(id)
            .and_then(|root| self.install(CallTarget::new(id, name.into(), root, None, None)));
        match installed {
            Ok(()) => Ok(id),
            Err(err) => {
                self.release_target(id);
                Err(err)
            }
        }
    }

    /// Look up a live target
    pub fn call_target(&self, id: TargetId) -> Option<Arc<CallTarget>> {
        self.targets
            .read()
            .slots
            .get(id.index() as usize)
            .and_then(|slot| slot.clone())
    }

    /// Look up a call site
    pub fn call_site(&self, id: CallSiteId) -> Option<Arc<CallSite>> {
        self.call_sites.read().get(id.index() as usize).cloned()
    }

    /// Target whose graph contains `site`
    pub fn enclosing_target(&self, site: &CallSite) -> Option<Arc<CallTarget>> {
        site.enclosing().and_then(|id| self.call_target(id))
    }

    /// Number of live targets
    pub fn loaded_target_count(&self) -> usize {
        self.targets
            .read()
            .slots
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    /// Number of call sites ever created
    pub fn call_site_count(&self) -> usize {
        self.call_sites.read().len()
    }

    /// Reclaim a target. Links to it resolve to `None` afterwards.
    pub fn unload_target(&self, id: TargetId) -> Option<Arc<CallTarget>> {
        self.targets
            .write()
            .slots
            .get_mut(id.index() as usize)
            .and_then(Option::take)
    }

    /// Clone the target `site` dispatches to and rebind `site` to the clone.
    ///
    /// The clone gets fresh call sites for its own direct calls, each bound to
    /// the original target of the call site it copies, and starts without
    /// feedback. On error `site` keeps dispatching to its current target.
    pub fn split_call_site(&self, site: &CallSite) -> Result<TargetId> {
        let callee_id = site.target();
        let callee = self
            .call_target(callee_id)
            .ok_or(GraphError::UnknownTarget(callee_id))?;

        let id = self.reserve_target()?;
        let installed = callee
            .root()
            .try_clone_uninitialized(&mut |nested| -> Result<CallSiteId> {
                let original = self
                    .call_site(nested)
                    .ok_or(GraphError::UnknownCallSite(nested))?;
                Ok(self.push_call_site(original.original_target(), original.is_cloning_allowed()))
            })
            .and_then(|root| {
                let name = format!("{} <split>", callee.name());
                self.install(CallTarget::new(
                    id,
                    name,
                    root,
                    Some(callee_id),
                    Some(site.id()),
                ))
            });
        if let Err(err) = installed {
            self.release_target(id);
            return Err(err);
        }
        site.rebind(id);
        Ok(id)
    }

    fn reserve_target(&self) -> Result<TargetId> {
        let mut targets = self.targets.write();
        if let Some(id) = targets.free.pop() {
            return Ok(id);
        }
        if targets.slots.len() >= self.max_targets {
            return Err(GraphError::CapacityExceeded(self.max_targets));
        }
        let id = TargetId(targets.slots.len() as u32);
        targets.slots.push(None);
        Ok(id)
    }

    /// Hand a reserved, never installed slot back
    fn release_target(&self, id: TargetId) {
        let mut targets = self.targets.write();
        let index = id.index() as usize;
        debug_assert!(targets.slots[index].is_none());
        if index + 1 == targets.slots.len() {
            targets.slots.pop();
        } else {
            targets.free.push(id);
        }
    }

    fn push_call_site(&self, callee: TargetId, cloning_allowed: bool) -> CallSiteId {
        let mut sites = self.call_sites.write();
        let id = CallSiteId(sites.len() as u32);
        sites.push(Arc::new(CallSite::new(id, callee, cloning_allowed)));
        id
    }

    /// Attach every call site of `target` and publish it.
    ///
    /// Sites are checked and attached under the call-site write lock. On error
    /// none of them is attached.
    fn install(&self, target: CallTarget) -> Result<()> {
        let mut ids = target.root().call_sites();
        {
            let sites = self.call_sites.write();
            let resolved = ids
                .iter()
                .map(|id| {
                    sites
                        .get(id.index() as usize)
                        .cloned()
                        .ok_or(GraphError::UnknownCallSite(*id))
                })
                .collect::<Result<Vec<_>>>()?;

            if let Some(taken) = resolved.iter().find(|site| site.enclosing().is_some()) {
                return Err(GraphError::CallSiteAlreadyAttached(taken.id()));
            }
            ids.sort_unstable();
            if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
                return Err(GraphError::CallSiteAlreadyAttached(pair[0]));
            }
            for site in &resolved {
                let attached = site.attach(target.id());
                debug_assert!(attached);
            }
        }

        let index = target.id().index() as usize;
        self.targets.write().slots[index] = Some(Arc::new(target));
        Ok(())
    }
}

impl Default for CallGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{GraphNode, NodeCost};

    #[test]
    fn attaches_call_sites_to_their_target() {
        let graph = CallGraph::new();
        let leaf = graph
            .add_target("leaf", Node::operation("ret", NodeCost::Monomorphic))
            .unwrap();
        let site = graph.add_call_site(leaf, true).unwrap();
        assert_eq!(graph.call_site(site).unwrap().enclosing(), None);

        let main = graph
            .add_target("main", Node::block([Node::direct_call(site)]))
            .unwrap();

        let site = graph.call_site(site).unwrap();
        assert_eq!(site.enclosing(), Some(main));
        assert_eq!(site.target(), leaf);
        assert_eq!(graph.enclosing_target(&site).map(|t| t.id()), Some(main));
    }

    #[test]
    fn rejects_call_site_to_unknown_target() {
        let graph = CallGraph::new();
        assert_eq!(
            graph.add_call_site(TargetId(7), true),
            Err(GraphError::UnknownTarget(TargetId(7)))
        );
    }

    #[test]
    fn self_recursive_target_can_be_built() {
        let graph = CallGraph::new();
        let mut recursive_site = None;
        let fact = graph
            .add_target_with("fact", |id| {
                let site = graph.add_call_site(id, true)?;
                recursive_site = Some(site);
                Ok(Node::block([Node::direct_call(site)]))
            })
            .unwrap();

        let site = graph.call_site(recursive_site.unwrap()).unwrap();
        assert_eq!(site.target(), fact);
        assert_eq!(site.enclosing(), Some(fact));
    }

    #[test]
    fn call_site_cannot_join_two_graphs() {
        let graph = CallGraph::new();
        let leaf = graph.add_target("leaf", Node::block([])).unwrap();
        let site = graph.add_call_site(leaf, true).unwrap();
        graph
            .add_target("a", Node::block([Node::direct_call(site)]))
            .unwrap();

        assert_eq!(
            graph.add_target("b", Node::block([Node::direct_call(site)])),
            Err(GraphError::CallSiteAlreadyAttached(site))
        );
    }

    #[test]
    fn split_clones_callee_and_rebinds() {
        let graph = CallGraph::new();
        let inner = graph.add_target("inner", Node::block([])).unwrap();
        let nested = graph.add_call_site(inner, false).unwrap();
        let callee = graph
            .add_target(
                "callee",
                Node::block([
                    Node::operation("get.x", NodeCost::Megamorphic),
                    Node::direct_call(nested),
                ]),
            )
            .unwrap();
        let site = graph.add_call_site(callee, true).unwrap();
        graph
            .add_target("main", Node::block([Node::direct_call(site)]))
            .unwrap();

        let site = graph.call_site(site).unwrap();
        let clone_id = graph.split_call_site(&site).unwrap();
        assert_eq!(site.target(), clone_id);
        assert_eq!(site.original_target(), callee);

        let clone = graph.call_target(clone_id).unwrap();
        assert_eq!(clone.source(), Some(callee));
        assert_eq!(clone.split_call_site(), Some(site.id()));
        assert_eq!(clone.name(), "callee <split>");
        assert_eq!(
            clone.non_trivial_node_count(),
            graph.call_target(callee).unwrap().non_trivial_node_count()
        );
        assert_eq!(
            clone.root().find_operation("get.x").map(|n| n.cost()),
            Some(NodeCost::Uninitialized)
        );

        let cloned_sites = clone.root().call_sites();
        assert_eq!(cloned_sites.len(), 1);
        assert_ne!(cloned_sites[0], nested);
        let cloned_nested = graph.call_site(cloned_sites[0]).unwrap();
        assert_eq!(cloned_nested.target(), inner);
        assert_eq!(cloned_nested.enclosing(), Some(clone_id));
        assert!(!cloned_nested.is_cloning_allowed());
        assert_eq!(cloned_nested.call_count(), 0);
    }

    #[test]
    fn split_fails_cleanly_at_capacity() {
        let graph = CallGraph::with_max_targets(2);
        let callee = graph.add_target("callee", Node::block([])).unwrap();
        let site = graph.add_call_site(callee, true).unwrap();
        graph
            .add_target("main", Node::block([Node::direct_call(site)]))
            .unwrap();

        let site = graph.call_site(site).unwrap();
        assert_eq!(
            graph.split_call_site(&site),
            Err(GraphError::CapacityExceeded(2))
        );
        assert_eq!(site.target(), callee);
        assert_eq!(graph.loaded_target_count(), 2);
    }

    #[test]
    fn unloaded_targets_resolve_to_none() {
        let graph = CallGraph::new();
        let a = graph.add_target("a", Node::block([])).unwrap();
        let b = graph.add_target("b", Node::block([])).unwrap();
        assert_eq!(graph.loaded_target_count(), 2);

        assert!(graph.unload_target(a).is_some());
        assert!(graph.call_target(a).is_none());
        assert!(graph.unload_target(a).is_none());
        assert!(graph.call_target(b).is_some());
        assert_eq!(graph.loaded_target_count(), 1);
    }

    #[test]
    fn rejected_registration_frees_its_slot() {
        let graph = CallGraph::with_max_targets(3);
        let leaf = graph.add_target("leaf", Node::block([])).unwrap();
        let site = graph.add_call_site(leaf, true).unwrap();
        graph
            .add_target("a", Node::block([Node::direct_call(site)]))
            .unwrap();

        assert_eq!(
            graph.add_target("b", Node::block([Node::direct_call(site)])),
            Err(GraphError::CallSiteAlreadyAttached(site))
        );
        assert_eq!(graph.loaded_target_count(), 2);
        assert_eq!(graph.add_target("c", Node::block([])), Ok(TargetId(2)));
    }

    #[test]
    fn failed_build_frees_its_slot() {
        let graph = CallGraph::with_max_targets(1);
        assert_eq!(
            graph.add_target_with("x", |_| Err(GraphError::UnknownTarget(TargetId(9)))),
            Err(GraphError::UnknownTarget(TargetId(9)))
        );
        assert_eq!(graph.add_target("y", Node::block([])), Ok(TargetId(0)));
    }

    #[test]
    fn released_inner_slot_is_reused() {
        let graph = CallGraph::new();
        let mut inner = None;
        let result = graph.add_target_with("outer", |_| {
            inner = Some(graph.add_target("inner", Node::block([]))?);
            Err(GraphError::CapacityExceeded(0))
        });
        assert!(result.is_err());
        assert_eq!(inner, Some(TargetId(1)));
        assert!(graph.call_target(TargetId(0)).is_none());

        assert_eq!(graph.add_target("next", Node::block([])), Ok(TargetId(0)));
        assert_eq!(graph.add_target("last", Node::block([])), Ok(TargetId(2)));
        assert_eq!(graph.loaded_target_count(), 3);
    }

    #[test]
    fn rejected_registration_attaches_nothing() {
        let graph = CallGraph::new();
        let leaf = graph.add_target("leaf", Node::block([])).unwrap();
        let first = graph.add_call_site(leaf, true).unwrap();
        let shared = graph.add_call_site(leaf, true).unwrap();
        graph
            .add_target("a", Node::block([Node::direct_call(shared)]))
            .unwrap();

        assert_eq!(
            graph.add_target(
                "b",
                Node::block([Node::direct_call(first), Node::direct_call(shared)])
            ),
            Err(GraphError::CallSiteAlreadyAttached(shared))
        );
        assert_eq!(graph.call_site(first).unwrap().enclosing(), None);

        let c = graph
            .add_target("c", Node::block([Node::direct_call(first)]))
            .unwrap();
        assert_eq!(graph.call_site(first).unwrap().enclosing(), Some(c));
    }

    #[test]
    fn repeated_call_site_in_one_graph_is_rejected() {
        let graph = CallGraph::new();
        let leaf = graph.add_target("leaf", Node::block([])).unwrap();
        let site = graph.add_call_site(leaf, true).unwrap();

        assert_eq!(
            graph.add_target(
                "twice",
                Node::block([Node::direct_call(site), Node::direct_call(site)])
            ),
            Err(GraphError::CallSiteAlreadyAttached(site))
        );
        assert_eq!(graph.call_site(site).unwrap().enclosing(), None);
    }
}
