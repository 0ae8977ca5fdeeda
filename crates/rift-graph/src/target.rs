//! Call targets (execution units)

use crate::ids::{CallSiteId, TargetId};
use crate::metrics;
use crate::node::Node;

/// An executable graph that call sites dispatch to
///
/// Every field is fixed at construction. In particular a split target's
/// [`source`](Self::source) and [`split_call_site`](Self::split_call_site)
/// never change, so ancestry walks need no synchronization.
#[derive(Debug)]
pub struct CallTarget {
    id: TargetId,
    name: String,
    root: Node,
    non_trivial_node_count: usize,
    source: Option<TargetId>,
    split_call_site: Option<CallSiteId>,
}

impl CallTarget {
    pub(crate) fn new(
        id: TargetId,
        name: String,
        root: Node,
        source: Option<TargetId>,
        split_call_site: Option<CallSiteId>,
    ) -> Self {
        debug_assert_ne!(source, Some(id), "a split target cannot be its own source");
        let non_trivial_node_count = metrics::count_non_trivial(&root);
        Self {
            id,
            name,
            root,
            non_trivial_node_count,
            source,
            split_call_site,
        }
    }

    /// Arena id
    #[inline]
    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root of the node graph
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Non-trivial node count, computed once when the target was created
    #[inline]
    pub fn non_trivial_node_count(&self) -> usize {
        self.non_trivial_node_count
    }

    /// Target this one was cloned from
    #[inline]
    pub fn source(&self) -> Option<TargetId> {
        self.source
    }

    /// Call site whose split produced this target
    #[inline]
    pub fn split_call_site(&self) -> Option<CallSiteId> {
        self.split_call_site
    }

    /// Check if this target was produced by splitting
    #[inline]
    pub fn is_split(&self) -> bool {
        self.source.is_some()
    }
}
