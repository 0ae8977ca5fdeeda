//! Graph nodes and their execution cost classification

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

use crate::ids::CallSiteId;

/// Execution cost of a node, as classified by the interpreter
///
/// The interpreter rewrites this as a node's inline cache warms up and
/// degrades. `None` marks structural nodes that never execute on their own.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeCost {
    /// Trivial node, excluded from size estimates
    None = 0,
    /// Not executed yet
    #[default]
    Uninitialized = 1,
    /// One shape observed
    Monomorphic = 2,
    /// A handful of shapes observed
    Polymorphic = 3,
    /// Too many shapes observed, generic slow path
    Megamorphic = 4,
}

impl NodeCost {
    /// Check if this node is excluded from the non-trivial node count
    #[inline]
    pub fn is_trivial(self) -> bool {
        self == NodeCost::None
    }

    /// Check if the node has seen more than one shape
    #[inline]
    pub fn is_polymorphic(self) -> bool {
        matches!(self, NodeCost::Polymorphic | NodeCost::Megamorphic)
    }
}

impl From<u8> for NodeCost {
    fn from(v: u8) -> Self {
        match v {
            0 => NodeCost::None,
            1 => NodeCost::Uninitialized,
            2 => NodeCost::Monomorphic,
            3 => NodeCost::Polymorphic,
            4 => NodeCost::Megamorphic,
            _ => NodeCost::Uninitialized,
        }
    }
}

/// Cost slot that executing threads may rewrite while others read it
#[derive(Debug)]
pub struct CostCell(AtomicU8);

impl CostCell {
    /// Create a cell holding `cost`
    pub fn new(cost: NodeCost) -> Self {
        Self(AtomicU8::new(cost as u8))
    }

    /// Current classification
    #[inline]
    pub fn get(&self) -> NodeCost {
        NodeCost::from(self.0.load(Ordering::Relaxed))
    }

    /// Replace the classification
    #[inline]
    pub fn set(&self, cost: NodeCost) {
        self.0.store(cost as u8, Ordering::Relaxed);
    }
}

impl Clone for CostCell {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

/// Read-only view of a node that graph metrics can traverse
pub trait GraphNode {
    /// Execution cost classification of this node
    fn cost(&self) -> NodeCost;

    /// Call site this node dispatches through, for direct call nodes
    fn call_site(&self) -> Option<CallSiteId> {
        None
    }

    /// Visit each direct child of this node
    fn for_each_child(&self, f: &mut dyn FnMut(&dyn GraphNode));
}

/// What a node does
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Structural grouping, trivial
    Block,
    /// Any operation that carries an inline cache
    Operation {
        /// Operation name (for debugging)
        name: String,
        /// Current cost classification
        cost: CostCell,
    },
    /// Direct call through a call site
    DirectCall(CallSiteId),
}

/// A node in a call target's graph
///
/// A target's root node exclusively owns its descendants. Calls to other
/// targets are edges through a [`CallSiteId`], never through child links.
#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    children: Vec<Node>,
}

impl Node {
    /// Structural node grouping `children`
    pub fn block(children: impl IntoIterator<Item = Node>) -> Self {
        Self {
            kind: NodeKind::Block,
            children: children.into_iter().collect(),
        }
    }

    /// Operation node with an initial cost
    pub fn operation(name: impl Into<String>, cost: NodeCost) -> Self {
        Self {
            kind: NodeKind::Operation {
                name: name.into(),
                cost: CostCell::new(cost),
            },
            children: Vec::new(),
        }
    }

    /// Direct call through `site`
    pub fn direct_call(site: CallSiteId) -> Self {
        Self {
            kind: NodeKind::DirectCall(site),
            children: Vec::new(),
        }
    }

    /// Replace the children of this node
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children = children.into_iter().collect();
        self
    }

    /// Node kind
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Direct children
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Reclassify an operation node.
    ///
    /// Returns `false` for nodes whose cost is fixed by their kind.
    pub fn set_cost(&self, cost: NodeCost) -> bool {
        match &self.kind {
            NodeKind::Operation { cost: cell, .. } => {
                cell.set(cost);
                true
            }
            _ => false,
        }
    }

    /// Find the first operation named `name`, depth first
    pub fn find_operation(&self, name: &str) -> Option<&Node> {
        if matches!(&self.kind, NodeKind::Operation { name: own, .. } if own == name) {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_operation(name))
    }

    /// Call sites of every direct call node in this subtree, in pre-order
    pub fn call_sites(&self) -> Vec<CallSiteId> {
        let mut sites = Vec::new();
        self.collect_call_sites(&mut sites);
        sites
    }

    fn collect_call_sites(&self, out: &mut Vec<CallSiteId>) {
        if let NodeKind::DirectCall(site) = self.kind {
            out.push(site);
        }
        for child in &self.children {
            child.collect_call_sites(out);
        }
    }

    /// Deep copy of this subtree with every call site passed through `remap`.
    ///
    /// The copy starts without feedback: operation costs are reset to
    /// [`NodeCost::Uninitialized`].
    pub fn try_clone_uninitialized<E>(
        &self,
        remap: &mut impl FnMut(CallSiteId) -> Result<CallSiteId, E>,
    ) -> Result<Node, E> {
        let kind = match &self.kind {
            NodeKind::DirectCall(site) => NodeKind::DirectCall(remap(*site)?),
            NodeKind::Operation { name, .. } => NodeKind::Operation {
                name: name.clone(),
                cost: CostCell::new(NodeCost::Uninitialized),
            },
            NodeKind::Block => NodeKind::Block,
        };
        let children = self
            .children
            .iter()
            .map(|child| child.try_clone_uninitialized(remap))
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Node { kind, children })
    }
}

impl GraphNode for Node {
    fn cost(&self) -> NodeCost {
        match &self.kind {
            NodeKind::Block => NodeCost::None,
            NodeKind::Operation { cost, .. } => cost.get(),
            NodeKind::DirectCall(_) => NodeCost::Monomorphic,
        }
    }

    fn call_site(&self) -> Option<CallSiteId> {
        match self.kind {
            NodeKind::DirectCall(site) => Some(site),
            _ => None,
        }
    }

    fn for_each_child(&self, f: &mut dyn FnMut(&dyn GraphNode)) {
        for child in &self.children {
            f(child);
        }
    }
}
