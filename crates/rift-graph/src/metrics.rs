//! Read-only node counting over a target's graph

use crate::node::GraphNode;

/// Count nodes in the subtree rooted at `root` (inclusive) accepted by `filter`
pub fn count_nodes(root: &dyn GraphNode, filter: &dyn Fn(&dyn GraphNode) -> bool) -> usize {
    let mut count = 0;
    visit(root, &mut |node| {
        if filter(node) {
            count += 1;
        }
    });
    count
}

fn visit(node: &dyn GraphNode, f: &mut dyn FnMut(&dyn GraphNode)) {
    f(node);
    node.for_each_child(&mut |child| visit(child, f));
}

/// Number of direct call nodes
pub fn count_direct_calls(root: &dyn GraphNode) -> usize {
    count_nodes(root, &|node| node.call_site().is_some())
}

/// Number of nodes classified polymorphic or megamorphic
pub fn count_polymorphic(root: &dyn GraphNode) -> usize {
    count_nodes(root, &|node| node.cost().is_polymorphic())
}

/// Size estimate used to bound which callees may be split
pub fn count_non_trivial(root: &dyn GraphNode) -> usize {
    count_nodes(root, &|node| !node.cost().is_trivial())
}
