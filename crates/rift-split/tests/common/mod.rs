//! Graph builders shared by the splitting tests

#![allow(dead_code)]

use rift_graph::{CallSiteId, Node, NodeCost, TargetId};
use rift_split::Engine;

/// Load a target that makes no calls
pub fn leaf(engine: &Engine, name: &str) -> TargetId {
    engine
        .load_target(name, Node::operation("ret", NodeCost::Monomorphic))
        .expect("leaf should load")
}

/// Load a callee with one operation per entry of `costs` and `calls` direct
/// calls to fresh leaves
pub fn callee(engine: &Engine, name: &str, calls: usize, costs: &[NodeCost]) -> TargetId {
    let mut children: Vec<Node> = costs
        .iter()
        .enumerate()
        .map(|(i, cost)| Node::operation(format!("op{i}"), *cost))
        .collect();
    for i in 0..calls {
        let target = leaf(engine, &format!("{name}.leaf{i}"));
        let site = engine
            .add_call_site(target, true)
            .expect("call site should be created");
        children.push(Node::direct_call(site));
    }
    engine
        .load_target(name, Node::block(children))
        .expect("callee should load")
}

/// Load a caller with a single call site to `callee`
pub fn caller(engine: &Engine, callee: TargetId, cloning_allowed: bool) -> (TargetId, CallSiteId) {
    let site = engine
        .add_call_site(callee, cloning_allowed)
        .expect("call site should be created");
    let main = engine
        .load_target("main", Node::block([Node::direct_call(site)]))
        .expect("caller should load");
    (main, site)
}

/// The only call site inside `target`
pub fn sole_call_site(engine: &Engine, target: TargetId) -> CallSiteId {
    let sites = engine
        .graph()
        .call_target(target)
        .expect("target should be loaded")
        .root()
        .call_sites();
    assert_eq!(sites.len(), 1, "expected exactly one call site");
    sites[0]
}
