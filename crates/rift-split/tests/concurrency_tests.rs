//! Concurrent dispatch and split tests

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::{caller, callee};
use rift_graph::NodeCost;
use rift_split::{Engine, RejectReason, SplitDecision, SplittingOptions};

const THREADS: usize = 8;

#[test]
fn concurrent_dispatch_splits_exactly_once() {
    let engine = Arc::new(Engine::default());
    let target = callee(&engine, "callee", 0, &[NodeCost::Polymorphic]);
    let (_, site) = caller(&engine, target, true);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..100 {
                    engine.dispatch(site).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let call_site = engine.graph().call_site(site).unwrap();
    assert_eq!(call_site.call_count(), (THREADS * 100) as u64);
    assert!(call_site.is_cloned());
    assert_ne!(call_site.target(), target);

    let snapshot = engine.stats_snapshot();
    assert_eq!(snapshot.evaluations, 1);
    assert_eq!(snapshot.splits, 1);
    assert_eq!(snapshot.split_count, 1);
}

#[test]
fn concurrent_force_split_has_one_winner() {
    let engine = Arc::new(Engine::default());
    let target = callee(&engine, "callee", 2, &[NodeCost::Monomorphic]);
    let (_, site) = caller(&engine, target, true);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.force_split(site).unwrap()
            })
        })
        .collect();
    let clones: Vec<_> = handles
        .into_iter()
        .filter_map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(clones.len(), 1);
    assert_eq!(engine.graph().call_site(site).unwrap().target(), clones[0]);
    assert_eq!(engine.engine_data().split_count(), 1);
}

#[test]
fn concurrent_splits_exhaust_the_budget() {
    const LIMIT: u64 = 3;
    let engine = Arc::new(Engine::new(SplittingOptions::new().limit(LIMIT, 0.0)));
    let sites: Vec<_> = (0..THREADS * 2)
        .map(|i| {
            let target = callee(&engine, &format!("callee{i}"), 0, &[NodeCost::Polymorphic]);
            caller(&engine, target, true).1
        })
        .collect();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = sites
        .chunks(2)
        .map(|chunk| {
            let chunk = chunk.to_vec();
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for site in chunk {
                    engine.dispatch(site).unwrap();
                    engine.dispatch(site).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // A rejection only happens once the count is past the limit.
    let snapshot = engine.stats_snapshot();
    assert!(snapshot.split_count > LIMIT);
    assert_eq!(snapshot.split_count, snapshot.splits);
    assert_eq!(snapshot.evaluations, (THREADS * 2) as u64);
    assert_eq!(
        snapshot.splits + snapshot.rejected_budget_exhausted,
        snapshot.evaluations
    );

    let target = callee(&engine, "late", 0, &[NodeCost::Polymorphic]);
    let (_, late) = caller(&engine, target, true);
    assert_eq!(
        engine.evaluate(late).unwrap(),
        SplitDecision::Reject(RejectReason::BudgetExhausted)
    );
}
