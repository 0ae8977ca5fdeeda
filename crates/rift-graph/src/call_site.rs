//! Call sites
//!
//! A call site is one static call expression inside one target's graph. It
//! carries the counters and the split state the splitting strategy reads on
//! every dispatch, so everything here is lock-free.
//!
//! ## Split state protocol
//!
//! ```text
//! Unsplit ──try_begin_split──▶ Splitting ──finish_split──▶ Split (terminal)
//!    ▲                             │
//!    └─────────abort_split─────────┘
//! ```
//!
//! Only the thread whose `try_begin_split` succeeded may call `finish_split`
//! or `abort_split`.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};

use crate::ids::{CallSiteId, TargetId};

/// Where a call site is in its split lifecycle
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitState {
    /// Still dispatching to a shared target
    Unsplit = 0,
    /// One thread is deciding or cloning
    Splitting = 1,
    /// Rebound to a private clone, permanently
    Split = 2,
}

impl From<u8> for SplitState {
    fn from(v: u8) -> Self {
        match v {
            0 => SplitState::Unsplit,
            1 => SplitState::Splitting,
            _ => SplitState::Split,
        }
    }
}

/// A call expression dispatching to a [`CallTarget`](crate::CallTarget)
#[derive(Debug)]
pub struct CallSite {
    id: CallSiteId,
    original_target: TargetId,
    target: AtomicU32,
    call_count: AtomicU64,
    state: AtomicU8,
    cloning_allowed: bool,
    enclosing: OnceLock<TargetId>,
}

impl CallSite {
    pub(crate) fn new(id: CallSiteId, target: TargetId, cloning_allowed: bool) -> Self {
        Self {
            id,
            original_target: target,
            target: AtomicU32::new(target.index()),
            call_count: AtomicU64::new(0),
            state: AtomicU8::new(SplitState::Unsplit as u8),
            cloning_allowed,
            enclosing: OnceLock::new(),
        }
    }

    /// Arena id
    #[inline]
    pub fn id(&self) -> CallSiteId {
        self.id
    }

    /// Target this call site currently dispatches to
    #[inline]
    pub fn target(&self) -> TargetId {
        TargetId(self.target.load(Ordering::Acquire))
    }

    /// Target this call site was created with, before any split
    #[inline]
    pub fn original_target(&self) -> TargetId {
        self.original_target
    }

    pub(crate) fn rebind(&self, target: TargetId) {
        self.target.store(target.index(), Ordering::Release);
    }

    /// Count one invocation and return the count including it.
    ///
    /// Each value is handed to exactly one caller, even under contention.
    #[inline]
    pub fn record_call(&self) -> u64 {
        self.call_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Invocations observed so far
    #[inline]
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Whether the runtime permits cloning this call site's target
    #[inline]
    pub fn is_cloning_allowed(&self) -> bool {
        self.cloning_allowed
    }

    /// Target whose graph contains this call site, once attached
    #[inline]
    pub fn enclosing(&self) -> Option<TargetId> {
        self.enclosing.get().copied()
    }

    pub(crate) fn attach(&self, enclosing: TargetId) -> bool {
        self.enclosing.set(enclosing).is_ok()
    }

    /// Current split state
    #[inline]
    pub fn split_state(&self) -> SplitState {
        SplitState::from(self.state.load(Ordering::Acquire))
    }

    /// Check if this call site has been rebound to a private clone
    #[inline]
    pub fn is_cloned(&self) -> bool {
        self.split_state() == SplitState::Split
    }

    /// Claim the right to decide and clone. Succeeds for exactly one caller
    /// while the call site is unsplit.
    #[inline]
    pub fn try_begin_split(&self) -> bool {
        self.state
            .compare_exchange(
                SplitState::Unsplit as u8,
                SplitState::Splitting as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Publish a completed split
    pub fn finish_split(&self) {
        debug_assert_eq!(self.split_state(), SplitState::Splitting);
        self.state.store(SplitState::Split as u8, Ordering::Release);
    }

    /// Give the claim back without splitting
    pub fn abort_split(&self) {
        let _ = self.state.compare_exchange(
            SplitState::Splitting as u8,
            SplitState::Unsplit as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_call_returns_running_count() {
        let site = CallSite::new(CallSiteId(0), TargetId(0), true);
        assert_eq!(site.record_call(), 1);
        assert_eq!(site.record_call(), 2);
        assert_eq!(site.call_count(), 2);
    }

    #[test]
    fn split_claim_is_exclusive() {
        let site = CallSite::new(CallSiteId(0), TargetId(0), true);
        assert!(site.try_begin_split());
        assert!(!site.try_begin_split());
        assert_eq!(site.split_state(), SplitState::Splitting);
        assert!(!site.is_cloned());
    }

    #[test]
    fn aborted_claim_can_be_retaken() {
        let site = CallSite::new(CallSiteId(0), TargetId(0), true);
        assert!(site.try_begin_split());
        site.abort_split();
        assert_eq!(site.split_state(), SplitState::Unsplit);
        assert!(site.try_begin_split());
    }

    #[test]
    fn split_is_terminal() {
        let site = CallSite::new(CallSiteId(0), TargetId(0), true);
        assert!(site.try_begin_split());
        site.finish_split();
        assert!(site.is_cloned());

        site.abort_split();
        assert!(site.is_cloned());
        assert!(!site.try_begin_split());
    }

    #[test]
    fn enclosing_is_set_once() {
        let site = CallSite::new(CallSiteId(0), TargetId(0), true);
        assert_eq!(site.enclosing(), None);
        assert!(site.attach(TargetId(3)));
        assert!(!site.attach(TargetId(4)));
        assert_eq!(site.enclosing(), Some(TargetId(3)));
    }
}
