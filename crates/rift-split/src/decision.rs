//! Split decisions

use serde::Serialize;
use std::fmt;

/// Why a call site was judged worth splitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptReason {
    /// Callee contains at most one direct call
    SingleCall,
    /// Callee contains a polymorphic or megamorphic node
    Polymorphic,
}

/// Why a call site was not split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Already split, splitting disabled, or cloning not permitted
    Ineligible,
    /// Callee exceeds the maximum callee size
    CalleeTooLarge,
    /// Call site or callee is not attached to a live target
    Detached,
    /// Callee is the enclosing target or its source
    DirectRecursion,
    /// Split ancestry already passes through the callee twice
    RecursiveSplit,
    /// Engine split count is over its limit
    BudgetExhausted,
    /// Callee has several calls and no polymorphic node
    Monomorphic,
}

impl RejectReason {
    /// Number of reasons
    pub const COUNT: usize = 7;

    /// Every reason, in evaluation order
    pub const ALL: [RejectReason; Self::COUNT] = [
        RejectReason::Ineligible,
        RejectReason::CalleeTooLarge,
        RejectReason::Detached,
        RejectReason::DirectRecursion,
        RejectReason::RecursiveSplit,
        RejectReason::BudgetExhausted,
        RejectReason::Monomorphic,
    ];

    /// Dense index, for counter tables
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable name used in logs
    pub const fn as_str(self) -> &'static str {
        match self {
            RejectReason::Ineligible => "ineligible",
            RejectReason::CalleeTooLarge => "callee_too_large",
            RejectReason::Detached => "detached",
            RejectReason::DirectRecursion => "direct_recursion",
            RejectReason::RecursiveSplit => "recursive_split",
            RejectReason::BudgetExhausted => "budget_exhausted",
            RejectReason::Monomorphic => "monomorphic",
        }
    }
}

impl AcceptReason {
    /// Stable name used in logs
    pub const fn as_str(self) -> &'static str {
        match self {
            AcceptReason::SingleCall => "single_call",
            AcceptReason::Polymorphic => "polymorphic",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AcceptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating the splitting heuristic for one call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum SplitDecision {
    /// Split the call site
    Accept(AcceptReason),
    /// Leave the call site alone
    Reject(RejectReason),
}

impl SplitDecision {
    /// Check if the decision is to split
    #[inline]
    pub fn is_accept(self) -> bool {
        matches!(self, SplitDecision::Accept(_))
    }

    /// Rejection reason, if any
    pub fn reject_reason(self) -> Option<RejectReason> {
        match self {
            SplitDecision::Reject(reason) => Some(reason),
            SplitDecision::Accept(_) => None,
        }
    }
}

impl fmt::Display for SplitDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitDecision::Accept(reason) => write!(f, "accept ({reason})"),
            SplitDecision::Reject(reason) => write!(f, "reject ({reason})"),
        }
    }
}
