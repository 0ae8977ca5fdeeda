//! Arena identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a call target in a [`CallGraph`](crate::CallGraph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TargetId(pub u32);

impl TargetId {
    /// Create a new target id
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the arena index
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl From<u32> for TargetId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Index of a call site in a [`CallGraph`](crate::CallGraph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct CallSiteId(pub u32);

impl CallSiteId {
    /// Create a new call site id
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the arena index
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl From<u32> for CallSiteId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Display for CallSiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cs{}", self.0)
    }
}
