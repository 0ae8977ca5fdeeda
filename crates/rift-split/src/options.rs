//! Splitting configuration
//!
//! Options are read once when an engine is created and stay fixed for its
//! lifetime. They can come from the process environment or from a JSON engine
//! configuration fragment.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SplitError};

/// Default maximum non-trivial node count of a splittable callee
pub const DEFAULT_MAX_CALLEE_SIZE: usize = 100;

/// Default number of splits allowed regardless of engine size
pub const DEFAULT_BASE_LIMIT: u64 = 100;

/// Default extra splits allowed per loaded target
pub const DEFAULT_LIMIT_GROWTH: f64 = 1.5;

/// Tuning knobs for the splitting heuristic and budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplittingOptions {
    /// Global switch. When off, no call site is ever split.
    pub enabled: bool,
    /// Callees with more non-trivial nodes than this are never split
    pub max_callee_size: usize,
    /// Splits allowed before the growth term kicks in
    pub base_limit: u64,
    /// Splits allowed per loaded target, on top of `base_limit`
    pub limit_growth: f64,
    /// Absolute ceiling on the split limit
    pub max_splits: Option<u64>,
    /// Log every decision at info level
    pub trace_decisions: bool,
}

impl Default for SplittingOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_callee_size: DEFAULT_MAX_CALLEE_SIZE,
            base_limit: DEFAULT_BASE_LIMIT,
            limit_growth: DEFAULT_LIMIT_GROWTH,
            max_splits: None,
            trace_decisions: false,
        }
    }
}

fn parse_env_truthy(value: &str) -> bool {
    !matches!(value.trim(), "" | "0")
        && !value.trim().eq_ignore_ascii_case("false")
        && !value.trim().eq_ignore_ascii_case("off")
        && !value.trim().eq_ignore_ascii_case("no")
}

impl SplittingOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with splitting switched off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Read options from the process environment.
    ///
    /// - `RIFT_DISABLE_SPLITTING=1` turns splitting off
    /// - `RIFT_SPLITTING_MAX_CALLEE_SIZE=<usize>`
    /// - `RIFT_SPLITTING_BASE_LIMIT=<u64>`
    /// - `RIFT_SPLITTING_LIMIT_GROWTH=<f64>`
    /// - `RIFT_SPLITTING_MAX_SPLITS=<u64>`
    /// - `RIFT_TRACE_SPLITTING=1`
    ///
    /// Unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read options through `lookup`, using the same variables as
    /// [`from_env`](Self::from_env)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parse = |name: &str| lookup(name).map(|value| value.trim().to_string());

        Self {
            enabled: !parse("RIFT_DISABLE_SPLITTING").is_some_and(|v| parse_env_truthy(&v)),
            max_callee_size: parse("RIFT_SPLITTING_MAX_CALLEE_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_callee_size),
            base_limit: parse("RIFT_SPLITTING_BASE_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.base_limit),
            limit_growth: parse("RIFT_SPLITTING_LIMIT_GROWTH")
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|growth| growth.is_finite() && *growth >= 0.0)
                .unwrap_or(defaults.limit_growth),
            max_splits: parse("RIFT_SPLITTING_MAX_SPLITS").and_then(|v| v.parse().ok()),
            trace_decisions: parse("RIFT_TRACE_SPLITTING").is_some_and(|v| parse_env_truthy(&v)),
        }
    }

    /// Parse options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Check that every value is in range
    pub fn validate(&self) -> Result<()> {
        if !self.limit_growth.is_finite() || self.limit_growth < 0.0 {
            return Err(SplitError::InvalidOption {
                option: "limit_growth",
                reason: "must be a finite, non-negative number",
            });
        }
        Ok(())
    }

    /// Set the maximum callee size
    pub fn max_callee_size(mut self, size: usize) -> Self {
        self.max_callee_size = size;
        self
    }

    /// Set the base split limit and growth factor
    pub fn limit(mut self, base_limit: u64, limit_growth: f64) -> Self {
        self.base_limit = base_limit;
        self.limit_growth = limit_growth;
        self
    }

    /// Set the absolute split ceiling
    pub fn max_splits(mut self, max_splits: u64) -> Self {
        self.max_splits = Some(max_splits);
        self
    }

    /// Enable or disable info-level decision logging
    pub fn trace_decisions(mut self, enabled: bool) -> Self {
        self.trace_decisions = enabled;
        self
    }
}
