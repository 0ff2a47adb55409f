//! Feature Layout - Centralized scorer schema definition
//!
//! The IsolationForest artifact was fit on the taxi columns below, in this
//! order. Any change to the column set or order needs a retrained model and
//! a bump of `FEATURE_VERSION`; the loader rejects a model whose declared
//! input width differs from `FEATURE_COUNT`.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
/// Bumped with every change to `FEATURE_LAYOUT`
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Feature names in exact order they appear in the scorer input
pub const FEATURE_LAYOUT: &[&str] = &[
    "value",        // 0: Raw demand count of the current record
    "hour",         // 1: Hour of day (UTC)
    "day_of_week",  // 2: Monday = 0 .. Sunday = 6
    "day_of_month", // 3: 1..31
    "month",        // 4: 1..12
    "rolling_mean", // 5: Mean of the trailing up-to-7 values
    "lag",          // 6: Previous value
];

/// Width of the scorer input
pub const FEATURE_COUNT: usize = FEATURE_LAYOUT.len();

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of the feature layout
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION]);

    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }

    hasher.finalize()
}

pub fn layout_hash() -> u32 {
    compute_layout_hash()
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for serialization/logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for LayoutInfo {
    fn default() -> Self {
        Self::current()
    }
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

#[cfg(test)]
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}
