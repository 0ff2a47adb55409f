//! Feature Vector - derived attributes of the newest record
//!
//! Two shapes:
//! - `FeatureVector`: everything the deriver knows about the record, including
//!   fields the scorer never sees (`weekday`, `year`) and an optional `lag`.
//! - `ScorerInput`: the versioned, complete, fixed-order array from
//!   `layout.rs`. Only this shape is ever handed to a scorer.

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use super::layout::{layout_hash, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
use crate::logic::error::FeatureError;

// ============================================================================
// FEATURE VECTOR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub timestamp: DateTime<Utc>,
    pub value: f64,

    // Calendar (UTC)
    pub weekday: Weekday,
    pub hour: u32,
    /// Monday = 0
    pub day_of_week: u32,
    pub month: u32,
    pub year: i32,
    pub day_of_month: u32,

    // Window statistics
    pub lag: Option<f64>,
    pub rolling_mean: f64,
}

impl FeatureVector {
    /// Full English weekday name ("Monday" .. "Sunday")
    pub fn weekday_name(&self) -> &'static str {
        weekday_name(self.weekday)
    }

    /// Project onto the scorer schema
    ///
    /// Fails with `FeatureError::Incomplete` instead of substituting a value
    /// for a missing column.
    pub fn scorer_input(&self) -> Result<ScorerInput, FeatureError> {
        let lag = self.lag.ok_or(FeatureError::Incomplete("lag"))?;

        Ok(ScorerInput::from_values([
            self.value,
            self.hour as f64,
            self.day_of_week as f64,
            self.day_of_month as f64,
            self.month as f64,
            self.rolling_mean,
            lag,
        ]))
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

// ============================================================================
// VERSIONED SCORER INPUT
// ============================================================================

/// Versioned scorer input with layout metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerInput {
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout (for mismatch detection)
    pub layout_hash: u32,
    /// Feature values in order defined by FEATURE_LAYOUT
    pub values: [f64; FEATURE_COUNT],
}

impl ScorerInput {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    /// Values narrowed to f32, the tensor type of exported models
    pub fn to_f32(&self) -> [f32; FEATURE_COUNT] {
        self.values.map(|v| v as f32)
    }

    #[cfg(test)]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    #[cfg(test)]
    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        super::layout::feature_index(name).and_then(|i| self.get(i))
    }

    /// True when every value is a finite number
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// Convert to JSON-serializable format for logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        serde_json::json!({
            "feature_version": self.version,
            "layout_hash": self.layout_hash,
            "named_values": FEATURE_LAYOUT.iter()
                .zip(self.values.iter())
                .map(|(name, value)| (name.to_string(), *value))
                .collect::<std::collections::HashMap<_, _>>(),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
