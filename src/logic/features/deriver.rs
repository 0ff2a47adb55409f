//! Feature Deriver
//!
//! Pure mapping from a window snapshot to the feature vector of its newest
//! record. Calendar fields use the record's UTC timestamp.

use chrono::{Datelike, Timelike};

use super::vector::FeatureVector;
use crate::constants::ROLLING_WINDOW;
use crate::logic::error::FeatureError;
use crate::logic::window::WindowSnapshot;

/// Derive features for the newest record of `snapshot`
///
/// `lag` is left empty when the snapshot holds a single record; the rolling
/// mean uses however many of the last `ROLLING_WINDOW` records exist.
pub fn derive(snapshot: &WindowSnapshot<'_>) -> Result<FeatureVector, FeatureError> {
    let current = snapshot.newest().ok_or(FeatureError::EmptyWindow)?;
    let ts = current.timestamp;

    let lag = snapshot.back_n(1).map(|prev| prev.value);

    Ok(FeatureVector {
        timestamp: ts,
        value: current.value,
        weekday: ts.weekday(),
        hour: ts.hour(),
        day_of_week: ts.weekday().num_days_from_monday(),
        month: ts.month(),
        year: ts.year(),
        day_of_month: ts.day(),
        lag,
        rolling_mean: rolling_mean(snapshot, ROLLING_WINDOW),
    })
}

/// Mean of the last `min(window, len)` values; 0.0 for an empty snapshot
pub fn rolling_mean(snapshot: &WindowSnapshot<'_>, window: usize) -> f64 {
    if snapshot.len() == 0 {
        return 0.0;
    }

    let (sum, count) = snapshot
        .tail(window)
        .fold((0.0f64, 0usize), |(sum, n), r| (sum + r.value, n + 1));

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
