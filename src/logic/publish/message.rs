//! Downstream message encoding
//!
//! The body is the scored record as flat JSON, keyed the way the existing
//! downstream consumers read it (`Hour`, `Rolling_Mean`, `Outliers`, ...).
//! The message key is the timestamp text; the event time travels separately
//! in epoch ms.

use serde::Serialize;

use crate::logic::error::SinkError;
use crate::logic::record::ScoredRecord;

/// Encoded message ready for any `MessageSink`
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub key: String,
    pub payload: Vec<u8>,
    pub timestamp_ms: i64,
}

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    timestamp: String,
    timestamp_ms: i64,
    value: f64,
    #[serde(rename = "Weekday")]
    weekday: &'a str,
    #[serde(rename = "Hour")]
    hour: u32,
    #[serde(rename = "Day")]
    day: u32,
    #[serde(rename = "Month")]
    month: u32,
    #[serde(rename = "Year")]
    year: i32,
    #[serde(rename = "Month_day")]
    month_day: u32,
    #[serde(rename = "Lag")]
    lag: Option<f64>,
    #[serde(rename = "Rolling_Mean")]
    rolling_mean: f64,
    #[serde(rename = "Outliers")]
    outliers: f64,
    #[serde(rename = "Score")]
    score: f64,
}

impl OutboundMessage {
    pub fn from_scored(record: &ScoredRecord) -> Result<Self, SinkError> {
        let fv = &record.features;
        let timestamp = record.timestamp_text();

        let body = MessageBody {
            timestamp: timestamp.clone(),
            timestamp_ms: record.timestamp_ms(),
            value: fv.value,
            weekday: fv.weekday_name(),
            hour: fv.hour,
            day: fv.day_of_week,
            month: fv.month,
            year: fv.year,
            month_day: fv.day_of_month,
            lag: fv.lag,
            rolling_mean: fv.rolling_mean,
            outliers: record.outlier_flag(),
            score: record.score,
        };

        Ok(Self {
            key: timestamp,
            payload: serde_json::to_vec(&body)?,
            timestamp_ms: record.timestamp_ms(),
        })
    }
}
