//! Raw records as delivered by the upstream producer
//!
//! Payloads are JSON objects carrying a timestamp (text or epoch-ms) and a
//! scalar value. Naive timestamps are interpreted as UTC.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::TIMESTAMP_FORMAT;
use crate::logic::error::IngestError;
use crate::logic::features::FeatureVector;
use crate::logic::model::ScoreOutput;

/// One observation of the series. Immutable once ingested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl RawRecord {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Event time in epoch milliseconds
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// Timestamp rendered in the outbound text format
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Decode a JSON payload
    ///
    /// Accepts `{"timestamp": "2014-07-01 00:00:00", "value": 10844}`,
    /// `{"timestamp": 1404172800000, "value": ...}` or a payload that only
    /// carries `timestamp_ms`.
    pub fn from_json(payload: &[u8]) -> Result<Self, IngestError> {
        let doc: Value = serde_json::from_slice(payload)?;
        let obj = doc
            .as_object()
            .ok_or_else(|| IngestError::Malformed("payload is not a JSON object".to_string()))?;

        let timestamp = match obj.get("timestamp").filter(|v| !v.is_null()) {
            Some(Value::String(text)) => parse_timestamp(text)?,
            Some(Value::Number(n)) => {
                let ms = n
                    .as_i64()
                    .ok_or_else(|| IngestError::InvalidTimestamp(n.to_string()))?;
                from_epoch_ms(ms)?
            }
            Some(other) => return Err(IngestError::InvalidTimestamp(other.to_string())),
            None => {
                let ms = obj
                    .get("timestamp_ms")
                    .and_then(Value::as_i64)
                    .ok_or(IngestError::MissingField("timestamp"))?;
                from_epoch_ms(ms)?
            }
        };

        let value = match obj.get("value") {
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| IngestError::Malformed(format!("value {} is not a float", n)))?,
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| IngestError::Malformed(format!("value '{}' is not numeric", s)))?,
            Some(other) => {
                return Err(IngestError::Malformed(format!("value {} is not numeric", other)))
            }
            None => return Err(IngestError::MissingField("value")),
        };

        if !value.is_finite() {
            return Err(IngestError::Malformed(format!("value {} is not finite", value)));
        }

        Ok(Self { timestamp, value })
    }
}

/// Features + scorer verdict for one record. Transient: built, published,
/// dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub features: FeatureVector,
    pub is_outlier: bool,
    pub score: f64,
}

impl ScoredRecord {
    pub fn new(features: FeatureVector, output: ScoreOutput) -> Self {
        Self {
            features,
            is_outlier: output.prediction.is_outlier(),
            score: output.score,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.features.timestamp
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.features.timestamp.timestamp_millis()
    }

    pub fn timestamp_text(&self) -> String {
        self.features.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Outlier flag as the 1.0 / 0.0 field downstream consumers expect
    pub fn outlier_flag(&self) -> f64 {
        if self.is_outlier {
            1.0
        } else {
            0.0
        }
    }
}

/// Parse the timestamp texts the producer is known to emit
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, IngestError> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in [TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(IngestError::InvalidTimestamp(text.to_string()))
}

fn from_epoch_ms(ms: i64) -> Result<DateTime<Utc>, IngestError> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| IngestError::InvalidTimestamp(ms.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_decode_text_timestamp() {
        let record = RawRecord::from_json(br#"{"timestamp": "2014-07-01 00:30:00", "value": 8127}"#)
            .unwrap();
        assert_eq!(record.value, 8127.0);
        assert_eq!(record.timestamp.hour(), 0);
        assert_eq!(record.timestamp.minute(), 30);
        assert_eq!(record.timestamp_text(), "2014-07-01 00:30:00");
    }

    #[test]
    fn test_decode_epoch_ms() {
        let record =
            RawRecord::from_json(br#"{"timestamp": 1404172800000, "value": 10844.0}"#).unwrap();
        assert_eq!(record.timestamp.year(), 2014);
        assert_eq!(record.timestamp.month(), 7);
        assert_eq!(record.timestamp_ms(), 1_404_172_800_000);
    }

    #[test]
    fn test_decode_timestamp_ms_only() {
        let record = RawRecord::from_json(br#"{"timestamp_ms": 1404172800000, "value": 1}"#).unwrap();
        assert_eq!(record.timestamp_text(), "2014-07-01 00:00:00");
    }

    #[test]
    fn test_rfc3339_is_normalised_to_utc() {
        let ts = parse_timestamp("2014-07-01T02:00:00+02:00").unwrap();
        assert_eq!(ts.hour(), 0);
    }

    #[test]
    fn test_rejects_bad_payloads() {
        assert!(matches!(
            RawRecord::from_json(br#"{"value": 1}"#),
            Err(IngestError::MissingField("timestamp"))
        ));
        assert!(matches!(
            RawRecord::from_json(br#"{"timestamp": "2014-07-01 00:00:00"}"#),
            Err(IngestError::MissingField("value"))
        ));
        assert!(matches!(
            RawRecord::from_json(br#"{"timestamp": "yesterday", "value": 1}"#),
            Err(IngestError::InvalidTimestamp(_))
        ));
        assert!(RawRecord::from_json(b"not json").is_err());
        assert!(RawRecord::from_json(b"[1, 2]").is_err());
    }
}
