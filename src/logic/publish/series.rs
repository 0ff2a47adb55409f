//! Time-series points and InfluxDB line protocol
//!
//! Each scored record becomes two points with the same event time: one tagged
//! with calendar dimensions, one untagged ("raw") for trend queries.

use chrono::{DateTime, Utc};

use crate::logic::record::{RawRecord, ScoredRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: Vec<(String, String)>,
    pub fields: Vec<(String, f64)>,
    pub timestamp: DateTime<Utc>,
}

impl Point {
    pub fn new(measurement: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: Vec::new(),
            fields: Vec::new(),
            timestamp,
        }
    }

    pub fn tag(mut self, key: &str, value: impl ToString) -> Self {
        self.tags.push((key.to_string(), value.to_string()));
        self
    }

    /// Float field; absent or non-finite values are left out of the point
    pub fn float(mut self, key: &str, value: Option<f64>) -> Self {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.fields.push((key.to_string(), v));
        }
        self
    }

    #[cfg(test)]
    pub fn field_value(&self, key: &str) -> Option<f64> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    #[cfg(test)]
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Render as one line of line protocol, millisecond precision
    ///
    /// Returns `None` for a point without fields, which InfluxDB rejects.
    pub fn to_line_protocol(&self) -> Option<String> {
        if self.fields.is_empty() {
            return None;
        }

        let mut line = escape(&self.measurement, &[',', ' ']);

        let mut tags: Vec<&(String, String)> =
            self.tags.iter().filter(|(_, v)| !v.is_empty()).collect();
        tags.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, value) in tags {
            line.push(',');
            line.push_str(&escape(key, &[',', '=', ' ']));
            line.push('=');
            line.push_str(&escape(value, &[',', '=', ' ']));
        }

        line.push(' ');
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(key, value)| format!("{}={}", escape(key, &[',', '=', ' ']), render_float(*value)))
            .collect();
        line.push_str(&fields.join(","));

        line.push(' ');
        line.push_str(&self.timestamp.timestamp_millis().to_string());

        Some(line)
    }
}

fn escape(text: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\\' || special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Floats keep a decimal point so InfluxDB never types them as integers
fn render_float(value: f64) -> String {
    let s = value.to_string();
    if s.contains('.') || s.contains('e') {
        s
    } else {
        format!("{}.0", s)
    }
}

// ============================================================================
// POINT BUILDERS
// ============================================================================

fn with_score_fields(point: Point, record: &ScoredRecord) -> Point {
    let fv = &record.features;
    point
        .float("Lag", fv.lag)
        .float("Rolling_Mean", Some(fv.rolling_mean))
        .float("Outliers", Some(record.outlier_flag()))
        .float("Score", Some(record.score))
        .float("value", Some(fv.value))
}

/// Calendar-tagged point
pub fn tagged_point(record: &ScoredRecord, measurement: &str) -> Point {
    let fv = &record.features;
    let point = Point::new(measurement, record.timestamp())
        .tag("Hour", fv.hour)
        .tag("Day", fv.day_of_week)
        .tag("Weekday", fv.weekday_name())
        .tag("Month", fv.month)
        .tag("Month_day", fv.day_of_month)
        .tag("Year", fv.year);
    with_score_fields(point, record)
}

/// Untagged point carrying the same fields
pub fn raw_point(record: &ScoredRecord, measurement: &str) -> Point {
    with_score_fields(Point::new(measurement, record.timestamp()), record)
}

/// Both points for one scored record, tagged first
pub fn points_for(record: &ScoredRecord, measurement: &str, raw_measurement: &str) -> [Point; 2] {
    [tagged_point(record, measurement), raw_point(record, raw_measurement)]
}

/// Plain ingest mirror point (`value` only)
pub fn ingest_point(record: &RawRecord, measurement: &str) -> Point {
    Point::new(measurement, record.timestamp).float("value", Some(record.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::derive;
    use crate::logic::model::{Prediction, ScoreOutput};
    use crate::logic::window::WindowSnapshot;
    use chrono::TimeZone;

    fn scored(lag: bool) -> ScoredRecord {
        let t = Utc.with_ymd_and_hms(2015, 1, 31, 17, 30, 0).unwrap();
        let mut records = vec![RawRecord::new(t, 50.0)];
        if lag {
            records.insert(0, RawRecord::new(t - chrono::Duration::minutes(30), 10.0));
        }
        let fv = derive(&WindowSnapshot::from_slice(&records)).unwrap();
        ScoredRecord::new(fv, ScoreOutput { prediction: Prediction::Inlier, score: 0.07 })
    }

    #[test]
    fn test_points_share_event_time_and_fields() {
        let record = scored(true);
        let [tagged, raw] = points_for(&record, "taxi-demand-anomalies", "taxi-demand-anomalies_DATA");

        assert_eq!(tagged.timestamp, raw.timestamp);
        assert_eq!(tagged.fields, raw.fields);
        assert_eq!(tagged.tags.len(), 6);
        assert!(raw.tags.is_empty());
        assert_eq!(tagged.tag_value("Weekday"), Some("Saturday"));
        assert_eq!(tagged.tag_value("Hour"), Some("17"));
        assert_eq!(raw.measurement, "taxi-demand-anomalies_DATA");
        assert_eq!(raw.field_value("Lag"), Some(10.0));
        assert_eq!(raw.field_value("Outliers"), Some(0.0));
        assert_eq!(raw.field_value("Score"), Some(0.07));
    }

    #[test]
    fn test_line_protocol() {
        let record = scored(true);
        let line = raw_point(&record, "demand raw").to_line_protocol().unwrap();
        assert_eq!(
            line,
            format!(
                "demand\\ raw Lag=10.0,Rolling_Mean=30.0,Outliers=0.0,Score=0.07,value=50.0 {}",
                record.timestamp_ms()
            )
        );

        let tagged = tagged_point(&record, "m").to_line_protocol().unwrap();
        assert!(tagged.starts_with("m,Day=5,Hour=17,Month=1,Month_day=31,Weekday=Saturday,Year=2015 "));
    }

    #[test]
    fn test_missing_lag_field_is_omitted() {
        let record = scored(false);
        let point = raw_point(&record, "m");
        assert!(point.field_value("Lag").is_none());
        assert!(point.to_line_protocol().unwrap().contains("Rolling_Mean=50.0"));
    }

    #[test]
    fn test_escaping() {
        let t = Utc.with_ymd_and_hms(2014, 7, 1, 0, 0, 0).unwrap();
        let point = Point::new("m,x", t)
            .tag("zone id", "a=b")
            .tag("empty", "")
            .float("rate", Some(1.5))
            .float("nan", Some(f64::NAN));
        assert_eq!(
            point.to_line_protocol().unwrap(),
            format!("m\\,x,zone\\ id=a\\=b rate=1.5 {}", t.timestamp_millis())
        );
        assert!(Point::new("empty", t).to_line_protocol().is_none());
    }

    #[test]
    fn test_ingest_point() {
        let t = Utc.with_ymd_and_hms(2014, 7, 1, 0, 0, 0).unwrap();
        let point = ingest_point(&RawRecord::new(t, 10844.0), "event-frames-model");
        assert_eq!(
            point.to_line_protocol().unwrap(),
            format!("event-frames-model value=10844.0 {}", t.timestamp_millis())
        );
    }
}
