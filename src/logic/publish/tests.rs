//! Publisher integration tests

#[cfg(test)]
mod integration_tests {
    use std::time::Duration as StdDuration;

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    use crate::logic::error::SinkError;

    use crate::logic::features::derive;
    use crate::logic::model::{Prediction, ScoreOutput};
    use crate::logic::publish::testing::{MemoryMessageSink, MemorySeriesSink};
    use crate::logic::publish::{Point, PublishTargets, Publisher, TimeSeriesSink};
    use crate::logic::record::{RawRecord, ScoredRecord};
    use crate::logic::window::WindowSnapshot;

    fn targets() -> PublishTargets {
        PublishTargets {
            measurement: "taxi-demand-anomalies".to_string(),
            raw_measurement: "taxi-demand-anomalies_DATA".to_string(),
            ingest_measurement: "event-frames-model".to_string(),
            queue_capacity: 4,
        }
    }

    fn scored(minute: i64, value: f64) -> ScoredRecord {
        let t0 = Utc.with_ymd_and_hms(2014, 7, 1, 0, 0, 0).unwrap();
        let records = [
            RawRecord::new(t0 + Duration::minutes(minute - 30), 100.0),
            RawRecord::new(t0 + Duration::minutes(minute), value),
        ];
        let fv = derive(&WindowSnapshot::from_slice(&records)).unwrap();
        ScoredRecord::new(fv, ScoreOutput { prediction: Prediction::Inlier, score: 0.05 })
    }

    #[tokio::test]
    async fn test_both_sinks_receive_every_record_in_order() {
        let messages = MemoryMessageSink::new();
        let series = MemorySeriesSink::new();
        let publisher = Publisher::spawn(messages.clone(), series.clone(), targets());

        // more records than the queue holds, drained as the caller yields
        for i in 0..10 {
            publisher.publish(&scored(i * 30, i as f64));
            tokio::task::yield_now().await;
        }
        let report = publisher.shutdown().await;

        assert_eq!(report.messages.delivered, 10);
        assert_eq!(report.series.delivered, 20);
        assert_eq!(report.messages.failed + report.series.failed, 0);

        let keys: Vec<String> = messages.messages().into_iter().map(|m| m.key).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);

        let points = series.points();
        for pair in points.chunks(2) {
            assert_eq!(pair[0].measurement, "taxi-demand-anomalies");
            assert_eq!(pair[1].measurement, "taxi-demand-anomalies_DATA");
            assert_eq!(pair[0].timestamp, pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn test_series_failure_does_not_affect_messages() {
        let messages = MemoryMessageSink::new();
        let series = MemorySeriesSink::failing_first(2);
        let publisher = Publisher::spawn(messages.clone(), series.clone(), targets());

        publisher.publish(&scored(0, 1.0));
        publisher.publish(&scored(30, 2.0));
        let report = publisher.shutdown().await;

        assert_eq!(report.messages.delivered, 2);
        assert_eq!(report.series.failed, 2);
        assert_eq!(report.series.delivered, 2);
        assert_eq!(messages.messages().len(), 2);

        // only the second record's points made it
        let points = series.points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].field_value("value"), Some(2.0));
    }

    #[tokio::test]
    async fn test_message_failure_does_not_affect_series() {
        let messages = MemoryMessageSink::failing_first(1);
        let series = MemorySeriesSink::new();
        let publisher = Publisher::spawn(messages.clone(), series.clone(), targets());

        publisher.publish(&scored(0, 1.0));
        let report = publisher.shutdown().await;

        assert_eq!(report.messages.failed, 1);
        assert_eq!(report.series.delivered, 2);
        assert!(messages.messages().is_empty());
    }

    #[tokio::test]
    async fn test_mirror_raw_writes_ingest_measurement() {
        let messages = MemoryMessageSink::new();
        let series = MemorySeriesSink::new();
        let publisher = Publisher::spawn(messages.clone(), series.clone(), targets());

        let t = Utc.with_ymd_and_hms(2014, 7, 1, 0, 0, 0).unwrap();
        publisher.mirror_raw(&RawRecord::new(t, 10844.0));
        let report = publisher.shutdown().await;

        assert_eq!(report.series.delivered, 1);
        assert_eq!(report.messages.delivered, 0);
        let points = series.points();
        assert_eq!(points[0].measurement, "event-frames-model");
        assert!(points[0].tags.is_empty());
        assert_eq!(points[0].field_value("value"), Some(10844.0));
    }

    #[tokio::test]
    async fn test_report_names_sinks() {
        let publisher = Publisher::spawn(MemoryMessageSink::new(), MemorySeriesSink::new(), targets());
        let report = publisher.shutdown().await;
        assert_eq!(report.messages.name, "memory-messages");
        assert_eq!(report.series.name, "memory-series");
    }

    /// Time-series store that accepts the connection and never answers
    struct StalledSeries;

    #[async_trait]
    impl TimeSeriesSink for StalledSeries {
        fn name(&self) -> &str {
            "stalled-series"
        }

        async fn write(&self, _point: &Point) -> Result<(), SinkError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_stalled_series_sink_does_not_block_messages() {
        let messages = MemoryMessageSink::new();
        let publisher = Publisher::spawn(messages.clone(), std::sync::Arc::new(StalledSeries), targets());

        for i in 0..20 {
            let published = tokio::time::timeout(StdDuration::from_millis(200), async {
                publisher.publish(&scored(i * 30, i as f64));
            })
            .await;
            assert!(published.is_ok(), "publish {} blocked", i);
            tokio::task::yield_now().await;
        }

        let deadline = tokio::time::Instant::now() + StdDuration::from_secs(2);
        while messages.messages().len() < 20 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        assert_eq!(messages.messages().len(), 20);
    }

    #[tokio::test]
    async fn test_full_queue_drops_and_counts() {
        let messages = MemoryMessageSink::new();
        let series = MemorySeriesSink::new();
        let publisher = Publisher::spawn(messages.clone(), series.clone(), targets());

        // no yield: dispatch tasks cannot drain, capacity is 4
        for i in 0..4 {
            publisher.publish(&scored(i * 30, i as f64));
        }
        let report = publisher.shutdown().await;

        assert_eq!(report.messages.delivered, 4);
        assert_eq!(report.series.delivered, 4);
        assert_eq!(report.series.failed, 4);
        assert_eq!(series.points().len(), 4);
    }
}
