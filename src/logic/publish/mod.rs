//! Publish Module - fan-out of scored records
//!
//! Each sink has its own dispatch task fed by a bounded queue:
//! - per-sink order is the order of `publish` calls
//! - a failing, slow or hung sink never blocks the other one or the caller
//! - a full queue drops the new item and counts it as failed
//!
//! Delivery is at-most-once per sink. Failures are logged and counted, never
//! retried.

pub mod influx;
pub mod message;
pub mod series;
pub mod sink;
pub mod stdio;

#[cfg(feature = "kafka")]
pub mod kafka;

#[cfg(test)]
pub mod testing;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::logic::config::PipelineConfig;
use crate::logic::record::{RawRecord, ScoredRecord};

// Re-export common types
pub use message::OutboundMessage;
pub use series::Point;
pub use sink::{MessageSink, TimeSeriesSink};

// ============================================================================
// REPORTING
// ============================================================================

#[derive(Debug, Default)]
struct SinkCounters {
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl SinkCounters {
    fn report(&self, name: &str) -> SinkReport {
        SinkReport {
            name: name.to_string(),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkReport {
    pub name: String,
    pub delivered: u64,
    pub failed: u64,
}

/// Delivery totals per sink, available once the queues are drained
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub messages: SinkReport,
    pub series: SinkReport,
}

// ============================================================================
// TARGETS
// ============================================================================

/// Measurement names used for time-series points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTargets {
    pub measurement: String,
    pub raw_measurement: String,
    pub ingest_measurement: String,
    pub queue_capacity: usize,
}

impl PublishTargets {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            measurement: config.kafka.ml_topic.clone(),
            raw_measurement: config.raw_measurement(),
            ingest_measurement: config.kafka.input_topic.clone(),
            queue_capacity: config.publish_queue_capacity,
        }
    }
}

// ============================================================================
// PUBLISHER
// ============================================================================

struct Lane<T> {
    name: String,
    tx: mpsc::Sender<T>,
    handle: JoinHandle<()>,
    counters: Arc<SinkCounters>,
}

impl<T> Lane<T> {
    /// Enqueue without waiting; a full queue drops the item
    fn push(&self, item: T, context: &str) {
        match self.tx.try_send(item) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                log::error!("[{}] queue full, dropped {}", self.name, context);
            }
            Err(TrySendError::Closed(_)) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                log::error!("[{}] dispatch task gone, dropped {}", self.name, context);
            }
        }
    }

    async fn close(self) -> SinkReport {
        let Lane { name, tx, handle, counters } = self;
        drop(tx);
        if let Err(e) = handle.await {
            log::error!("[{}] dispatch task ended abnormally: {}", name, e);
        }
        counters.report(&name)
    }
}

fn spawn_message_lane(sink: Arc<dyn MessageSink>, capacity: usize) -> Lane<OutboundMessage> {
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(capacity.max(1));
    let counters = Arc::new(SinkCounters::default());
    let name = sink.name().to_string();

    let task_counters = counters.clone();
    let handle = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match sink.send(&message).await {
                Ok(()) => {
                    task_counters.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    task_counters.failed.fetch_add(1, Ordering::Relaxed);
                    log::error!("[{}] failed to publish record {}: {}", sink.name(), message.key, e);
                }
            }
        }
        if let Err(e) = sink.flush().await {
            log::warn!("[{}] flush failed: {}", sink.name(), e);
        }
    });

    Lane { name, tx, handle, counters }
}

fn spawn_series_lane(sink: Arc<dyn TimeSeriesSink>, capacity: usize) -> Lane<Point> {
    let (tx, mut rx) = mpsc::channel::<Point>(capacity.max(1));
    let counters = Arc::new(SinkCounters::default());
    let name = sink.name().to_string();

    let task_counters = counters.clone();
    let handle = tokio::spawn(async move {
        while let Some(point) = rx.recv().await {
            match sink.write(&point).await {
                Ok(()) => {
                    task_counters.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    task_counters.failed.fetch_add(1, Ordering::Relaxed);
                    log::error!(
                        "[{}] failed to write point {} @ {}: {}",
                        sink.name(),
                        point.measurement,
                        point.timestamp.format(crate::constants::TIMESTAMP_FORMAT),
                        e
                    );
                }
            }
        }
    });

    Lane { name, tx, handle, counters }
}

/// Two-sink publisher. Must be created inside a Tokio runtime.
pub struct Publisher {
    messages: Lane<OutboundMessage>,
    series: Lane<Point>,
    targets: PublishTargets,
}

impl Publisher {
    pub fn spawn(
        message_sink: Arc<dyn MessageSink>,
        series_sink: Arc<dyn TimeSeriesSink>,
        targets: PublishTargets,
    ) -> Self {
        log::info!(
            "Publisher started: messages -> {}, series -> {} ({} / {})",
            message_sink.name(),
            series_sink.name(),
            targets.measurement,
            targets.raw_measurement
        );

        Self {
            messages: spawn_message_lane(message_sink, targets.queue_capacity),
            series: spawn_series_lane(series_sink, targets.queue_capacity),
            targets,
        }
    }

    /// Hand one scored record to both sinks
    pub fn publish(&self, record: &ScoredRecord) {
        let context = record.timestamp_text();

        match OutboundMessage::from_scored(record) {
            Ok(message) => self.messages.push(message, &context),
            Err(e) => {
                self.messages.counters.failed.fetch_add(1, Ordering::Relaxed);
                log::error!("[{}] failed to encode record {}: {}", self.messages.name, context, e);
            }
        }

        let [tagged, raw] =
            series::points_for(record, &self.targets.measurement, &self.targets.raw_measurement);
        self.series.push(tagged, &context);
        self.series.push(raw, &context);
    }

    /// Mirror an ingested record to the time-series sink
    pub fn mirror_raw(&self, record: &RawRecord) {
        let point = series::ingest_point(record, &self.targets.ingest_measurement);
        self.series.push(point, &record.timestamp_text());
    }

    /// Close the queues, wait for both dispatch tasks to drain
    pub async fn shutdown(self) -> PublishReport {
        let Publisher { messages, series, .. } = self;
        let (messages, series) = tokio::join!(messages.close(), series.close());
        PublishReport { messages, series }
    }
}

#[cfg(test)]
mod tests;
