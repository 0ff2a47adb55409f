//! Pipeline Module - per-record coordinator
//!
//! Every record walks the same path:
//!
//! ```text
//! INGESTED -> BUFFERED -> FEATURED -> SCORED -> PUBLISHED
//!                            |           |
//!                            |           +-> SKIPPED_SCORE_ERROR
//!                            +-> SKIPPED_INCOMPLETE
//! ```
//!
//! The buffer is updated before anything can fail, so a skipped record still
//! serves as history (lag, rolling mean) for the records after it. One record
//! is processed end to end before the next is taken.

pub mod stats;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::logic::config::PipelineConfig;
use crate::logic::error::{FeatureError, ScoringError};
use crate::logic::features::derive;
use crate::logic::ingest::RecordSource;
use crate::logic::model::{score_with_timeout, AnomalyScorer};
use crate::logic::publish::Publisher;
use crate::logic::record::{RawRecord, ScoredRecord};
use crate::logic::window::{BufferStatus, WindowBuffer};

pub use stats::{PipelineStats, RunSummary};

/// Terminal state of one record
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    Published { is_outlier: bool, score: f64 },
    SkippedIncomplete(FeatureError),
    SkippedScoreError(ScoringError),
}

impl RecordOutcome {
    pub fn state(&self) -> &'static str {
        match self {
            RecordOutcome::Published { .. } => "PUBLISHED",
            RecordOutcome::SkippedIncomplete(_) => "SKIPPED_INCOMPLETE",
            RecordOutcome::SkippedScoreError(_) => "SKIPPED_SCORE_ERROR",
        }
    }

    /// Outliers and both skip states surface by default; inliers only at debug
    pub fn log_level(&self) -> log::Level {
        match self {
            RecordOutcome::Published { is_outlier: true, .. } => log::Level::Info,
            RecordOutcome::Published { .. } => log::Level::Debug,
            RecordOutcome::SkippedIncomplete(_) | RecordOutcome::SkippedScoreError(_) => log::Level::Warn,
        }
    }
}

pub struct Pipeline {
    window: WindowBuffer,
    scorer: Arc<dyn AnomalyScorer>,
    publisher: Publisher,
    scorer_timeout: Duration,
    mirror_raw: bool,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig, scorer: Arc<dyn AnomalyScorer>, publisher: Publisher) -> Self {
        Self {
            window: WindowBuffer::new(config.buffer_size),
            scorer,
            publisher,
            scorer_timeout: config.scorer_timeout(),
            mirror_raw: config.mirror_raw,
            stats: PipelineStats::default(),
        }
    }

    #[cfg(test)]
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn buffer_status(&self) -> BufferStatus {
        self.window.status()
    }

    /// Take one record to a terminal state
    pub async fn process(&mut self, record: RawRecord) -> RecordOutcome {
        self.stats.ingested += 1;
        let ts = record.timestamp_text();

        if self.mirror_raw {
            self.publisher.mirror_raw(&record);
        }

        // BUFFERED
        if let Some(evicted) = self.window.push(record) {
            self.stats.evicted += 1;
            log::trace!("evicted {}", evicted.timestamp_text());
        }

        let outcome = self.score_newest().await;

        let level = outcome.log_level();
        match &outcome {
            RecordOutcome::Published { is_outlier: true, score } => {
                log::log!(level, "[{}] {} value={} OUTLIER (score={:.4})", outcome.state(), ts, record.value, score);
            }
            RecordOutcome::Published { score, .. } => {
                log::log!(level, "[{}] {} value={} score={:.4}", outcome.state(), ts, record.value, score);
            }
            RecordOutcome::SkippedIncomplete(e) => {
                log::log!(level, "[{}] {}: {}", outcome.state(), ts, e);
            }
            RecordOutcome::SkippedScoreError(e) => {
                log::log!(level, "[{}] {}: {}", outcome.state(), ts, e);
            }
        }

        self.stats.record(&outcome);
        outcome
    }

    async fn score_newest(&mut self) -> RecordOutcome {
        // FEATURED
        let features = match derive(&self.window.snapshot()) {
            Ok(fv) => fv,
            Err(e) => return RecordOutcome::SkippedIncomplete(e),
        };
        let input = match features.scorer_input() {
            Ok(input) => input,
            Err(e) => return RecordOutcome::SkippedIncomplete(e),
        };

        // SCORED
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("scorer input {}", input.to_log_entry());
        }
        let output = match score_with_timeout(self.scorer.clone(), input, self.scorer_timeout).await {
            Ok(output) => output,
            Err(e) => return RecordOutcome::SkippedScoreError(e),
        };

        // PUBLISHED
        let scored = ScoredRecord::new(features, output);
        self.publisher.publish(&scored);

        RecordOutcome::Published {
            is_outlier: scored.is_outlier,
            score: scored.score,
        }
    }

    /// Consume `source` until it ends or Ctrl-C, then drain the publisher
    pub async fn run<S>(self, source: &mut S) -> RunSummary
    where
        S: RecordSource + ?Sized,
    {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        };
        self.run_until(source, ctrl_c).await
    }

    /// Consume `source` until it ends or `shutdown` resolves
    pub async fn run_until<S, F>(mut self, source: &mut S, shutdown: F) -> RunSummary
    where
        S: RecordSource + ?Sized,
        F: Future<Output = ()>,
    {
        let source_name = source.name().to_string();
        log::info!("Pipeline started: source={} buffer={}", source_name, self.window.capacity());
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutdown requested, stopping ingest");
                    break;
                }
                next = source.next_record() => match next {
                    Some(Ok(record)) => {
                        self.process(record).await;
                    }
                    Some(Err(e)) => {
                        self.stats.ingest_errors += 1;
                        log::warn!("[{}] dropped message: {}", source_name, e);
                    }
                    None => {
                        log::info!("Source {} ended", source_name);
                        break;
                    }
                },
            }
        }

        let buffer = self.buffer_status();
        let Pipeline { publisher, stats, .. } = self;
        let publish = publisher.shutdown().await;
        RunSummary { stats, buffer, publish }
    }
}
