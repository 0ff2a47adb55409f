//! Run counters

use serde::Serialize;

use super::RecordOutcome;
use crate::logic::publish::PublishReport;
use crate::logic::window::BufferStatus;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub ingested: u64,
    pub published: u64,
    pub outliers: u64,
    pub skipped_incomplete: u64,
    pub skipped_score_error: u64,
    pub ingest_errors: u64,
    pub evicted: u64,
}

impl PipelineStats {
    pub fn record(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Published { is_outlier, .. } => {
                self.published += 1;
                if *is_outlier {
                    self.outliers += 1;
                }
            }
            RecordOutcome::SkippedIncomplete(_) => self.skipped_incomplete += 1,
            RecordOutcome::SkippedScoreError(_) => self.skipped_score_error += 1,
        }
    }

    /// Records that reached a terminal state
    pub fn processed(&self) -> u64 {
        self.published + self.skipped_incomplete + self.skipped_score_error
    }
}

/// Everything known once the pipeline has stopped
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub stats: PipelineStats,
    pub buffer: BufferStatus,
    pub publish: PublishReport,
}

impl RunSummary {
    pub fn log(&self) {
        let s = &self.stats;
        log::info!(
            "Run summary: ingested={} processed={} published={} outliers={} skipped_incomplete={} skipped_score_error={} ingest_errors={} evicted={}",
            s.ingested,
            s.processed(),
            s.published,
            s.outliers,
            s.skipped_incomplete,
            s.skipped_score_error,
            s.ingest_errors,
            s.evicted
        );
        log::info!(
            "  window: {}/{} ({:.0}% full, {} evicted)",
            self.buffer.current_size,
            self.buffer.capacity,
            self.buffer.fill_percent,
            self.buffer.evicted_total
        );
        for sink in [&self.publish.messages, &self.publish.series] {
            log::info!("  sink {}: delivered={} failed={}", sink.name, sink.delivered, sink.failed);
        }
    }
}
