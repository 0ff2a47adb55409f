//! Model Module - anomaly scoring
//!
//! The pipeline only depends on the `AnomalyScorer` trait; the ONNX engine is
//! one implementation and tests use stubs.
//!
//! Timeouts cannot cancel a blocking inference. A timed-out ONNX call keeps
//! running and keeps holding the engine's session lock, so the calls behind
//! it queue on that lock and may time out as well. `EngineStatus` still
//! counts the call once it finishes.

pub mod guard;
pub mod inference;
pub mod threshold;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;
use std::time::Duration;

use crate::logic::error::ScoringError;
use crate::logic::features::ScorerInput;

// Re-export common types
pub use inference::{AnomalyScorer, OnnxScorer, Prediction, ScoreOutput};
pub use threshold::{OutlierRule, ThresholdedScorer};

/// Run a scorer on the blocking pool, bounded by `timeout`
///
/// A timed-out call is reported as a scoring failure; the blocking task is
/// left to finish on its own and still holds whatever the scorer locks until
/// then.
pub async fn score_with_timeout(
    scorer: Arc<dyn AnomalyScorer>,
    input: ScorerInput,
    timeout: Duration,
) -> Result<ScoreOutput, ScoringError> {
    let task = tokio::task::spawn_blocking(move || scorer.score(&input));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(ScoringError::Aborted(join_err.to_string())),
        Err(_) => Err(ScoringError::Timeout(timeout.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::testing::StubScorer;

    #[tokio::test]
    async fn test_timed_out_call_finishes_in_background() {
        let stub = Arc::new(StubScorer::sleeping(Duration::from_millis(300)));
        let input = ScorerInput::from_values([0.0; 7]);

        let result = score_with_timeout(stub.clone(), input, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(ScoringError::Timeout(20))));
        assert_eq!(stub.calls(), 1);
        assert_eq!(stub.finished(), 0);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        while stub.finished() == 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(stub.finished(), 1);
    }

    #[tokio::test]
    async fn test_fast_call_returns_output() {
        let stub = Arc::new(StubScorer::fixed(Prediction::Outlier, -0.3));
        let input = ScorerInput::from_values([0.0; 7]);

        let out = score_with_timeout(stub.clone(), input, Duration::from_secs(1)).await.unwrap();
        assert_eq!(out.prediction, Prediction::Outlier);
        assert_eq!(stub.finished(), 1);
    }
}
