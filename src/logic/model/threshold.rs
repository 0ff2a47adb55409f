//! Outlier decision rule
//!
//! The model's own label reflects the contamination rate it was fit with.
//! Operators may instead flag by score cutoff; the rule is applied as a scorer
//! decorator so downstream code only ever reads `ScoreOutput::prediction`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::inference::{AnomalyScorer, Prediction, ScoreOutput};
use crate::logic::error::ScoringError;
use crate::logic::features::ScorerInput;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum OutlierRule {
    /// Keep the model's prediction
    #[default]
    ModelLabel,
    /// Outlier iff `score < cutoff`
    ScoreCutoff(f64),
}

impl OutlierRule {
    pub fn apply(&self, output: ScoreOutput) -> ScoreOutput {
        match *self {
            OutlierRule::ModelLabel => output,
            OutlierRule::ScoreCutoff(cutoff) => ScoreOutput {
                prediction: if output.score < cutoff {
                    Prediction::Outlier
                } else {
                    Prediction::Inlier
                },
                score: output.score,
            },
        }
    }
}

/// Scorer decorator applying an `OutlierRule`
pub struct ThresholdedScorer {
    inner: Arc<dyn AnomalyScorer>,
    rule: OutlierRule,
}

impl ThresholdedScorer {
    pub fn new(inner: Arc<dyn AnomalyScorer>, rule: OutlierRule) -> Self {
        Self { inner, rule }
    }

    /// Skip the wrapper when it would be a no-op
    pub fn wrap(inner: Arc<dyn AnomalyScorer>, rule: OutlierRule) -> Arc<dyn AnomalyScorer> {
        match rule {
            OutlierRule::ModelLabel => inner,
            rule => Arc::new(Self::new(inner, rule)),
        }
    }
}

impl AnomalyScorer for ThresholdedScorer {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn score(&self, input: &ScorerInput) -> Result<ScoreOutput, ScoringError> {
        self.inner.score(input).map(|out| self.rule.apply(out))
    }
}
