//! Scorer doubles for tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::inference::{AnomalyScorer, Prediction, ScoreOutput};
use crate::logic::error::ScoringError;
use crate::logic::features::ScorerInput;

enum Behaviour {
    Fixed(ScoreOutput),
    /// Outlier when `|value - rolling_mean|` exceeds `cutoff`; the score is
    /// negative exactly then
    Deviation { cutoff: f64 },
    Fail,
    Sleep(Duration),
}

/// Configurable scorer that records every input it receives
pub struct StubScorer {
    behaviour: Behaviour,
    calls: AtomicUsize,
    finished: AtomicUsize,
    inputs: Mutex<Vec<ScorerInput>>,
}

impl StubScorer {
    fn with(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn fixed(prediction: Prediction, score: f64) -> Self {
        Self::with(Behaviour::Fixed(ScoreOutput { prediction, score }))
    }

    pub fn deviation(cutoff: f64) -> Self {
        Self::with(Behaviour::Deviation { cutoff })
    }

    pub fn failing() -> Self {
        Self::with(Behaviour::Fail)
    }

    pub fn sleeping(delay: Duration) -> Self {
        Self::with(Behaviour::Sleep(delay))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that have returned, including ones the caller gave up on
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<ScorerInput> {
        self.inputs.lock().clone()
    }
}

impl AnomalyScorer for StubScorer {
    fn name(&self) -> &str {
        "stub"
    }

    fn score(&self, input: &ScorerInput) -> Result<ScoreOutput, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().push(input.clone());

        let result = match &self.behaviour {
            Behaviour::Fixed(out) => Ok(*out),
            Behaviour::Deviation { cutoff } => {
                let value = input.get_by_name("value").unwrap_or_default();
                let mean = input.get_by_name("rolling_mean").unwrap_or_default();
                let score = cutoff - (value - mean).abs();
                let prediction = if score < 0.0 { Prediction::Outlier } else { Prediction::Inlier };
                Ok(ScoreOutput { prediction, score: score / cutoff })
            }
            Behaviour::Fail => Err(ScoringError::Inference("stub failure".to_string())),
            Behaviour::Sleep(delay) => {
                std::thread::sleep(*delay);
                Ok(ScoreOutput { prediction: Prediction::Inlier, score: 0.1 })
            }
        };
        self.finished.fetch_add(1, Ordering::SeqCst);
        result
    }
}
