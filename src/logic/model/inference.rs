//! Inference Engine - ONNX Runtime Integration
//!
//! The scorer artifact is an IsolationForest exported to ONNX: one float
//! input of shape `[N, FEATURE_COUNT]`, a `label` output (-1 outlier, 1
//! inlier) and a `scores` output carrying the decision function (negative =
//! anomalous).

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::guard;
use crate::logic::error::{InitError, ScoringError};
use crate::logic::features::layout::{layout_hash, FEATURE_COUNT, FEATURE_VERSION};
use crate::logic::features::ScorerInput;

// ============================================================================
// SCORER CONTRACT
// ============================================================================

/// Raw model decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prediction {
    Inlier,
    Outlier,
}

impl Prediction {
    /// Map a scikit-learn style label (-1 = outlier)
    pub fn from_label(label: i64) -> Self {
        if label == -1 {
            Prediction::Outlier
        } else {
            Prediction::Inlier
        }
    }

    pub fn is_outlier(&self) -> bool {
        matches!(self, Prediction::Outlier)
    }
}

/// Scorer output for one record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutput {
    pub prediction: Prediction,
    /// Signed decision value, more negative = more anomalous
    pub score: f64,
}

/// Anything that scores a fixed-schema feature vector
///
/// Implementations must be deterministic for a fixed artifact and input.
pub trait AnomalyScorer: Send + Sync {
    fn name(&self) -> &str;

    fn score(&self, input: &ScorerInput) -> Result<ScoreOutput, ScoringError>;
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Model metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_path: String,
    pub sha256: String,
    pub input_name: String,
    pub label_output: String,
    pub score_output: String,
    pub feature_version: u8,
    pub layout_hash: u32,
    pub loaded_at: DateTime<Utc>,
}

/// Engine status for logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub model_name: String,
    pub inference_device: String,
    pub avg_latency_ms: f32,
    pub inference_count: u64,
    pub failure_count: u64,
}

// ============================================================================
// ONNX IMPLEMENTATION
// ============================================================================

pub struct OnnxScorer {
    session: Mutex<Session>,
    metadata: ModelMetadata,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
    failure_count: AtomicU64,
}

impl OnnxScorer {
    /// Load the artifact; every failure here is fatal for the service
    pub fn load(model_path: &str, expected_sha256: Option<&str>) -> Result<Self, InitError> {
        log::info!("Loading ONNX model from: {}", model_path);

        if !Path::new(model_path).exists() {
            return Err(InitError::ModelMissing(model_path.to_string()));
        }

        let sha256 = guard::verify_model_checksum(model_path, expected_sha256)?;

        let session = Session::builder()
            .map_err(|e| InitError::ModelLoad(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InitError::ModelLoad(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| InitError::ModelLoad(format!("Failed to load model: {}", e)))?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| InitError::ModelLoad("model declares no inputs".to_string()))?;
        let input_name = input.name.clone();
        let input_width = input.input_type.tensor_shape().and_then(|shape| shape.last().copied());
        check_input_width(input_width)?;

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let (label_output, score_output) = match output_names.as_slice() {
            [label, score, ..] => (label.clone(), score.clone()),
            _ => {
                return Err(InitError::ModelLoad(format!(
                    "expected label and score outputs, found {:?}",
                    output_names
                )))
            }
        };

        let metadata = ModelMetadata {
            model_path: model_path.to_string(),
            sha256,
            input_name,
            label_output,
            score_output,
            feature_version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            loaded_at: Utc::now(),
        };

        log::info!(
            "ONNX model loaded: input={} outputs=[{}, {}] sha256={}",
            metadata.input_name,
            metadata.label_output,
            metadata.score_output,
            &metadata.sha256[..metadata.sha256.len().min(12)]
        );

        Ok(Self {
            session: Mutex::new(session),
            metadata,
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
        })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn status(&self) -> EngineStatus {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        EngineStatus {
            model_name: self.metadata.model_path.clone(),
            inference_device: "ONNX Runtime (CPU)".to_string(),
            avg_latency_ms: avg,
            inference_count: count,
            failure_count: self.failure_count.load(Ordering::Relaxed),
        }
    }

    fn run(&self, input: &ScorerInput) -> Result<ScoreOutput, ScoringError> {
        let input_array = Array2::<f32>::from_shape_vec((1, FEATURE_COUNT), input.to_f32().to_vec())
            .map_err(|e| ScoringError::BadInput(format!("Array error: {}", e)))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| ScoringError::BadInput(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| ScoringError::Inference(format!("Inference failed: {}", e)))?;

        let label = outputs
            .get(self.metadata.label_output.as_str())
            .ok_or_else(|| ScoringError::Inference("No label output".to_string()))?
            .try_extract_tensor::<i64>()
            .map_err(|e| ScoringError::Inference(format!("Label extract error: {}", e)))?
            .1
            .first()
            .copied()
            .ok_or_else(|| ScoringError::Inference("Empty label output".to_string()))?;

        let score = outputs
            .get(self.metadata.score_output.as_str())
            .ok_or_else(|| ScoringError::Inference("No score output".to_string()))?
            .try_extract_tensor::<f32>()
            .map_err(|e| ScoringError::Inference(format!("Score extract error: {}", e)))?
            .1
            .first()
            .copied()
            .ok_or_else(|| ScoringError::Inference("Empty score output".to_string()))?;

        Ok(ScoreOutput {
            prediction: Prediction::from_label(label),
            score: score as f64,
        })
    }
}

/// Reject a model whose declared feature width differs from the layout
///
/// Dynamic (`-1`) or undeclared widths are accepted; the first inference
/// reports them instead.
fn check_input_width(declared: Option<i64>) -> Result<(), InitError> {
    match declared {
        Some(width) if width >= 0 && width as usize != FEATURE_COUNT => Err(InitError::ModelLoad(format!(
            "model expects {} input features, layout v{} has {}",
            width, FEATURE_VERSION, FEATURE_COUNT
        ))),
        _ => Ok(()),
    }
}

impl AnomalyScorer for OnnxScorer {
    fn name(&self) -> &str {
        "onnx"
    }

    fn score(&self, input: &ScorerInput) -> Result<ScoreOutput, ScoringError> {
        if !input.is_finite() {
            return Err(ScoringError::BadInput("non-finite feature value".to_string()));
        }

        let start_time = Instant::now();
        let result = self.run(input);

        self.latency_sum_us
            .fetch_add(start_time.elapsed().as_micros() as u64, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        if result.is_err() {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
        }

        result
    }
}
