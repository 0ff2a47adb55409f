//! Error taxonomy
//!
//! Per-record errors (`IngestError`, `FeatureError`, `ScoringError`,
//! `SinkError`) are recoverable and only ever logged. `InitError` is the one
//! error that stops the service.

use thiserror::Error;

/// Upstream delivery or decoding failure for a single message
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("transport error: {0}")]
    Transport(String),
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::Malformed(err.to_string())
    }
}

/// A feature required by the scorer schema is not available yet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    #[error("window is empty")]
    EmptyWindow,

    #[error("feature '{0}' unavailable")]
    Incomplete(&'static str),
}

/// Scorer call failed; the record is skipped
#[derive(Debug, Clone, Error)]
pub enum ScoringError {
    #[error("scorer input rejected: {0}")]
    BadInput(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("scorer timed out after {0} ms")]
    Timeout(u64),

    #[error("scorer task aborted: {0}")]
    Aborted(String),
}

/// Publish failure on one sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server rejected write ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Serialize(err.to_string())
    }
}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        SinkError::Network(err.to_string())
    }
}

/// Startup failure; the process refuses to run
#[derive(Debug, Error)]
pub enum InitError {
    #[error("model not found: {0}")]
    ModelMissing(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("model checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("transport setup failed: {0}")]
    Transport(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
