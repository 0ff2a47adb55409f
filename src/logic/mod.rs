//! Logic Module - Streaming anomaly scoring
//!
//! ## Architecture
//! - `ingest/` - Record sources (stdin JSON lines, Kafka)
//! - `window` - Bounded history of raw records
//! - `features/` - Feature derivation and the versioned scorer layout
//! - `model/` - Scorer trait, ONNX engine, outlier rule
//! - `publish/` - Message + time-series fan-out
//! - `pipeline/` - Per-record coordinator

// Core types
pub mod config;
pub mod error;
pub mod record;
pub mod window;

// Processing stages
pub mod features;
pub mod ingest;
pub mod model;
pub mod pipeline;
pub mod publish;
