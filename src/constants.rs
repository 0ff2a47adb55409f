//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Environment lookups live in `logic::config`; this file only holds values.

/// Default Kafka bootstrap address
pub const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Topic carrying raw `{timestamp, value}` records
pub const DEFAULT_INPUT_TOPIC: &str = "event-frames-model";

/// Topic receiving scored records (also the time-series measurement name)
pub const DEFAULT_ML_TOPIC: &str = "taxi-demand-anomalies";

/// Consumer group of the scoring service
pub const DEFAULT_CONSUMER_GROUP: &str = "taxi-anomaly-detector";

/// Default InfluxDB endpoint
pub const DEFAULT_INFLUX_URL: &str = "http://localhost:8086";

/// Default InfluxDB bucket
pub const DEFAULT_INFLUX_BUCKET: &str = "iot_data";

/// HTTP timeout for time-series writes (seconds)
pub const DEFAULT_INFLUX_TIMEOUT_SECS: u64 = 10;

/// Number of raw records kept in the history window
pub const DEFAULT_BUFFER_SIZE: usize = 20;

/// Trailing window used by `rolling_mean`
pub const ROLLING_WINDOW: usize = 7;

/// Default scorer artifact location
pub const DEFAULT_MODEL_PATH: &str = "isolation_forest_model.onnx";

/// Upper bound for a single scorer call (milliseconds)
pub const DEFAULT_SCORER_TIMEOUT_MS: u64 = 1_000;

/// Per-sink publish queue depth
pub const DEFAULT_PUBLISH_QUEUE_CAPACITY: usize = 256;

/// Suffix of the untagged time-series measurement
pub const RAW_MEASUREMENT_SUFFIX: &str = "_DATA";

/// Text format used for timestamps leaving the service
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Taxi Anomaly Core";
