//! Pipeline configuration
//!
//! Everything is read from environment variables (optionally seeded from a
//! `.env` file by `main`). Unparseable numbers fall back to the default with a
//! warning; values that would break an invariant are rejected by `validate`.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::constants;
use crate::logic::error::InitError;
use crate::logic::model::OutlierRule;

/// Where records come from and where scored messages go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// JSON lines on stdin / stdout
    Stdio,
    /// Kafka consumer + producer (feature `kafka`)
    Kafka,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Stdio => "stdio",
            Transport::Kafka => "kafka",
        }
    }

    fn default_for_build() -> Self {
        if cfg!(feature = "kafka") {
            Transport::Kafka
        } else {
            Transport::Stdio
        }
    }
}

impl FromStr for Transport {
    type Err = InitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stdio" => Ok(Transport::Stdio),
            "kafka" => Ok(Transport::Kafka),
            other => Err(InitError::Config(format!("unknown transport '{}'", other))),
        }
    }
}

/// Kafka connection settings
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub broker: String,
    pub input_topic: String,
    pub ml_topic: String,
    pub consumer_group: String,
}

/// InfluxDB v2 write settings
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub url: String,
    pub token: Option<String>,
    pub org: Option<String>,
    pub bucket: String,
    pub timeout_secs: u64,
}

/// Full service configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub transport: Transport,
    pub kafka: KafkaConfig,
    pub influx: InfluxConfig,

    /// Capacity of the history window
    pub buffer_size: usize,

    /// Scorer artifact
    pub model_path: String,
    pub model_sha256: Option<String>,
    pub outlier_rule: OutlierRule,
    pub scorer_timeout_ms: u64,

    /// Depth of each per-sink publish queue
    pub publish_queue_capacity: usize,

    /// Also write every raw record to the time-series sink
    pub mirror_raw: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default_for_build(),
            kafka: KafkaConfig {
                broker: constants::DEFAULT_KAFKA_BROKER.to_string(),
                input_topic: constants::DEFAULT_INPUT_TOPIC.to_string(),
                ml_topic: constants::DEFAULT_ML_TOPIC.to_string(),
                consumer_group: constants::DEFAULT_CONSUMER_GROUP.to_string(),
            },
            influx: InfluxConfig {
                url: constants::DEFAULT_INFLUX_URL.to_string(),
                token: None,
                org: None,
                bucket: constants::DEFAULT_INFLUX_BUCKET.to_string(),
                timeout_secs: constants::DEFAULT_INFLUX_TIMEOUT_SECS,
            },
            buffer_size: constants::DEFAULT_BUFFER_SIZE,
            model_path: constants::DEFAULT_MODEL_PATH.to_string(),
            model_sha256: None,
            outlier_rule: OutlierRule::ModelLabel,
            scorer_timeout_ms: constants::DEFAULT_SCORER_TIMEOUT_MS,
            publish_queue_capacity: constants::DEFAULT_PUBLISH_QUEUE_CAPACITY,
            mirror_raw: false,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, InitError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, InitError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let text = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let optional = |key: &str| -> Option<String> {
            lookup(key).filter(|v| !v.trim().is_empty())
        };

        let transport = match optional("TRANSPORT") {
            Some(raw) => raw.parse()?,
            None => defaults.transport,
        };

        let outlier_rule = match parse_opt::<f64, _>(&lookup, "SCORE_CUTOFF") {
            Some(cutoff) => OutlierRule::ScoreCutoff(cutoff),
            None => OutlierRule::ModelLabel,
        };

        let config = Self {
            transport,
            kafka: KafkaConfig {
                broker: text("KAFKA_BROKER", &defaults.kafka.broker),
                input_topic: text("KAFKA_INPUT_TOPIC", &defaults.kafka.input_topic),
                ml_topic: text("KAFKA_ML_TOPIC", &defaults.kafka.ml_topic),
                consumer_group: text("CONSUMER_GROUP", &defaults.kafka.consumer_group),
            },
            influx: InfluxConfig {
                url: text("INFLUX_URL", &defaults.influx.url),
                token: optional("INFLUX_TOKEN"),
                org: optional("INFLUX_ORG"),
                bucket: text("INFLUX_BUCKET", &defaults.influx.bucket),
                timeout_secs: parse_or(&lookup, "INFLUX_TIMEOUT_SECS", defaults.influx.timeout_secs),
            },
            buffer_size: parse_or(&lookup, "BUFFER_SIZE", defaults.buffer_size),
            model_path: text("MODEL_PATH", &defaults.model_path),
            model_sha256: optional("MODEL_SHA256").map(|s| s.trim().to_lowercase()),
            outlier_rule,
            scorer_timeout_ms: parse_or(&lookup, "SCORER_TIMEOUT_MS", defaults.scorer_timeout_ms),
            publish_queue_capacity: parse_or(
                &lookup,
                "PUBLISH_QUEUE_CAPACITY",
                defaults.publish_queue_capacity,
            ),
            mirror_raw: lookup("RAW_MIRROR_ENABLED")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.mirror_raw),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break pipeline invariants
    pub fn validate(&self) -> Result<(), InitError> {
        if self.buffer_size == 0 {
            return Err(InitError::Config("BUFFER_SIZE must be at least 1".to_string()));
        }
        if self.publish_queue_capacity == 0 {
            return Err(InitError::Config(
                "PUBLISH_QUEUE_CAPACITY must be at least 1".to_string(),
            ));
        }
        if self.scorer_timeout_ms == 0 {
            return Err(InitError::Config("SCORER_TIMEOUT_MS must be positive".to_string()));
        }
        if self.transport == Transport::Kafka && !cfg!(feature = "kafka") {
            return Err(InitError::Config(
                "TRANSPORT=kafka requires building with the `kafka` feature".to_string(),
            ));
        }
        Ok(())
    }

    pub fn scorer_timeout(&self) -> Duration {
        Duration::from_millis(self.scorer_timeout_ms)
    }

    /// Name of the untagged measurement
    pub fn raw_measurement(&self) -> String {
        format!("{}{}", self.kafka.ml_topic, constants::RAW_MEASUREMENT_SUFFIX)
    }

    /// One-line summary for the startup log (no secrets)
    pub fn summary(&self) -> String {
        format!(
            "transport={} input={} output={} group={} influx={}/{} buffer={} model={} rule={:?}",
            self.transport.as_str(),
            self.kafka.input_topic,
            self.kafka.ml_topic,
            self.kafka.consumer_group,
            self.influx.url,
            self.influx.bucket,
            self.buffer_size,
            self.model_path,
            self.outlier_rule,
        )
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("Ignoring invalid {}='{}', using default", key, raw);
                default
            }
        },
        _ => default,
    }
}

fn parse_opt<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    if raw.trim().is_empty() {
        return None;
    }
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring invalid {}='{}'", key, raw);
            None
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    let s = raw.trim().to_lowercase();
    s == "true" || s == "1" || s == "yes"
}
