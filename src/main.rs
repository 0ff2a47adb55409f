//! Taxi Anomaly Core - Main Entry Point
//!
//! Consumes raw demand records, scores each against the windowed history and
//! publishes the verdict to a message stream and a time-series store.

mod logic;
pub mod constants;

use std::sync::Arc;

use logic::config::{PipelineConfig, Transport};
use logic::error::InitError;
use logic::features::LayoutInfo;
use logic::ingest::{JsonLinesSource, RecordSource};
use logic::model::{OnnxScorer, ThresholdedScorer};
use logic::pipeline::Pipeline;
use logic::publish::influx::InfluxSink;
use logic::publish::stdio::JsonLinesSink;
use logic::publish::{MessageSink, PublishTargets, Publisher};

#[tokio::main]
async fn main() -> Result<(), InitError> {
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("LOG_LEVEL", "info"),
    )
    .init();

    log::info!("Starting {} v{}...", constants::APP_NAME, constants::APP_VERSION);

    if let Err(e) = start().await {
        log::error!("Startup failed: {}", e);
        return Err(e);
    }

    Ok(())
}

async fn start() -> Result<(), InitError> {
    let config = PipelineConfig::from_env()?;
    log::info!("Config: {}", config.summary());

    let layout = LayoutInfo::current();
    log::info!(
        "Feature layout v{} hash={:08x} width={} columns={:?}",
        layout.version,
        layout.hash,
        layout.feature_count,
        layout.feature_names
    );

    // Scorer
    let engine = Arc::new(OnnxScorer::load(&config.model_path, config.model_sha256.as_deref())?);
    let meta = engine.metadata();
    log::info!(
        "Model {} sha256={} loaded at {} (input '{}', outputs '{}'/'{}', layout v{} hash={:08x})",
        meta.model_path,
        meta.sha256,
        meta.loaded_at.to_rfc3339(),
        meta.input_name,
        meta.label_output,
        meta.score_output,
        meta.feature_version,
        meta.layout_hash
    );
    let scorer = ThresholdedScorer::wrap(engine.clone(), config.outlier_rule);

    // Sinks
    let series_sink = Arc::new(InfluxSink::new(config.influx.clone())?);
    if let Err(e) = series_sink.health_check().await {
        log::warn!("InfluxDB not reachable at {}: {} - writes will still be attempted per record", config.influx.url, e);
    }

    let (message_sink, mut source) = connect(&config)?;
    let publisher = Publisher::spawn(message_sink, series_sink, PublishTargets::from_config(&config));

    let pipeline = Pipeline::new(&config, scorer, publisher);
    let summary = pipeline.run(source.as_mut()).await;

    summary.log();
    let status = engine.status();
    log::info!(
        "Scorer: {} inferences, {} failures, avg {:.2} ms",
        status.inference_count,
        status.failure_count,
        status.avg_latency_ms
    );

    Ok(())
}

type Endpoints = (Arc<dyn MessageSink>, Box<dyn RecordSource>);

fn connect(config: &PipelineConfig) -> Result<Endpoints, InitError> {
    match config.transport {
        Transport::Stdio => Ok((
            Arc::new(JsonLinesSink::stdout(config.kafka.ml_topic.clone())),
            Box::new(JsonLinesSource::stdin()),
        )),
        #[cfg(feature = "kafka")]
        Transport::Kafka => Ok((
            Arc::new(logic::publish::kafka::KafkaMessageSink::new(&config.kafka)?),
            Box::new(logic::ingest::kafka::KafkaSource::new(&config.kafka)?),
        )),
        #[cfg(not(feature = "kafka"))]
        Transport::Kafka => Err(InitError::Config(
            "TRANSPORT=kafka requires the `kafka` feature".to_string(),
        )),
    }
}
