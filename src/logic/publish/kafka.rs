//! Kafka message sink (feature `kafka`)

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;

use super::message::OutboundMessage;
use super::sink::MessageSink;
use crate::logic::config::KafkaConfig;
use crate::logic::error::{InitError, SinkError};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct KafkaMessageSink {
    producer: FutureProducer,
    topic: String,
}

impl KafkaMessageSink {
    pub fn new(config: &KafkaConfig) -> Result<Self, InitError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.broker)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| InitError::Transport(format!("kafka producer: {}", e)))?;

        log::info!("Kafka producer ready: {} -> {}", config.broker, config.ml_topic);

        Ok(Self {
            producer,
            topic: config.ml_topic.clone(),
        })
    }
}

#[async_trait]
impl MessageSink for KafkaMessageSink {
    fn name(&self) -> &str {
        "kafka"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), SinkError> {
        let record = FutureRecord::to(&self.topic)
            .key(&message.key)
            .payload(&message.payload)
            .timestamp(message.timestamp_ms);

        self.producer
            .send(record, Timeout::After(DELIVERY_TIMEOUT))
            .await
            .map(|_| ())
            .map_err(|(err, _)| SinkError::Network(err.to_string()))
    }

    async fn flush(&self) -> Result<(), SinkError> {
        self.producer
            .flush(Timeout::After(DELIVERY_TIMEOUT))
            .map_err(|e| SinkError::Network(e.to_string()))
    }
}
