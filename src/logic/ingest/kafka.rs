//! Kafka source (feature `kafka`)

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;

use super::RecordSource;
use crate::logic::config::KafkaConfig;
use crate::logic::error::{IngestError, InitError};
use crate::logic::record::RawRecord;

pub struct KafkaSource {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaSource {
    pub fn new(config: &KafkaConfig) -> Result<Self, InitError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.broker)
            .set("group.id", &config.consumer_group)
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "true")
            .create()
            .map_err(|e| InitError::Transport(format!("kafka consumer: {}", e)))?;

        consumer
            .subscribe(&[config.input_topic.as_str()])
            .map_err(|e| InitError::Transport(format!("subscribe {}: {}", config.input_topic, e)))?;

        log::info!(
            "Kafka consumer subscribed: {} @ {} (group {})",
            config.input_topic,
            config.broker,
            config.consumer_group
        );

        Ok(Self {
            consumer,
            topic: config.input_topic.clone(),
        })
    }
}

#[async_trait]
impl RecordSource for KafkaSource {
    fn name(&self) -> &str {
        &self.topic
    }

    async fn next_record(&mut self) -> Option<Result<RawRecord, IngestError>> {
        let result = match self.consumer.recv().await {
            Ok(message) => match message.payload() {
                Some(payload) => RawRecord::from_json(payload),
                None => Err(IngestError::Malformed(format!(
                    "empty payload at offset {}",
                    message.offset()
                ))),
            },
            Err(e) => Err(IngestError::Transport(e.to_string())),
        };
        Some(result)
    }
}
