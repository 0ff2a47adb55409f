//! JSON lines message sink
//!
//! Writes `{"key", "timestamp_ms", "payload"}` objects, one per line. Used
//! when the service runs without a broker (stdin in, stdout out).

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use super::message::OutboundMessage;
use super::sink::MessageSink;
use crate::logic::error::SinkError;

#[derive(Serialize)]
struct Envelope<'a> {
    topic: &'a str,
    key: &'a str,
    timestamp_ms: i64,
    payload: serde_json::Value,
}

pub struct JsonLinesSink<W> {
    topic: String,
    writer: Mutex<W>,
}

impl JsonLinesSink<tokio::io::Stdout> {
    pub fn stdout(topic: impl Into<String>) -> Self {
        Self::new(topic, tokio::io::stdout())
    }
}

impl<W> JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(topic: impl Into<String>, writer: W) -> Self {
        Self {
            topic: topic.into(),
            writer: Mutex::new(writer),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> MessageSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &str {
        "stdout"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), SinkError> {
        let envelope = Envelope {
            topic: &self.topic,
            key: &message.key,
            timestamp_ms: message.timestamp_ms,
            payload: serde_json::from_slice(&message.payload)?,
        };
        let mut line = serde_json::to_vec(&envelope)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), SinkError> {
        self.writer.lock().await.flush().await?;
        Ok(())
    }
}
