//! Sink seams
//!
//! The publisher talks to two independent destinations. Both are traits so
//! transports can be swapped (Kafka / stdout, InfluxDB / test doubles).

use async_trait::async_trait;

use super::message::OutboundMessage;
use super::series::Point;
use crate::logic::error::SinkError;

/// Keyed message stream (Kafka topic, JSON lines on stdout)
#[async_trait]
pub trait MessageSink: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, message: &OutboundMessage) -> Result<(), SinkError>;

    /// Drain anything buffered by the transport
    async fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Time-series store
#[async_trait]
pub trait TimeSeriesSink: Send + Sync {
    fn name(&self) -> &str;

    async fn write(&self, point: &Point) -> Result<(), SinkError>;
}
