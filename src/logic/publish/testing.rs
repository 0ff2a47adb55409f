//! Sink doubles for tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::message::OutboundMessage;
use super::series::Point;
use super::sink::{MessageSink, TimeSeriesSink};
use crate::logic::error::SinkError;

/// Records every message; optionally fails the first `fail_first` sends
#[derive(Default)]
pub struct MemoryMessageSink {
    messages: Mutex<Vec<OutboundMessage>>,
    fail_first: AtomicUsize,
}

impl MemoryMessageSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_first(n: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_first: AtomicUsize::new(n),
            ..Self::default()
        })
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl MessageSink for MemoryMessageSink {
    fn name(&self) -> &str {
        "memory-messages"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), SinkError> {
        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(SinkError::Network("broker unavailable".to_string()));
        }
        self.messages.lock().push(message.clone());
        Ok(())
    }
}

/// Records every point; optionally fails the first `fail_first` writes
#[derive(Default)]
pub struct MemorySeriesSink {
    points: Mutex<Vec<Point>>,
    fail_first: AtomicUsize,
}

impl MemorySeriesSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_first(n: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_first: AtomicUsize::new(n),
            ..Self::default()
        })
    }

    pub fn points(&self) -> Vec<Point> {
        self.points.lock().clone()
    }
}

#[async_trait]
impl TimeSeriesSink for MemorySeriesSink {
    fn name(&self) -> &str {
        "memory-series"
    }

    async fn write(&self, point: &Point) -> Result<(), SinkError> {
        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(SinkError::Rejected {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.points.lock().push(point.clone());
        Ok(())
    }
}
