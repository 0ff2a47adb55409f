//! InfluxDB v2 writer
//!
//! HTTP client for the `/api/v2/write` endpoint. One point per request,
//! line protocol body, millisecond precision.

use std::time::Duration;

use async_trait::async_trait;

use super::series::Point;
use super::sink::TimeSeriesSink;
use crate::logic::config::InfluxConfig;
use crate::logic::error::{InitError, SinkError};

pub struct InfluxSink {
    config: InfluxConfig,
    write_url: String,
    http_client: reqwest::Client,
}

impl InfluxSink {
    pub fn new(config: InfluxConfig) -> Result<Self, InitError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InitError::Transport(format!("failed to create HTTP client: {}", e)))?;

        let write_url = format!("{}/api/v2/write", config.url.trim_end_matches('/'));

        Ok(Self {
            config,
            write_url,
            http_client,
        })
    }

    /// Query parameters of every write request
    fn query(&self) -> Vec<(&'static str, &str)> {
        let mut params = vec![("bucket", self.config.bucket.as_str()), ("precision", "ms")];
        if let Some(org) = self.config.org.as_deref() {
            params.push(("org", org));
        }
        params
    }

    /// Check server health
    pub async fn health_check(&self) -> Result<(), SinkError> {
        let url = format!("{}/health", self.config.url.trim_end_matches('/'));
        let response = self.http_client.get(&url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(SinkError::Rejected {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

#[async_trait]
impl TimeSeriesSink for InfluxSink {
    fn name(&self) -> &str {
        "influxdb"
    }

    async fn write(&self, point: &Point) -> Result<(), SinkError> {
        let body = point
            .to_line_protocol()
            .ok_or_else(|| SinkError::Other(format!("point '{}' has no fields", point.measurement)))?;

        let mut request = self
            .http_client
            .post(&self.write_url)
            .query(&self.query())
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body);

        if let Some(token) = self.config.token.as_deref() {
            request = request.header("Authorization", format!("Token {}", token));
        }

        let response = request.send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(SinkError::Rejected { status, body })
        }
    }
}
