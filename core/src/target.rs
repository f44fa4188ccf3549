//! Delivery targets
//!
//! A [`Target`] performs one complete round-trip for a worker: open a
//! connection, push the payload, close. [`TcpTarget`] is the real network
//! implementation; tests substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::FloodConfig;
use crate::error::AttemptError;
use crate::payload::PayloadGenerator;

/// Endpoint that workers deliver payloads to
#[async_trait]
pub trait Target: Send + Sync {
    /// Human-readable endpoint label (e.g. "127.0.0.1:8080")
    fn name(&self) -> &str;

    /// Deliver one payload over a fresh connection
    ///
    /// Implementations draw the payload from `payload` only once the
    /// connection is up. Returns the number of bytes written.
    async fn deliver(&self, payload: &mut PayloadGenerator) -> Result<usize, AttemptError>;
}

/// Raw TCP target: connect, write everything, half-close, drop
#[derive(Debug, Clone)]
pub struct TcpTarget {
    host: String,
    port: u16,
    label: String,
    connect_timeout: Option<Duration>,
    send_timeout: Option<Duration>,
}

impl TcpTarget {
    /// Create a target with no deadlines
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let label = format!("{host}:{port}");
        Self {
            host,
            port,
            label,
            connect_timeout: None,
            send_timeout: None,
        }
    }

    /// Build a target from a flood configuration
    pub fn from_config(config: &FloodConfig) -> Self {
        Self::new(config.target_host.clone(), config.target_port)
            .with_connect_timeout(config.connect_timeout())
            .with_send_timeout(config.send_timeout())
    }

    /// Bound the connect phase
    pub fn with_connect_timeout(mut self, limit: Option<Duration>) -> Self {
        self.connect_timeout = limit;
        self
    }

    /// Bound the write phase
    pub fn with_send_timeout(mut self, limit: Option<Duration>) -> Self {
        self.send_timeout = limit;
        self
    }

    async fn connect(&self) -> Result<TcpStream, AttemptError> {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        match self.connect_timeout {
            Some(limit) => timeout(limit, connect)
                .await
                .map_err(|_| AttemptError::ConnectTimeout(limit))?,
            None => connect.await,
        }
        .map_err(AttemptError::Connect)
    }
}

#[async_trait]
impl Target for TcpTarget {
    fn name(&self) -> &str {
        &self.label
    }

    async fn deliver(&self, payload: &mut PayloadGenerator) -> Result<usize, AttemptError> {
        let mut stream = self.connect().await?;

        let bytes = payload.fill();
        let write = stream.write_all(bytes);
        match self.send_timeout {
            Some(limit) => timeout(limit, write)
                .await
                .map_err(|_| AttemptError::SendTimeout(limit))?,
            None => write.await,
        }
        .map_err(AttemptError::Send)?;

        // The payload is already written; a failed FIN is not a failed attempt.
        if let Err(e) = stream.shutdown().await {
            tracing::trace!(endpoint = %self.label, error = %e, "shutdown after send failed");
        }

        Ok(bytes.len())
    }
}
