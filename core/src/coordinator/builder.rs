//! Builder pattern for Coordinator construction

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::FloodConfig;
use crate::error::FloodResult;
use crate::record::AttemptRecord;
use crate::target::{Target, TcpTarget};

use super::executor::Coordinator;

/// Attempt records buffered before `try_send` starts dropping them
const RECORDS_BUFFER: usize = 10_000;

/// Builder for creating a Coordinator with validated configuration
///
/// # Example
///
/// ```ignore
/// let (mut coordinator, records) = CoordinatorBuilder::new()
///     .target_host("127.0.0.1")
///     .target_port(8080)
///     .worker_count(10)
///     .build()?;
///
/// coordinator.start()?;
/// // ...
/// let summary = coordinator.stop().await;
/// ```
pub struct CoordinatorBuilder {
    config: FloodConfig,
    target: Option<Arc<dyn Target>>,
}

impl CoordinatorBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: FloodConfig::default(),
            target: None,
        }
    }

    /// Set the full flood configuration
    pub fn config(mut self, config: FloodConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the target host
    pub fn target_host(mut self, host: impl Into<String>) -> Self {
        self.config.target_host = host.into();
        self
    }

    /// Set the target port
    pub fn target_port(mut self, port: u16) -> Self {
        self.config.target_port = port;
        self
    }

    /// Set the number of workers
    pub fn worker_count(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    /// Replace the TCP target, e.g. with a mock in tests
    pub fn target(mut self, target: Arc<dyn Target>) -> Self {
        self.target = Some(target);
        self
    }

    /// Build the coordinator and return it along with the attempt record receiver
    ///
    /// The receiver may be dropped if records are not wanted.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn build(self) -> FloodResult<(Coordinator, mpsc::Receiver<AttemptRecord>)> {
        self.config.validate()?;

        let target = self
            .target
            .unwrap_or_else(|| Arc::new(TcpTarget::from_config(&self.config)));

        let (records_tx, records_rx) = mpsc::channel(RECORDS_BUFFER);

        let coordinator = Coordinator::new(self.config, target, records_tx);

        Ok((coordinator, records_rx))
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
