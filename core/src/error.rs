//! Error types for flood-bench-core

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

/// Core error type
#[derive(Error, Debug)]
pub enum FloodError {
    /// Configuration rejected before any worker was launched
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A required builder field was never set
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// `start()` called on a pool that is already running
    #[error("worker pool is already running")]
    AlreadyRunning,
}

impl FloodError {
    /// Shorthand for a missing builder field
    pub fn missing_config(field: &'static str) -> Self {
        Self::MissingConfig(field)
    }
}

/// Result type alias
pub type FloodResult<T> = std::result::Result<T, FloodError>;

/// Failure of a single connect-and-send attempt
///
/// These never leave the worker that produced them: they are logged,
/// counted and the loop carries on.
#[derive(Error, Debug)]
pub enum AttemptError {
    /// Connection refused, unreachable, reset during handshake, DNS failure
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    /// Connect did not complete within the configured deadline
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Write failed after the connection was established
    #[error("send failed: {0}")]
    Send(#[source] std::io::Error),

    /// Write did not complete within the configured deadline
    #[error("send timed out after {0:?}")]
    SendTimeout(Duration),
}

impl AttemptError {
    /// Whether the attempt failed by exceeding a deadline
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::ConnectTimeout(_) | Self::SendTimeout(_) => true,
            Self::Connect(e) | Self::Send(e) => e.kind() == std::io::ErrorKind::TimedOut,
        }
    }

    /// Short label used in attempt records
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::ConnectTimeout(_) => "connect_timeout",
            Self::Send(_) => "send",
            Self::SendTimeout(_) => "send_timeout",
        }
    }
}
