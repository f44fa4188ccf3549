//! Per-attempt records streamed from workers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AttemptError;

/// How a single attempt ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum AttemptOutcome {
    /// Payload fully written
    Delivered,
    /// Connect or send failed
    Failed {
        /// Failure class ("connect", "send_timeout", ...)
        kind: String,
        /// Error detail
        message: String,
    },
}

impl AttemptOutcome {
    /// Build a failed outcome from an attempt error
    pub fn failed(err: &AttemptError) -> Self {
        Self::Failed {
            kind: err.label().to_string(),
            message: err.to_string(),
        }
    }

    /// Whether the payload was delivered
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// One connect-and-send attempt, as seen by the worker that made it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Worker that made the attempt
    pub worker_id: usize,
    /// Result of the attempt
    pub outcome: AttemptOutcome,
    /// Bytes written (0 on failure)
    pub bytes_sent: usize,
    /// Connect + send wall time in milliseconds
    pub elapsed_ms: f64,
    /// When the attempt finished
    pub timestamp: DateTime<Utc>,
}
