//! Worker statistics tracking

use std::time::Instant;

use crate::error::AttemptError;

/// Statistics tracked by each worker
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    /// Worker that produced these stats
    pub worker_id: usize,

    /// Payloads fully delivered
    pub completed: usize,

    /// Attempts that failed to connect or send
    pub failures: usize,

    /// Failures caused by a deadline (subset of `failures`)
    pub timeouts: usize,

    /// Total payload bytes written
    pub bytes_sent: u64,

    /// Worker start time
    pub started_at: Option<Instant>,

    /// Worker end time
    pub ended_at: Option<Instant>,
}

impl WorkerStats {
    /// Create new empty stats for a worker
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Default::default()
        }
    }

    /// Start tracking (records start time)
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time)
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Total attempts (completed + failures)
    pub fn attempts(&self) -> usize {
        self.completed + self.failures
    }

    /// Success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.attempts() == 0 {
            0.0
        } else {
            self.completed as f64 / self.attempts() as f64
        }
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Option<std::time::Duration> {
        self.started_at.map(|start| {
            self.ended_at
                .map(|end| end.duration_since(start))
                .unwrap_or_else(|| start.elapsed())
        })
    }

    /// Record a delivered payload
    pub fn record_success(&mut self, bytes: usize) {
        self.completed += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Record a failed attempt
    pub fn record_failure(&mut self, err: &AttemptError) {
        self.failures += 1;
        if err.is_timeout() {
            self.timeouts += 1;
        }
    }
}
