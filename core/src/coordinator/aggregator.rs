//! Result aggregation from multiple workers

use std::time::Duration;

use serde::Serialize;

use crate::worker::WorkerStats;

/// Pool-wide totals, produced when the pool is stopped
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregatedStats {
    /// Number of workers that reported stats
    pub total_workers: usize,

    /// Workers whose task panicked instead of reporting
    pub lost_workers: usize,

    /// Payloads fully delivered
    pub total_completed: usize,

    /// Failed attempts
    pub total_failures: usize,

    /// Failed attempts caused by a deadline
    pub total_timeouts: usize,

    /// Payload bytes written
    pub total_bytes_sent: u64,

    /// Maximum duration across all workers
    pub total_duration: Duration,

    /// Attempts per second over `total_duration`
    pub attempts_per_second: f64,

    /// Bytes per second over `total_duration`
    pub bytes_per_second: f64,
}

impl AggregatedStats {
    /// Total attempts (completed + failures)
    pub fn total_attempts(&self) -> usize {
        self.total_completed + self.total_failures
    }

    /// Success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        let total = self.total_attempts();
        if total > 0 {
            self.total_completed as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Aggregate statistics from multiple workers
pub fn aggregate_worker_stats(stats: &[WorkerStats]) -> AggregatedStats {
    if stats.is_empty() {
        return AggregatedStats::default();
    }

    let total_completed: usize = stats.iter().map(|s| s.completed).sum();
    let total_failures: usize = stats.iter().map(|s| s.failures).sum();
    let total_timeouts: usize = stats.iter().map(|s| s.timeouts).sum();
    let total_bytes_sent: u64 = stats.iter().map(|s| s.bytes_sent).sum();

    // Use the maximum elapsed time across all workers
    let total_duration = stats
        .iter()
        .filter_map(|s| s.elapsed())
        .max()
        .unwrap_or(Duration::ZERO);

    let secs = total_duration.as_secs_f64();
    let rate_multiplier = if secs > 0.0 { 1.0 / secs } else { 0.0 };

    AggregatedStats {
        total_workers: stats.len(),
        lost_workers: 0,
        total_completed,
        total_failures,
        total_timeouts,
        total_bytes_sent,
        total_duration,
        attempts_per_second: (total_completed + total_failures) as f64 * rate_multiplier,
        bytes_per_second: total_bytes_sent as f64 * rate_multiplier,
    }
}
