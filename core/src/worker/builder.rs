//! Builder pattern for Worker construction

use crate::config::DelayRange;
use crate::error::{FloodError, FloodResult};
use crate::payload::PayloadGenerator;
use crate::record::AttemptRecord;
use crate::target::Target;

use super::executor::Worker;
use super::rate_limiter::AttemptRateLimiter;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Builder for creating Worker instances
///
/// Only the target is required; pacing and payload size fall back to the
/// same defaults as [`FloodConfig`](crate::config::FloodConfig).
///
/// # Example
/// ```ignore
/// let worker = WorkerBuilder::new(0)
///     .target(target)
///     .payload_size(100 * 1024)
///     .delays(DelayRange::new(0.1, 0.5), DelayRange::new(0.5, 1.5))
///     .seed(42)
///     .build()?;
/// ```
pub struct WorkerBuilder {
    id: usize,
    target: Option<Arc<dyn Target>>,
    rate_limiter: Option<Arc<AttemptRateLimiter>>,
    payload_size: usize,
    post_success_delay: DelayRange,
    per_iteration_delay: DelayRange,
    interruptible: bool,
    rng: Option<StdRng>,
    records_tx: Option<mpsc::Sender<AttemptRecord>>,
}

impl WorkerBuilder {
    /// Create a new builder with the given worker ID
    pub fn new(id: usize) -> Self {
        Self {
            id,
            target: None,
            rate_limiter: None,
            payload_size: 100 * 1024,
            post_success_delay: DelayRange::new(0.1, 0.5),
            per_iteration_delay: DelayRange::new(0.5, 1.5),
            interruptible: true,
            rng: None,
            records_tx: None,
        }
    }

    /// Set the delivery target
    pub fn target(mut self, target: Arc<dyn Target>) -> Self {
        self.target = Some(target);
        self
    }

    /// Share a pool-wide rate limiter
    pub fn rate_limiter(mut self, limiter: Arc<AttemptRateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Set the payload size in bytes
    pub fn payload_size(mut self, bytes: usize) -> Self {
        self.payload_size = bytes;
        self
    }

    /// Set the post-success and per-iteration pauses
    pub fn delays(mut self, post_success: DelayRange, per_iteration: DelayRange) -> Self {
        self.post_success_delay = post_success;
        self.per_iteration_delay = per_iteration;
        self
    }

    /// Interrupt in-flight waits on stop (default) or only check between iterations
    pub fn interruptible(mut self, interruptible: bool) -> Self {
        self.interruptible = interruptible;
        self
    }

    /// Use a deterministic generator
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    /// Inject a generator directly
    pub fn rng(mut self, rng: StdRng) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Stream attempt records to `tx`
    pub fn records_tx(mut self, tx: mpsc::Sender<AttemptRecord>) -> Self {
        self.records_tx = Some(tx);
        self
    }

    /// Build the Worker
    ///
    /// # Errors
    /// Returns an error if the target is missing or a delay range is invalid.
    pub fn build(self) -> FloodResult<Worker> {
        let target = self.target.ok_or(FloodError::missing_config("target"))?;
        self.post_success_delay
            .validate("post_success_delay")
            .and_then(|_| self.per_iteration_delay.validate("per_iteration_delay"))
            .map_err(FloodError::from)?;

        let rate_limiter = self
            .rate_limiter
            .unwrap_or_else(|| Arc::new(AttemptRateLimiter::unlimited()));
        let mut rng = self.rng.unwrap_or_else(StdRng::from_entropy);
        // Payload bytes get their own stream, derived so seeding still covers both
        let payload_rng = StdRng::seed_from_u64(rng.gen());

        let mut worker = Worker::new(
            self.id,
            target,
            rate_limiter,
            PayloadGenerator::new(self.payload_size, payload_rng),
            self.post_success_delay,
            self.per_iteration_delay,
            self.interruptible,
            rng,
        );

        if let Some(tx) = self.records_tx {
            worker = worker.with_records(tx);
        }

        Ok(worker)
    }
}
