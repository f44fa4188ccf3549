//! Worker execution loop

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use tokio::sync::mpsc;

use crate::config::DelayRange;
use crate::payload::PayloadGenerator;
use crate::record::{AttemptOutcome, AttemptRecord};
use crate::signal::RunningSignal;
use crate::target::Target;

use super::rate_limiter::AttemptRateLimiter;
use super::stats::WorkerStats;

/// Worker runs the loop: connect -> send -> pause -> repeat
///
/// Workers are independent tokio tasks managed by the Coordinator. They share
/// the target and rate limiter via Arc; everything else (generator, payload
/// buffer, stats) is owned.
pub struct Worker {
    /// Worker identifier, `0..worker_count`
    id: usize,

    /// Where payloads go (shared across workers)
    target: Arc<dyn Target>,

    /// Global attempt pacing (shared across workers)
    rate_limiter: Arc<AttemptRateLimiter>,

    /// Payload buffer, refilled by the target once connected
    payload: PayloadGenerator,

    /// Pause after a delivered payload
    post_success_delay: DelayRange,

    /// Pause after every iteration
    per_iteration_delay: DelayRange,

    /// Abandon in-flight waits once the pool stops
    interruptible: bool,

    /// Owned random source for pause jitter
    rng: StdRng,

    /// Optional attempt record sink
    records_tx: Option<mpsc::Sender<AttemptRecord>>,
}

impl Worker {
    /// Create a new worker
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        target: Arc<dyn Target>,
        rate_limiter: Arc<AttemptRateLimiter>,
        payload: PayloadGenerator,
        post_success_delay: DelayRange,
        per_iteration_delay: DelayRange,
        interruptible: bool,
        rng: StdRng,
    ) -> Self {
        Self {
            id,
            target,
            rate_limiter,
            payload,
            post_success_delay,
            per_iteration_delay,
            interruptible,
            rng,
            records_tx: None,
        }
    }

    /// Stream a record of every attempt to `tx`
    ///
    /// Records are offered with `try_send`; a full or closed channel drops
    /// them rather than slowing the worker down.
    pub fn with_records(mut self, tx: mpsc::Sender<AttemptRecord>) -> Self {
        self.records_tx = Some(tx);
        self
    }

    /// Run the worker loop until the running flag clears
    pub async fn run(mut self, mut signal: RunningSignal) -> WorkerStats {
        let mut stats = WorkerStats::new(self.id);
        stats.start();

        tracing::debug!(worker_id = self.id, endpoint = self.target.name(), "Worker started");

        while signal.is_running() {
            if self
                .until_stopped(&mut signal, self.rate_limiter.wait())
                .await
                .is_none()
            {
                break;
            }

            let started = Instant::now();
            let delivery = self.target.deliver(&mut self.payload);
            let Some(result) = Self::race(self.interruptible, &mut signal, delivery).await else {
                tracing::debug!(worker_id = self.id, "Attempt abandoned on stop");
                break;
            };
            let elapsed = started.elapsed();

            match result {
                Ok(sent) => {
                    stats.record_success(sent);
                    tracing::info!(
                        worker_id = self.id,
                        bytes = sent,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Payload delivered"
                    );
                    self.report(AttemptOutcome::Delivered, sent, elapsed);

                    let pause = self.post_success_delay.sample(&mut self.rng);
                    if !self.pause(&mut signal, pause).await {
                        break;
                    }
                }
                Err(e) => {
                    stats.record_failure(&e);
                    tracing::warn!(worker_id = self.id, error = %e, "Attempt failed");
                    self.report(AttemptOutcome::failed(&e), 0, elapsed);
                }
            }

            let pause = self.per_iteration_delay.sample(&mut self.rng);
            if !self.pause(&mut signal, pause).await {
                break;
            }
        }

        stats.stop();
        tracing::debug!(
            worker_id = self.id,
            completed = stats.completed,
            failures = stats.failures,
            elapsed_ms = ?stats.elapsed().map(|d| d.as_millis()),
            "Worker finished"
        );

        stats
    }

    /// Sleep for `duration`. Returns `false` if the pool stopped meanwhile.
    async fn pause(&self, signal: &mut RunningSignal, duration: Duration) -> bool {
        if duration.is_zero() {
            return true;
        }
        self.until_stopped(signal, tokio::time::sleep(duration))
            .await
            .is_some()
    }

    async fn until_stopped<F: Future>(
        &self,
        signal: &mut RunningSignal,
        fut: F,
    ) -> Option<F::Output> {
        Self::race(self.interruptible, signal, fut).await
    }

    /// Drive `fut`, giving up early if the pool stops and we are interruptible
    async fn race<F: Future>(
        interruptible: bool,
        signal: &mut RunningSignal,
        fut: F,
    ) -> Option<F::Output> {
        if !interruptible {
            return Some(fut.await);
        }
        tokio::select! {
            biased;

            _ = signal.stopped() => None,
            out = fut => Some(out),
        }
    }

    fn report(&self, outcome: AttemptOutcome, bytes_sent: usize, elapsed: Duration) {
        let Some(tx) = &self.records_tx else {
            return;
        };
        let record = AttemptRecord {
            worker_id: self.id,
            outcome,
            bytes_sent,
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            timestamp: chrono::Utc::now(),
        };
        if tx.try_send(record).is_err() {
            tracing::trace!(worker_id = self.id, "Attempt record dropped");
        }
    }

    /// Get the worker ID
    pub fn id(&self) -> usize {
        self.id
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("target", &self.target.name())
            .field("payload_size", &self.payload.size())
            .field("rate_limiter", &self.rate_limiter)
            .field("post_success_delay", &self.post_success_delay)
            .field("per_iteration_delay", &self.per_iteration_delay)
            .field("interruptible", &self.interruptible)
            .finish()
    }
}
