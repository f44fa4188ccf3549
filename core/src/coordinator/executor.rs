//! Coordinator lifecycle logic

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{FloodConfig, RECOMMENDED_MAX_WORKERS};
use crate::error::{FloodError, FloodResult};
use crate::record::AttemptRecord;
use crate::signal::RunningFlag;
use crate::target::Target;
use crate::worker::{AttemptRateLimiter, WorkerBuilder, WorkerStats};

use super::aggregator::{aggregate_worker_stats, AggregatedStats};

/// Coordinator owns the worker pool and its running flag
///
/// `Idle -> Running` via [`start`](Self::start), `Running -> Idle` via
/// [`stop`](Self::stop) once every worker has been joined.
pub struct Coordinator {
    /// Validated flood configuration
    pub(crate) config: FloodConfig,

    /// Delivery target (shared across workers)
    pub(crate) target: Arc<dyn Target>,

    /// Global attempt pacing (shared across workers)
    pub(crate) rate_limiter: Arc<AttemptRateLimiter>,

    /// Attempt record sender (cloned for each worker)
    pub(crate) records_tx: mpsc::Sender<AttemptRecord>,

    /// The single termination signal
    pub(crate) running: RunningFlag,

    /// Launched worker tasks, in id order
    pub(crate) workers: Vec<JoinHandle<WorkerStats>>,

    /// When the current run started
    pub(crate) started_at: Option<Instant>,
}

impl Coordinator {
    /// Create a new coordinator
    ///
    /// The config is validated by `start()`. `CoordinatorBuilder` validates
    /// earlier and supplies a default TCP target.
    pub fn new(
        config: FloodConfig,
        target: Arc<dyn Target>,
        records_tx: mpsc::Sender<AttemptRecord>,
    ) -> Self {
        let rate_limiter = Arc::new(AttemptRateLimiter::new(config.rate_limit));

        Self {
            config,
            target,
            rate_limiter,
            records_tx,
            running: RunningFlag::new(),
            workers: Vec::new(),
            started_at: None,
        }
    }

    /// Get the flood configuration
    pub fn config(&self) -> &FloodConfig {
        &self.config
    }

    /// Whether the pool is running
    pub fn is_running(&self) -> bool {
        self.running.is_set()
    }

    /// Number of worker tasks launched by the current run
    pub fn launched_workers(&self) -> usize {
        self.workers.len()
    }

    /// Number of launched worker tasks that have not exited yet
    pub fn active_workers(&self) -> usize {
        self.workers.iter().filter(|h| !h.is_finished()).count()
    }

    /// Launch the worker pool
    ///
    /// Returns as soon as every worker task has been spawned.
    ///
    /// # Errors
    /// `FloodError::AlreadyRunning` if the pool is already running, or
    /// `FloodError::Config` if the configuration does not validate. Nothing
    /// is launched in either case.
    pub fn start(&mut self) -> FloodResult<()> {
        if self.running.is_set() {
            tracing::error!(
                workers = self.workers.len(),
                "start() called while the pool is running"
            );
            return Err(FloodError::AlreadyRunning);
        }

        // `new` takes the config as given
        self.config.validate()?;

        let count = self.config.worker_count;
        if count > RECOMMENDED_MAX_WORKERS {
            tracing::warn!(
                worker_count = count,
                recommended_max = RECOMMENDED_MAX_WORKERS,
                "Worker count exceeds a typical load-test profile"
            );
        }

        // Build every worker before flipping the flag so a failure leaves us idle
        let mut workers = Vec::with_capacity(count);
        for worker_id in 0..count {
            let mut builder = WorkerBuilder::new(worker_id)
                .target(Arc::clone(&self.target))
                .rate_limiter(Arc::clone(&self.rate_limiter))
                .payload_size(self.config.payload_size)
                .delays(
                    self.config.post_success_delay,
                    self.config.per_iteration_delay,
                )
                .interruptible(self.config.interruptible)
                .records_tx(self.records_tx.clone());

            if let Some(seed) = self.config.seed {
                builder = builder.seed(seed.wrapping_add(worker_id as u64));
            }

            workers.push(builder.build()?);
        }

        self.running.set(true);
        self.started_at = Some(Instant::now());

        for worker in workers {
            let worker_id = worker.id();
            let signal = self.running.signal();
            self.workers.push(tokio::spawn(worker.run(signal)));
            tracing::info!(worker_id, endpoint = self.target.name(), "Worker launched");
        }

        tracing::info!(
            workers = self.workers.len(),
            endpoint = self.target.name(),
            payload_size = self.config.payload_size,
            rate_limit = ?self.config.rate_limit,
            "Flood started"
        );

        Ok(())
    }

    /// Stop the pool and wait for every worker to exit
    ///
    /// Clears the running flag, joins all worker tasks and returns the
    /// aggregated stats. Calling it on an idle pool is a no-op that returns
    /// empty stats.
    pub async fn stop(&mut self) -> AggregatedStats {
        let was_running = self.running.set(false);
        if !was_running && self.workers.is_empty() {
            tracing::debug!("stop() called on an idle pool");
            return AggregatedStats::default();
        }

        tracing::info!(workers = self.workers.len(), "Stopping flood, draining workers");

        let mut results = Vec::with_capacity(self.workers.len());
        let mut lost = 0;
        for (idx, handle) in self.workers.drain(..).enumerate() {
            match handle.await {
                Ok(stats) => {
                    tracing::debug!(
                        worker_id = idx,
                        completed = stats.completed,
                        failures = stats.failures,
                        "Worker joined"
                    );
                    results.push(stats);
                }
                Err(e) => {
                    lost += 1;
                    tracing::error!(worker_id = idx, error = %e, "Worker task panicked");
                }
            }
        }

        let mut aggregated = aggregate_worker_stats(&results);
        aggregated.lost_workers = lost;
        let elapsed = self
            .started_at
            .take()
            .map(|t| t.elapsed())
            .unwrap_or_default();

        tracing::info!(
            elapsed_secs = elapsed.as_secs_f64(),
            workers = aggregated.total_workers,
            delivered = aggregated.total_completed,
            failures = aggregated.total_failures,
            timeouts = aggregated.total_timeouts,
            bytes_sent = aggregated.total_bytes_sent,
            attempts_per_sec = aggregated.attempts_per_second,
            "Flood stopped"
        );

        aggregated
    }

    /// Run until `shutdown` resolves, then stop and drain
    pub async fn run_until<F>(&mut self, shutdown: F) -> FloodResult<AggregatedStats>
    where
        F: Future<Output = ()>,
    {
        self.start()?;
        shutdown.await;
        Ok(self.stop().await)
    }

    /// Run for a fixed duration, then stop and drain
    pub async fn run_for(&mut self, duration: Duration) -> FloodResult<AggregatedStats> {
        self.run_until(async move {
            tokio::time::sleep(duration).await;
            tracing::info!(secs = duration.as_secs_f64(), "Run duration reached");
        })
        .await
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        // Detached workers see the cleared flag and wind down on their own.
        if self.running.set(false) {
            tracing::warn!(
                workers = self.workers.len(),
                "Coordinator dropped while running; workers left to exit on their own"
            );
        }
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .field("target", &self.target.name())
            .field("running", &self.is_running())
            .field("workers", &self.workers.len())
            .finish()
    }
}
