//! Worker module for generating connection load
//!
//! The Worker is the unit of load in flood-bench. Each one is a tokio task
//! running the same loop, independent of every other worker:
//!
//! 1. Wait for a permit from the shared rate limiter (if configured)
//! 2. Open a fresh connection to the target
//! 3. Write a payload of pseudo-random bytes and close
//! 4. On success, pause for a random post-success interval
//! 5. On failure, log it and carry on
//! 6. Pause for a random per-iteration interval
//! 7. Repeat while the running flag is set
//!
//! # Example
//!
//! ```ignore
//! use flood_bench_core::worker::WorkerBuilder;
//!
//! let worker = WorkerBuilder::new(0)
//!     .target(target)
//!     .seed(7)
//!     .build()?;
//!
//! let stats = worker.run(flag.signal()).await;
//! println!("Delivered: {}", stats.completed);
//! ```

mod builder;
mod executor;
mod rate_limiter;
mod stats;

pub use builder::WorkerBuilder;
pub use executor::Worker;
pub use rate_limiter::AttemptRateLimiter;
pub use stats::WorkerStats;
