//! Coordinator for worker pool lifecycle management
//!
//! The Coordinator owns everything shared between workers:
//! - The running flag, the single signal that tells workers to exit
//! - The delivery target and the global rate limiter
//! - The handles of every launched worker task
//!
//! `start()` launches the pool and returns immediately; `stop()` clears the
//! flag and does not return until every worker has been joined.
//!
//! # Example
//!
//! ```ignore
//! use flood_bench_core::{CoordinatorBuilder, FloodConfig};
//!
//! let (mut coordinator, _records) = CoordinatorBuilder::new()
//!     .config(FloodConfig::new("127.0.0.1", 8080, 10))
//!     .build()?;
//!
//! let stats = coordinator.run_for(Duration::from_secs(30)).await?;
//! ```

mod aggregator;
mod builder;
mod executor;

pub use aggregator::{aggregate_worker_stats, AggregatedStats};
pub use builder::CoordinatorBuilder;
pub use executor::Coordinator;

#[cfg(test)]
mod tests;
