//! flood-bench-core: worker pool for TCP connection-flood load testing
//!
//! This crate provides everything the `flood-bench` binary drives:
//!
//! - Configuration and validation ([`FloodConfig`])
//! - The worker loop: connect, send a random payload, back off ([`worker`])
//! - The coordinator that starts, stops and drains the pool ([`coordinator`])
//! - A pluggable delivery [`Target`] with a raw TCP implementation
//! - A local [`Sink`] to point the pool at
//! - Error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod payload;
pub mod record;
pub mod signal;
pub mod sink;
pub mod target;
pub mod worker;

pub use config::{ConfigError, DelayRange, FloodConfig};
pub use coordinator::{AggregatedStats, Coordinator, CoordinatorBuilder};
pub use error::{AttemptError, FloodError, FloodResult};
pub use record::{AttemptOutcome, AttemptRecord};
pub use signal::{RunningFlag, RunningSignal};
pub use sink::{Sink, SinkStats};
pub use target::{Target, TcpTarget};
pub use worker::{AttemptRateLimiter, Worker, WorkerBuilder, WorkerStats};
