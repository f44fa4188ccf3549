//! Tests for the Coordinator module

use super::aggregator::{aggregate_worker_stats, AggregatedStats};
use super::builder::CoordinatorBuilder;
use super::executor::Coordinator;
use crate::config::{DelayRange, FloodConfig};
use crate::error::{AttemptError, FloodError};
use crate::payload::PayloadGenerator;
use crate::sink::Sink;
use crate::target::Target;
use crate::worker::WorkerStats;

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

// ============================================================================
// Mock Target
// ============================================================================

struct MockTarget {
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
}

impl MockTarget {
    fn new() -> Self {
        Self {
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Target for MockTarget {
    fn name(&self) -> &str {
        "mock"
    }

    async fn deliver(&self, payload: &mut PayloadGenerator) -> Result<usize, AttemptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(payload.fill().len())
    }
}

fn fast_config(workers: usize) -> FloodConfig {
    FloodConfig::new("127.0.0.1", 9, workers)
        .with_payload_size(512)
        .with_delays(DelayRange::fixed(0.005), DelayRange::fixed(0.01))
        .with_seed(42)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_aggregated_stats_default() {
    let stats = AggregatedStats::default();
    assert_eq!(stats.total_workers, 0);
    assert_eq!(stats.total_completed, 0);
    assert_eq!(stats.total_failures, 0);
    assert_eq!(stats.success_rate(), 0.0);
}

#[test]
fn test_aggregated_stats_success_rate() {
    let stats = AggregatedStats {
        total_completed: 90,
        total_failures: 10,
        ..Default::default()
    };
    assert_eq!(stats.total_attempts(), 100);
    assert!((stats.success_rate() - 0.9).abs() < 0.001);
}

#[test]
fn test_aggregate_worker_stats_empty() {
    let stats = aggregate_worker_stats(&[]);
    assert_eq!(stats.total_workers, 0);
    assert_eq!(stats.total_completed, 0);
}

#[test]
fn test_aggregate_worker_stats() {
    let mut s1 = WorkerStats::new(0);
    s1.completed = 50;
    s1.failures = 5;
    s1.timeouts = 1;
    s1.bytes_sent = 5000;
    s1.start();
    std::thread::sleep(Duration::from_millis(10));
    s1.stop();

    let mut s2 = WorkerStats::new(1);
    s2.completed = 50;
    s2.failures = 5;
    s2.bytes_sent = 5000;
    s2.start();
    std::thread::sleep(Duration::from_millis(10));
    s2.stop();

    let aggregated = aggregate_worker_stats(&[s1, s2]);

    assert_eq!(aggregated.total_workers, 2);
    assert_eq!(aggregated.total_completed, 100);
    assert_eq!(aggregated.total_failures, 10);
    assert_eq!(aggregated.total_timeouts, 1);
    assert_eq!(aggregated.total_bytes_sent, 10_000);
    assert!(aggregated.total_duration >= Duration::from_millis(10));
    assert!(aggregated.attempts_per_second > 0.0);
}

#[test]
fn test_aggregated_stats_json() {
    let stats = AggregatedStats {
        total_workers: 3,
        total_completed: 7,
        ..Default::default()
    };
    let json = serde_json::to_string(&stats).unwrap();
    assert!(json.contains("\"total_workers\":3"));
    assert!(json.contains("\"total_completed\":7"));
}

#[test]
fn test_builder_zero_workers_rejected() {
    let result = CoordinatorBuilder::new().worker_count(0).build();
    assert!(matches!(result, Err(FloodError::Config(_))));
}

#[test]
fn test_builder_port_zero_rejected() {
    let result = CoordinatorBuilder::new().target_port(0).build();
    assert!(matches!(result, Err(FloodError::Config(_))));
}

#[test]
fn test_builder_defaults_to_tcp_target() {
    let (coordinator, _rx) = CoordinatorBuilder::new()
        .target_host("10.9.8.7")
        .target_port(4444)
        .build()
        .expect("Failed to build");

    let debug = format!("{:?}", coordinator);
    assert!(debug.contains("Coordinator"));
    assert!(debug.contains("10.9.8.7:4444"));
    assert!(debug.contains("running: false"));
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_start_launches_exactly_n_workers() {
    let target = Arc::new(MockTarget::new());
    let (mut coordinator, _rx) = CoordinatorBuilder::new()
        .config(fast_config(4))
        .target(target)
        .build()
        .expect("Failed to build coordinator");

    assert!(!coordinator.is_running());
    assert_eq!(coordinator.launched_workers(), 0);

    coordinator.start().expect("start failed");
    assert!(coordinator.is_running());
    assert_eq!(coordinator.launched_workers(), 4);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(coordinator.active_workers(), 4);

    let stats = coordinator.stop().await;
    assert_eq!(stats.total_workers, 4);
    assert_eq!(stats.lost_workers, 0);
    assert!(!coordinator.is_running());
    assert_eq!(coordinator.launched_workers(), 0);
}

#[tokio::test]
async fn test_start_validates_unchecked_config() {
    let target = Arc::new(MockTarget::new());
    let (records_tx, _rx) = mpsc::channel(16);
    let mut coordinator = Coordinator::new(
        FloodConfig::new("", 0, 0),
        Arc::clone(&target) as Arc<dyn Target>,
        records_tx,
    );

    let result = coordinator.start();
    assert!(matches!(result, Err(FloodError::Config(_))));
    assert!(!coordinator.is_running());
    assert_eq!(coordinator.launched_workers(), 0);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(target.calls(), 0);
}

#[tokio::test]
async fn test_start_rejects_unrepresentable_delay() {
    let (records_tx, _rx) = mpsc::channel(16);
    let config = fast_config(3).with_delays(DelayRange::fixed(1e300), DelayRange::zero());
    let mut coordinator = Coordinator::new(config, Arc::new(MockTarget::new()), records_tx);

    assert!(matches!(coordinator.start(), Err(FloodError::Config(_))));
    assert_eq!(coordinator.launched_workers(), 0);
}

#[test]
fn test_builder_rejects_overflowing_timeout() {
    let result = CoordinatorBuilder::new()
        .config(FloodConfig::new("127.0.0.1", 9, 1).with_connect_timeout(Some(1e300)))
        .build();
    assert!(matches!(result, Err(FloodError::Config(_))));
}

#[tokio::test]
async fn test_double_start_rejected() {
    let target = Arc::new(MockTarget::new());
    let (mut coordinator, _rx) = CoordinatorBuilder::new()
        .config(fast_config(2))
        .target(target)
        .build()
        .expect("Failed to build coordinator");

    coordinator.start().expect("first start failed");
    let second = coordinator.start();
    assert!(matches!(second, Err(FloodError::AlreadyRunning)));
    assert_eq!(coordinator.launched_workers(), 2);

    let stats = coordinator.stop().await;
    assert_eq!(stats.total_workers, 2);
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let target = Arc::new(MockTarget::new());
    let (mut coordinator, _rx) = CoordinatorBuilder::new()
        .config(fast_config(2))
        .target(target)
        .build()
        .expect("Failed to build coordinator");

    // Stop before any start is a no-op
    let idle = coordinator.stop().await;
    assert_eq!(idle.total_workers, 0);

    coordinator.start().expect("start failed");
    tokio::time::sleep(Duration::from_millis(30)).await;

    let first = coordinator.stop().await;
    assert_eq!(first.total_workers, 2);
    assert!(first.total_completed > 0);

    let second = coordinator.stop().await;
    assert_eq!(second.total_workers, 0);
    assert_eq!(second.total_completed, 0);
    assert!(!coordinator.is_running());
}

#[tokio::test]
async fn test_no_activity_after_stop_returns() {
    let target = Arc::new(MockTarget::new().with_delay(Duration::from_millis(30)));
    let (mut coordinator, _rx) = CoordinatorBuilder::new()
        .config(fast_config(5).with_delays(DelayRange::zero(), DelayRange::zero()))
        .target(Arc::clone(&target) as Arc<dyn Target>)
        .build()
        .expect("Failed to build coordinator");

    coordinator.start().expect("start failed");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(target.in_flight() > 0);

    coordinator.stop().await;
    assert_eq!(target.in_flight(), 0);

    let calls = target.calls();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(target.calls(), calls);
}

#[tokio::test]
async fn test_cooperative_stop_waits_for_in_flight_work() {
    let target = Arc::new(MockTarget::new().with_delay(Duration::from_millis(200)));
    let (mut coordinator, _rx) = CoordinatorBuilder::new()
        .config(fast_config(3).with_interruptible(false))
        .target(Arc::clone(&target) as Arc<dyn Target>)
        .build()
        .expect("Failed to build coordinator");

    coordinator.start().expect("start failed");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stop_at = Instant::now();
    let stats = coordinator.stop().await;

    assert!(stop_at.elapsed() >= Duration::from_millis(100));
    assert_eq!(target.in_flight(), 0);
    // Every worker finished the delivery it was in the middle of
    assert_eq!(stats.total_completed, 3);
}

#[tokio::test]
async fn test_refused_target_keeps_pool_alive() {
    // Reserve a port and release it so connections are refused
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = fast_config(3);
    let config = FloodConfig {
        target_port: port,
        ..config
    };
    let (mut coordinator, _rx) = CoordinatorBuilder::new()
        .config(config)
        .build()
        .expect("Failed to build coordinator");

    coordinator.start().expect("start failed");
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(coordinator.active_workers(), 3);

    let stats = coordinator.stop().await;
    assert_eq!(stats.total_workers, 3);
    assert_eq!(stats.total_completed, 0);
    assert!(stats.total_failures >= 3);
}

#[tokio::test]
async fn test_restart_after_stop() {
    let target = Arc::new(MockTarget::new());
    let (mut coordinator, _rx) = CoordinatorBuilder::new()
        .config(fast_config(2))
        .target(target)
        .build()
        .expect("Failed to build coordinator");

    coordinator.start().expect("first start failed");
    coordinator.stop().await;

    coordinator.start().expect("restart failed");
    assert_eq!(coordinator.launched_workers(), 2);
    let stats = coordinator.stop().await;
    assert_eq!(stats.total_workers, 2);
}

#[tokio::test]
async fn test_run_for_duration() {
    let target = Arc::new(MockTarget::new());
    let (mut coordinator, _rx) = CoordinatorBuilder::new()
        .config(fast_config(2))
        .target(target)
        .build()
        .expect("Failed to build coordinator");

    let start = Instant::now();
    let stats = coordinator
        .run_for(Duration::from_millis(100))
        .await
        .expect("run failed");
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(500));
    assert!(stats.total_completed > 0);
    assert!(!coordinator.is_running());
}

#[tokio::test]
async fn test_drop_while_running_stops_workers() {
    let target = Arc::new(MockTarget::new());
    let (mut coordinator, _rx) = CoordinatorBuilder::new()
        .config(fast_config(3))
        .target(Arc::clone(&target) as Arc<dyn Target>)
        .build()
        .expect("Failed to build coordinator");

    coordinator.start().expect("start failed");
    tokio::time::sleep(Duration::from_millis(30)).await;
    drop(coordinator);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let calls = target.calls();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(target.calls(), calls);
}

#[tokio::test]
async fn test_records_streamed_per_attempt() {
    let target = Arc::new(MockTarget::new());
    let (mut coordinator, mut records) = CoordinatorBuilder::new()
        .config(fast_config(3))
        .target(target)
        .build()
        .expect("Failed to build coordinator");

    coordinator.start().expect("start failed");
    tokio::time::sleep(Duration::from_millis(80)).await;
    let stats = coordinator.stop().await;

    let mut seen = HashSet::new();
    let mut delivered = 0;
    while let Ok(record) = records.try_recv() {
        seen.insert(record.worker_id);
        if record.outcome.is_delivered() {
            delivered += 1;
        }
    }
    assert_eq!(seen, HashSet::from([0, 1, 2]));
    assert_eq!(delivered, stats.total_completed);
}

// ============================================================================
// End-to-end
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_end_to_end_against_local_sink() {
    let sink = Sink::bind("127.0.0.1:0").await.expect("bind sink");
    let port = sink.local_addr().port();

    let (mut coordinator, mut records) = CoordinatorBuilder::new()
        .config(FloodConfig::new("127.0.0.1", port, 3))
        .build()
        .expect("Failed to build coordinator");

    coordinator.start().expect("start failed");
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Every payload the sink has fully read is exactly the default size
    let during = sink.stats();
    assert!(during.closed >= 3, "closed = {}", during.closed);
    assert_eq!(during.smallest_payload, Some(100 * 1024));
    assert_eq!(during.largest_payload, Some(100 * 1024));

    let stats = coordinator.stop().await;
    let at_stop = sink.stats();
    assert_eq!(stats.total_workers, 3);
    assert_eq!(stats.total_failures, 0);

    let mut delivered_by = HashSet::new();
    while let Ok(record) = records.try_recv() {
        if record.outcome.is_delivered() {
            assert_eq!(record.bytes_sent, 100 * 1024);
            delivered_by.insert(record.worker_id);
        }
    }
    assert_eq!(delivered_by, HashSet::from([0, 1, 2]));

    // Nothing more arrives once stop() has returned
    tokio::time::sleep(Duration::from_secs(1)).await;
    let after = sink.stats();
    assert_eq!(after.accepted, at_stop.accepted);
    assert_eq!(after.bytes_received, at_stop.bytes_received);

    sink.shutdown().await;
}
