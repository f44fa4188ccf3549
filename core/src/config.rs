//! Flood configuration types
//!
//! Configuration is built in code or loaded from a TOML file, and is always
//! validated before a single worker is launched.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Worker counts above this are accepted but logged as outside a load-test profile
pub const RECOMMENDED_MAX_WORKERS: usize = 100;

/// Hard upper bound on the pool size
pub const MAX_WORKERS: usize = 10_000;

/// Hard upper bound on a single payload
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

/// Uniform sleep interval, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Lower bound (inclusive)
    pub min_secs: f64,

    /// Upper bound (inclusive)
    pub max_secs: f64,
}

impl DelayRange {
    /// Create a new range
    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    /// A fixed delay
    pub const fn fixed(secs: f64) -> Self {
        Self::new(secs, secs)
    }

    /// No delay at all
    pub const fn zero() -> Self {
        Self::fixed(0.0)
    }

    /// Draw a delay uniformly from the range
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        let secs = if self.max_secs > self.min_secs {
            rng.gen_range(self.min_secs..=self.max_secs)
        } else {
            self.min_secs
        };
        // Validated ranges always convert; anything else sleeps until stopped.
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    pub(crate) fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let ordered = self.min_secs >= 0.0 && self.max_secs >= self.min_secs;
        if !ordered || to_duration(self.max_secs).is_none() {
            return Err(ConfigError::InvalidDelayRange(format!(
                "{name} must satisfy 0 <= min <= max with max representable, got [{}, {}]",
                self.min_secs, self.max_secs
            )));
        }
        Ok(())
    }
}

/// Seconds to `Duration`, `None` for negative, NaN, infinite or overflowing values
fn to_duration(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

/// Full configuration of a flood run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloodConfig {
    /// Destination address for every worker connection
    #[serde(default = "default_target_host")]
    pub target_host: String,

    /// Destination port
    #[serde(default = "default_target_port")]
    pub target_port: u16,

    /// Number of concurrent workers
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Bytes per transmission
    #[serde(default = "default_payload_size")]
    pub payload_size: usize,

    /// Pause after a successful send
    #[serde(default = "default_post_success_delay")]
    pub post_success_delay: DelayRange,

    /// Pause after every iteration, successful or not
    #[serde(default = "default_per_iteration_delay")]
    pub per_iteration_delay: DelayRange,

    /// Connect deadline. Absent means the OS decides.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: Option<f64>,

    /// Write deadline. Absent means unbounded.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: Option<f64>,

    /// Global cap on connection attempts per second, shared by all workers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<f64>,

    /// Abandon in-flight sleeps and I/O as soon as the pool is stopped
    #[serde(default = "default_interruptible")]
    pub interruptible: bool,

    /// Base seed for the per-worker generators; worker `i` uses `seed + i`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_target_host() -> String {
    "127.0.0.1".to_string()
}

fn default_target_port() -> u16 {
    80
}

fn default_worker_count() -> usize {
    5
}

fn default_payload_size() -> usize {
    100 * 1024 // 100 KiB
}

fn default_post_success_delay() -> DelayRange {
    DelayRange::new(0.1, 0.5)
}

fn default_per_iteration_delay() -> DelayRange {
    DelayRange::new(0.5, 1.5)
}

fn default_connect_timeout() -> Option<f64> {
    Some(5.0)
}

fn default_send_timeout() -> Option<f64> {
    Some(10.0)
}

fn default_interruptible() -> bool {
    true
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            target_host: default_target_host(),
            target_port: default_target_port(),
            worker_count: default_worker_count(),
            payload_size: default_payload_size(),
            post_success_delay: default_post_success_delay(),
            per_iteration_delay: default_per_iteration_delay(),
            connect_timeout_secs: default_connect_timeout(),
            send_timeout_secs: default_send_timeout(),
            rate_limit: None,
            interruptible: default_interruptible(),
            seed: None,
        }
    }
}

impl FloodConfig {
    /// Create a config for the given target with default pacing
    pub fn new(target_host: impl Into<String>, target_port: u16, worker_count: usize) -> Self {
        Self {
            target_host: target_host.into(),
            target_port,
            worker_count,
            ..Default::default()
        }
    }

    /// Set the payload size in bytes
    pub fn with_payload_size(mut self, bytes: usize) -> Self {
        self.payload_size = bytes;
        self
    }

    /// Set both pacing ranges
    pub fn with_delays(mut self, post_success: DelayRange, per_iteration: DelayRange) -> Self {
        self.post_success_delay = post_success;
        self.per_iteration_delay = per_iteration;
        self
    }

    /// Set the connect deadline in seconds (`None` for unbounded)
    pub fn with_connect_timeout(mut self, secs: Option<f64>) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Set the send deadline in seconds (`None` for unbounded)
    pub fn with_send_timeout(mut self, secs: Option<f64>) -> Self {
        self.send_timeout_secs = secs;
        self
    }

    /// Set the global attempt rate limit
    pub fn with_rate_limit(mut self, attempts_per_sec: f64) -> Self {
        self.rate_limit = Some(attempts_per_sec);
        self
    }

    /// Choose between interruptible and cooperative shutdown
    pub fn with_interruptible(mut self, interruptible: bool) -> Self {
        self.interruptible = interruptible;
        self
    }

    /// Seed the per-worker generators
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Connect deadline as a `Duration`
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.and_then(to_duration)
    }

    /// Send deadline as a `Duration`
    pub fn send_timeout(&self) -> Option<Duration> {
        self.send_timeout_secs.and_then(to_duration)
    }

    /// `host:port` label used in logs
    pub fn target_label(&self) -> String {
        format!("{}:{}", self.target_host, self.target_port)
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_host.trim().is_empty() {
            return Err(ConfigError::InvalidHost("target host is empty".into()));
        }

        if self.target_port == 0 {
            return Err(ConfigError::InvalidPort("port must be in 1..=65535".into()));
        }

        if self.worker_count == 0 {
            return Err(ConfigError::InvalidWorkerCount(
                "worker count must be at least 1".into(),
            ));
        }
        if self.worker_count > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount(format!(
                "worker count must be at most {MAX_WORKERS}"
            )));
        }

        if self.payload_size == 0 || self.payload_size > MAX_PAYLOAD_SIZE {
            return Err(ConfigError::InvalidPayloadSize(format!(
                "payload size must be in 1..={MAX_PAYLOAD_SIZE} bytes"
            )));
        }

        self.post_success_delay.validate("post_success_delay")?;
        self.per_iteration_delay.validate("per_iteration_delay")?;

        for (name, timeout) in [
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("send_timeout_secs", self.send_timeout_secs),
        ] {
            if let Some(secs) = timeout {
                if !to_duration(secs).is_some_and(|d| !d.is_zero()) {
                    return Err(ConfigError::InvalidTimeout(format!(
                        "{name} must be a positive, representable number of seconds, got {secs}"
                    )));
                }
            }
        }

        if let Some(rps) = self.rate_limit {
            // The limiter paces one attempt every 1/rps seconds
            let interval = if rps > 0.0 { to_duration(1.0 / rps) } else { None };
            if !interval.is_some_and(|d| !d.is_zero()) {
                return Err(ConfigError::InvalidRateLimit(format!(
                    "rate limit must be positive with a representable interval, got {rps}"
                )));
            }
        }

        Ok(())
    }
}

/// Configuration validation and loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid target host
    #[error("Invalid host: {0}")]
    InvalidHost(String),

    /// Invalid or unparsable port
    #[error("Invalid port: {0}")]
    InvalidPort(String),

    /// Invalid worker count
    #[error("Invalid worker count: {0}")]
    InvalidWorkerCount(String),

    /// Invalid payload size
    #[error("Invalid payload size: {0}")]
    InvalidPayloadSize(String),

    /// Invalid delay range
    #[error("Invalid delay range: {0}")]
    InvalidDelayRange(String),

    /// Invalid connect or send timeout
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    /// Invalid rate limit
    #[error("Invalid rate limit: {0}")]
    InvalidRateLimit(String),

    /// Malformed TOML
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// Path that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}
