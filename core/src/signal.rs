//! Shared running flag
//!
//! The coordinator owns the single [`RunningFlag`]; every worker gets a
//! [`RunningSignal`] clone. Reads are synchronized through a `watch`
//! channel, which also lets a worker await the flag clearing instead of
//! polling it.

use tokio::sync::watch;

/// Write side of the running flag, owned by the coordinator
#[derive(Debug)]
pub struct RunningFlag {
    tx: watch::Sender<bool>,
}

impl RunningFlag {
    /// Create a cleared flag
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Set or clear the flag. Returns the previous value.
    pub fn set(&self, running: bool) -> bool {
        self.tx.send_replace(running)
    }

    /// Current value
    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Hand out a read side for a worker
    pub fn signal(&self) -> RunningSignal {
        RunningSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for RunningFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of the running flag, one per worker
#[derive(Debug, Clone)]
pub struct RunningSignal {
    rx: watch::Receiver<bool>,
}

impl RunningSignal {
    /// Whether the pool is still running
    pub fn is_running(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the flag is cleared (or its owner dropped)
    pub async fn stopped(&mut self) {
        // An error means the coordinator is gone, which also means stop.
        let _ = self.rx.wait_for(|running| !*running).await;
    }
}
