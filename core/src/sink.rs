//! Local sink target
//!
//! A TCP listener that accepts every connection, reads it to EOF and counts
//! what arrived. Useful as a throwaway target when trying the tool locally,
//! and as the observing end in end-to-end tests.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::task::JoinHandle;

use crate::signal::{RunningFlag, RunningSignal};

const READ_BUF_SIZE: usize = 64 * 1024;

/// Counters kept by a [`Sink`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SinkStats {
    /// Connections accepted
    pub accepted: usize,
    /// Connections still being read
    pub open: usize,
    /// Connections read to EOF (or reset)
    pub closed: usize,
    /// Bytes received over all connections
    pub bytes_received: u64,
    /// Smallest per-connection byte count among closed connections
    pub smallest_payload: Option<u64>,
    /// Largest per-connection byte count among closed connections
    pub largest_payload: Option<u64>,
}

impl SinkStats {
    fn record_closed(&mut self, received: u64) {
        self.open -= 1;
        self.closed += 1;
        self.smallest_payload = Some(self.smallest_payload.map_or(received, |s| s.min(received)));
        self.largest_payload = Some(self.largest_payload.map_or(received, |l| l.max(received)));
    }
}

/// Running sink listener
pub struct Sink {
    local_addr: SocketAddr,
    stats: Arc<Mutex<SinkStats>>,
    running: RunningFlag,
    handle: JoinHandle<()>,
}

impl Sink {
    /// Bind and start accepting
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let stats = Arc::new(Mutex::new(SinkStats::default()));
        let running = RunningFlag::new();
        running.set(true);

        let handle = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&stats),
            running.signal(),
        ));

        tracing::info!(%local_addr, "Sink listening");

        Ok(Self {
            local_addr,
            stats,
            running,
            handle,
        })
    }

    /// Address the sink is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> SinkStats {
        lock(&self.stats).clone()
    }

    /// Stop accepting, drop open connections and return the final counters
    pub async fn shutdown(self) -> SinkStats {
        self.running.set(false);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Sink accept loop panicked");
        }
        let stats = lock(&self.stats).clone();
        tracing::info!(
            accepted = stats.accepted,
            bytes_received = stats.bytes_received,
            "Sink stopped"
        );
        stats
    }
}

fn lock(stats: &Mutex<SinkStats>) -> std::sync::MutexGuard<'_, SinkStats> {
    // Counters stay meaningful even if a reader panicked mid-update
    stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn accept_loop(
    listener: TcpListener,
    stats: Arc<Mutex<SinkStats>>,
    mut signal: RunningSignal,
) {
    loop {
        tokio::select! {
            biased;

            _ = signal.stopped() => break,

            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    {
                        let mut s = lock(&stats);
                        s.accepted += 1;
                        s.open += 1;
                    }
                    tracing::debug!(%peer, "Sink accepted connection");
                    tokio::spawn(drain_connection(
                        socket,
                        peer,
                        Arc::clone(&stats),
                        signal.clone(),
                    ));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Sink accept failed");
                }
            },
        }
    }
}

async fn drain_connection(
    mut socket: TcpStream,
    peer: SocketAddr,
    stats: Arc<Mutex<SinkStats>>,
    mut signal: RunningSignal,
) {
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut received: u64 = 0;

    loop {
        tokio::select! {
            biased;

            _ = signal.stopped() => break,

            read = socket.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => {
                    received += n as u64;
                    lock(&stats).bytes_received += n as u64;
                }
                Err(e) => {
                    tracing::debug!(%peer, error = %e, "Sink read failed");
                    break;
                }
            },
        }
    }

    lock(&stats).record_closed(received);
    tracing::debug!(%peer, bytes = received, "Sink connection closed");
}
