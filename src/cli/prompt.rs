//! Line-oriented interactive input

use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};
use std::str::FromStr;
use tokio::sync::mpsc;

/// Stdin lines fed from a detached reader thread
///
/// A blocking stdin read can't be cancelled, so it lives on a plain thread
/// that never holds up runtime shutdown.
pub struct StdinLines {
    rx: mpsc::UnboundedReceiver<String>,
}

impl StdinLines {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self { rx }
    }

    /// Next line, or `None` once stdin is closed
    pub async fn next_line(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Resolve on the next line; never resolves if stdin is closed
    pub async fn wait_for_enter(&mut self) {
        if self.next_line().await.is_none() {
            std::future::pending::<()>().await;
        }
    }

    /// Ask for a value, falling back to `default` on an empty answer
    pub async fn ask<T>(&mut self, question: &str, default: T) -> Result<T>
    where
        T: FromStr + std::fmt::Display,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        print!("{question} [{default}]: ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let answer = self.next_line().await.unwrap_or_default();
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(default);
        }
        answer
            .parse()
            .with_context(|| format!("Invalid answer {answer:?} to {question:?}"))
    }

    /// Yes/no question defaulting to no
    pub async fn confirm(&mut self, question: &str) -> Result<bool> {
        print!("{question} [y/N]: ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        match self.next_line().await {
            Some(answer) => Ok(matches!(
                answer.trim().to_ascii_lowercase().as_str(),
                "y" | "yes"
            )),
            None => bail!("stdin closed before confirmation; pass --yes to skip it"),
        }
    }
}
