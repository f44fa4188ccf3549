//! CLI argument parsing and command dispatch

mod prompt;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flood_bench_core::{AggregatedStats, CoordinatorBuilder, FloodConfig, Sink};
use std::path::{Path, PathBuf};
use std::time::Duration;

use prompt::StdinLines;

#[derive(Parser)]
#[command(name = "flood-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the worker pool against a target
    Run(RunArgs),
    /// Validate a configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Accept and drain connections locally until Ctrl+C
    Sink {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        listen: String,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target host (prompted for if absent)
    #[arg(long)]
    pub host: Option<String>,

    /// Target port (prompted for if absent)
    #[arg(long)]
    pub port: Option<u16>,

    /// Number of workers (prompted for if absent)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Bytes sent per connection
    #[arg(long)]
    pub payload_size: Option<usize>,

    /// Global cap on connection attempts per second
    #[arg(long)]
    pub rate_limit: Option<f64>,

    /// Base seed for reproducible payloads and jitter
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop automatically after this many seconds
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Write the final summary as JSON
    #[arg(long)]
    pub summary_json: Option<PathBuf>,
}

/// Dispatch a parsed command line
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Validate { config } => validate(&config),
        Commands::Sink { listen } => sink(&listen).await,
    }
}

fn validate(path: &Path) -> Result<()> {
    let config = FloodConfig::load(path)
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;

    println!(
        "{}: ok ({} workers against {}, {} byte payloads)",
        path.display(),
        config.worker_count,
        config.target_label(),
        config.payload_size
    );
    Ok(())
}

async fn resolve_config(args: &RunArgs, input: &mut StdinLines) -> Result<FloodConfig> {
    let from_file = args.config.is_some();
    let mut config = match &args.config {
        Some(path) => FloodConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => FloodConfig::default(),
    };

    config.target_host = match &args.host {
        Some(host) => host.clone(),
        None if from_file => config.target_host,
        None => input.ask("Target host", config.target_host).await?,
    };
    config.target_port = match args.port {
        Some(port) => port,
        None if from_file => config.target_port,
        None => input.ask("Target port", config.target_port).await?,
    };
    config.worker_count = match args.workers {
        Some(workers) => workers,
        None if from_file => config.worker_count,
        None => input.ask("Number of workers", config.worker_count).await?,
    };

    if let Some(size) = args.payload_size {
        config.payload_size = size;
    }
    if let Some(rps) = args.rate_limit {
        config = config.with_rate_limit(rps);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    config.validate().context("Invalid run configuration")?;
    Ok(config)
}

fn run_duration(secs: Option<f64>) -> Result<Option<Duration>> {
    let Some(secs) = secs else {
        return Ok(None);
    };
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) if !duration.is_zero() => Ok(Some(duration)),
        _ => anyhow::bail!("--duration must be a positive, representable number of seconds, got {secs}"),
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let duration = run_duration(args.duration)?;

    let mut input = StdinLines::spawn();
    let config = resolve_config(&args, &mut input).await?;

    println!(
        "{} workers will send {} bytes per connection to {}",
        config.worker_count,
        config.payload_size,
        config.target_label()
    );
    if !args.yes && !input.confirm("Start?").await? {
        println!("Aborted");
        return Ok(());
    }

    // Attempts are already logged per worker; nobody reads the record stream here.
    let (mut coordinator, _records) = CoordinatorBuilder::new()
        .config(config)
        .build()
        .context("Failed to build coordinator")?;

    println!("Press Enter or Ctrl+C to stop");

    let stats = coordinator
        .run_until(async {
            tokio::select! {
                _ = input.wait_for_enter() => tracing::info!("Stop requested from stdin"),
                res = tokio::signal::ctrl_c() => match res {
                    Ok(()) => tracing::info!("Received Ctrl+C, stopping..."),
                    Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
                },
                _ = sleep_or_forever(duration) => tracing::info!("Run duration reached"),
            }
        })
        .await?;

    print_summary(&stats);

    if let Some(path) = &args.summary_json {
        let json = serde_json::to_string_pretty(&stats)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Summary written");
    }

    Ok(())
}

async fn sleep_or_forever(duration: Option<Duration>) {
    match duration {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

fn print_summary(stats: &AggregatedStats) {
    println!("Workers:     {} ({} lost)", stats.total_workers, stats.lost_workers);
    println!("Delivered:   {}", stats.total_completed);
    println!(
        "Failed:      {} ({} timeouts)",
        stats.total_failures, stats.total_timeouts
    );
    println!("Success:     {:.1}%", stats.success_rate() * 100.0);
    println!("Bytes sent:  {}", stats.total_bytes_sent);
    println!("Duration:    {:.2}s", stats.total_duration.as_secs_f64());
}

async fn sink(listen: &str) -> Result<()> {
    let sink = Sink::bind(listen)
        .await
        .with_context(|| format!("Failed to listen on {listen}"))?;
    println!("Sink listening on {}, Ctrl+C to stop", sink.local_addr());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    let stats = sink.shutdown().await;
    println!(
        "Accepted {} connections, received {} bytes",
        stats.accepted, stats.bytes_received
    );
    Ok(())
}
