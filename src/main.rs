//! calproxy main entry point
//!
//! Loads configuration, starts the refresh scheduler and serves the merged
//! calendar until interrupted.

use anyhow::Context;
use calproxy::config::{load_config, Config, ConfigOverrides};
use calproxy::server::{serve, AppState};
use calproxy::{AggregateCache, Metrics, RefreshScheduler};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// calproxy: merge calendar feeds listed on an index page into one calendar
#[derive(Parser, Debug)]
#[command(name = "calproxy")]
#[command(version)]
#[command(about = "Aggregates calendar feeds into a single iCalendar document", long_about = None)]
struct Cli {
    /// Optional TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// URL of the index page listing the source feeds
    #[arg(long, env = "TARGET")]
    target: Option<String>,

    /// User for basic auth
    #[arg(long, env = "AUTH_USER")]
    user: Option<String>,

    /// Password for basic auth
    #[arg(long, env = "AUTH_PASS", hide_env_values = true)]
    pass: Option<String>,

    /// Address to listen on
    #[arg(long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            target: self.target.clone(),
            user: self.user.clone(),
            pass: self.pass.clone(),
            listen: self.listen.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match load_config(cli.config.as_deref(), cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    run(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("calproxy=info,warn"),
                1 => EnvFilter::new("calproxy=debug,info"),
                _ => EnvFilter::new("calproxy=trace,debug"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Starts the scheduler and the server and waits for shutdown
async fn run(config: Config) -> anyhow::Result<()> {
    let target = config.target_url()?;
    let listen = config.listen_addr()?;
    tracing::info!(
        target = %target,
        interval_secs = config.refresh.interval_secs,
        max_concurrent = config.refresh.max_concurrent_fetches,
        "Configured"
    );

    let cache = Arc::new(AggregateCache::new());
    let metrics = Arc::new(Metrics::new());
    let scheduler = RefreshScheduler::from_config(&config, Arc::clone(&cache), Arc::clone(&metrics))
        .context("failed to set up refresh scheduler")?;

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {}", listen))?;

    let shutdown = CancellationToken::new();
    let refresh = tokio::spawn(scheduler.run(shutdown.clone()));

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        tracing::info!("Shutdown requested");
        signal.cancel();
    });

    let served = serve(listener, AppState::new(cache, metrics), shutdown.clone()).await;

    shutdown.cancel();
    if let Err(e) = refresh.await {
        tracing::error!("Refresh task failed: {}", e);
    }

    served.context("server exited")?;
    tracing::info!("Exited");
    Ok(())
}
