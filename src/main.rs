//! Sumi-Stream main entry point
//!
//! Crawls one site from the command line and streams every visited page to
//! stdout as a JSON line.

use anyhow::Context;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use sumi_stream::config::{load_config_with_hash, validate_worker_count, Config};
use sumi_stream::crawler::{CrawlSession, SessionRegistry};
use sumi_stream::output::{print_statistics, write_event_line, VisitedEvent};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

/// Sumi-Stream: a live, session-based domain crawler
///
/// Starts at URL, follows links up to --max-depth hops and prints one JSON
/// object per visited page: {"visited": url, "depth": n, "links": [...]}.
/// Ctrl-C stops the crawl; statistics are printed to stderr at the end.
#[derive(Parser, Debug)]
#[command(name = "sumi-stream")]
#[command(version = "1.0.0")]
#[command(about = "A live, session-based domain crawler", long_about = None)]
struct Cli {
    /// Root URL to start crawling from
    #[arg(value_name = "URL")]
    url: String,

    /// Maximum number of hops from the root URL
    #[arg(short = 'd', long, default_value_t = 1, allow_negative_numbers = true)]
    max_depth: i64,

    /// Number of fetch workers (overrides the config file)
    #[arg(short, long)]
    workers: Option<u32>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = load(&cli)?;
    if let Some(workers) = cli.workers {
        validate_worker_count(workers)?;
        config.crawler.workers = workers;
    }

    let registry =
        SessionRegistry::with_http_fetcher(config).context("Failed to build HTTP client")?;

    let (session, mut events) =
        start(&registry, &cli).with_context(|| format!("Cannot crawl {}", cli.url))?;
    let key = session.key();
    tracing::info!("Session {} started", key);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                let mut stdout = std::io::stdout().lock();
                write_event_line(&mut stdout, &event).context("Failed to write event")?;
            }
            result = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if let Err(e) = result {
                    tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                    continue;
                }
                tracing::info!("Interrupted, stopping session {}", key);
                registry.stop(&key)?;
            }
        }
    }

    session.wait_terminated().await;
    std::io::stdout().flush().ok();
    print_statistics(&key.to_string(), &session.stats());

    Ok(())
}

/// Creates the session and takes its event stream
fn start(
    registry: &SessionRegistry,
    cli: &Cli,
) -> sumi_stream::Result<(Arc<CrawlSession>, UnboundedReceiverStream<VisitedEvent>)> {
    let key = registry.create(&cli.url, cli.max_depth)?;
    let session = registry.get(&key)?;
    let events = session.subscribe()?;
    Ok((session, events))
}

/// Loads the config file if one was given, otherwise the defaults
fn load(cli: &Cli) -> sumi_stream::Result<Config> {
    let Some(path) = &cli.config else {
        tracing::debug!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    match load_config_with_hash(path) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout carries only the event stream.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_stream=info,warn"),
            1 => EnvFilter::new("sumi_stream=debug,info"),
            2 => EnvFilter::new("sumi_stream=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
