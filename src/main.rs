//! site-audit main entry point
//!
//! This is the command-line interface for the site-audit SEO crawler.

use anyhow::Context;
use clap::Parser;
use site_audit::config::{load_config_with_hash, AuditConfig};
use site_audit::{Coordinator, CrawlEvent, SiteAuditResult};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// site-audit: a technical SEO audit crawler
///
/// Crawls one website, checks every page for technical, content, link,
/// image and structured-data problems, and prints a scored JSON report.
#[derive(Parser, Debug)]
#[command(name = "site-audit")]
#[command(version)]
#[command(about = "A technical SEO audit crawler", long_about = None)]
struct Cli {
    /// Site to audit; https:// is assumed when no scheme is given
    #[arg(value_name = "URL")]
    url: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Start from the resource-constrained preset instead of the defaults
    #[arg(long, conflicts_with = "config")]
    constrained: bool,

    /// Maximum number of pages to audit
    #[arg(long)]
    max_pages: Option<usize>,

    /// Maximum link depth from the seed URL
    #[arg(long)]
    max_depth: Option<u32>,

    /// Delay between batches, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Pages fetched concurrently
    #[arg(long)]
    workers: Option<usize>,

    /// Crawl pages disallowed by robots.txt
    #[arg(long)]
    ignore_robots: bool,

    /// Resolve the status of external link targets
    #[arg(long)]
    check_external: bool,

    /// Write the JSON report to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,

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

    // Logs go to stderr so the JSON report can be piped
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    let (sender, receiver) = mpsc::unbounded_channel();
    let coordinator = Coordinator::new(&cli.url, config)
        .with_context(|| format!("Cannot audit {}", cli.url))?
        .with_events(sender);

    let stop = coordinator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing the current batch");
            stop.stop();
        }
    });
    let progress = tokio::spawn(log_events(receiver));

    let result = coordinator.run().await;
    // The coordinator dropped its sender, so the logger drains and exits
    let _ = progress.await;

    write_report(&result, &cli)?;
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_audit=info,warn"),
            1 => EnvFilter::new("site_audit=debug,info"),
            2 => EnvFilter::new("site_audit=trace,debug"),
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

/// Loads the configuration file or preset, then applies flag overrides
fn build_config(cli: &Cli) -> anyhow::Result<AuditConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None if cli.constrained => AuditConfig::constrained(),
        None => AuditConfig::default(),
    };

    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(max_depth) = cli.max_depth {
        config.crawler.max_depth = max_depth;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.crawler.crawl_delay_ms = delay_ms;
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if cli.ignore_robots {
        config.crawler.respect_robots = false;
    }
    if cli.check_external {
        config.crawler.check_external = true;
    }
    Ok(config)
}

/// Logs progress events until the audit finishes
async fn log_events(mut receiver: mpsc::UnboundedReceiver<CrawlEvent>) {
    while let Some(event) = receiver.recv().await {
        match event {
            CrawlEvent::PreCheck { message } => tracing::info!("{}", message),
            CrawlEvent::PageDone {
                url,
                status_code,
                ttfb,
                pages_scanned,
                queue_size,
                ..
            } => {
                tracing::info!(
                    "[{}] {} {} ({:.2}s, {} queued)",
                    pages_scanned,
                    status_code,
                    url,
                    ttfb,
                    queue_size
                );
            }
            CrawlEvent::PageError { url, error } => {
                tracing::warn!("Failed to audit {}: {}", url, error);
            }
            CrawlEvent::Done {
                pages_scanned,
                health_score,
            } => {
                tracing::info!(
                    "Done: {} pages audited, health score {}",
                    pages_scanned,
                    health_score
                );
            }
        }
    }
}

/// Writes the JSON report to the output file or stdout
fn write_report(result: &SiteAuditResult, cli: &Cli) -> anyhow::Result<()> {
    let json = if cli.compact {
        serde_json::to_string(result)?
    } else {
        serde_json::to_string_pretty(result)?
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Report written to: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
