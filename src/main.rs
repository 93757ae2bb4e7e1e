//! Mercator main entry point
//!
//! This is the command-line interface for the Mercator polite crawler.

use anyhow::Context;
use clap::Parser;
use mercator_frontier::config::{load_config_with_hash, validate, Config};
use mercator_frontier::crawler::run_crawl;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Mercator: a polite crawler
///
/// Mercator fetches pages host by host, never contacting the same host more
/// often than the configured politeness interval, and follows the links it
/// discovers until the frontier is exhausted.
#[derive(Parser, Debug)]
#[command(name = "mercator")]
#[command(version)]
#[command(about = "A polite Mercator-style crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Additional seed URL (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if !cli.seeds.is_empty() {
        config.crawler.seeds.extend(cli.seeds);
        validate(&config).context("Invalid --seed URL")?;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(&config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("mercator_frontier=info,warn"),
            1 => EnvFilter::new("mercator_frontier=debug,info"),
            2 => EnvFilter::new("mercator_frontier=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Mercator Dry Run ===\n");

    println!("Scheduler:");
    println!(
        "  Politeness interval: {}ms",
        config.scheduler.politeness_interval
    );
    println!("  Poll interval: {}ms", config.scheduler.poll_interval);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nFetcher:");
    println!("  Timeout: {}s", config.fetcher.timeout);
    println!("  Connect timeout: {}s", config.fetcher.connect_timeout);

    println!("\nCrawler:");
    if config.crawler.max_pages == 0 {
        println!("  Max pages: unlimited");
    } else {
        println!("  Max pages: {}", config.crawler.max_pages);
    }
    println!("  Follow links: {}", config.crawler.follow_links);

    println!("\nSeeds ({}):", config.crawler.seeds.len());
    for seed in &config.crawler.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    if config.crawler.seeds.is_empty() {
        tracing::warn!("No seed URLs configured, nothing to crawl");
        return Ok(());
    }

    match run_crawl(config).await {
        Ok(stats) => {
            tracing::info!("Crawl completed successfully");
            println!("{}", stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
