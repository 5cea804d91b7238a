//! Threadwalk main entry point
//!
//! This is the command-line interface for the Threadwalk crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use threadwalk::config::{load_config_with_hash, validate, Config};
use threadwalk::output::{print_summary, to_records, JsonFileSink, ResultSink};
use threadwalk::Crawler;
use tracing_subscriber::EnvFilter;

/// Threadwalk: a concurrent, bounded web crawler
///
/// Threadwalk crawls the pages under a base URL with a fixed pool of workers,
/// retries transient failures with backoff, and writes one record per
/// visited page to a JSON file.
#[derive(Parser, Debug)]
#[command(name = "threadwalk")]
#[command(version)]
#[command(about = "A concurrent, bounded web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Start from this URL instead of the configured seed
    #[arg(long, value_name = "URL")]
    seed: Option<String>,

    /// Override the page budget
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Override the results file path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli);
    validate(&config).context("invalid configuration after command-line overrides")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("threadwalk=info,warn"),
            1 => EnvFilter::new("threadwalk=debug,info"),
            2 => EnvFilter::new("threadwalk=trace,debug"),
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

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(seed) = &cli.seed {
        config.crawler.seed = Some(seed.clone());
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(output) = &cli.output {
        config.output.results_path = output.display().to_string();
    }
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Threadwalk Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Base URL: {}", config.crawler.base_url);
    println!("  Seed: {}", config.crawler.seed_url());
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Workers: {}", config.crawler.worker_count);
    println!(
        "  Politeness delay: {}-{}ms",
        config.crawler.min_delay, config.crawler.max_delay
    );

    println!("\nFetching:");
    println!("  Timeout: {}ms", config.fetch.timeout);
    println!("  Max retries: {}", config.fetch.max_retries);
    println!(
        "  Backoff: {}ms base, {}ms cap",
        config.fetch.backoff_base, config.fetch.backoff_cap
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    if let Some(contact) = &config.user_agent.contact_url {
        println!("  Contact URL: {}", contact);
    }

    println!("\nOutput:");
    println!("  Results: {}", config.output.results_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let results_path = config.output.results_path.clone();
    let crawler = Arc::new(Crawler::new(config).context("failed to start crawler")?);

    // Ctrl-C stops the crawl; pages already fetched are still saved
    let interrupt = {
        let crawler = crawler.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping crawl");
                crawler.cancel();
            }
        })
    };

    let outcome = crawler.run().await;
    interrupt.abort();

    // Persist whatever was collected, even when the crawl failed
    let pages = crawler.results();
    JsonFileSink::new(&results_path)
        .persist(&to_records(&pages))
        .with_context(|| format!("failed to write results to {}", results_path))?;

    match outcome {
        Ok(summary) => {
            print_summary(&summary, &pages);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
