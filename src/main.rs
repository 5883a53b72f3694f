//! Entity-Harvester main entry point
//!
//! This is the command-line interface for the entity graph harvester.

use anyhow::Context;
use clap::Parser;
use entity_harvester::config::{load_config_with_hash, Config};
use entity_harvester::crawler::Coordinator;
use entity_harvester::output::{print_inventory, print_summary};
use entity_harvester::storage::FileStore;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Entity-Harvester: a resumable, rate-limited JSON entity harvester
///
/// Entity-Harvester walks a remote API's listing endpoint and the
/// cross-references embedded in every fetched entity, and stores one JSON
/// file per entity. Files already on disk are skipped, so an interrupted
/// harvest resumes by simply running it again.
#[derive(Parser, Debug)]
#[command(name = "entity-harvester")]
#[command(version)]
#[command(about = "A resumable, rate-limited JSON entity harvester", long_about = None)]
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

    /// Fetch entities again even if they are already on disk
    #[arg(long)]
    revisit: bool,

    /// Validate config and show what would be harvested without harvesting
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show the entities already on disk and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    config.crawler.revisit |= cli.revisit;

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_harvest(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("entity_harvester=info,warn"),
            1 => EnvFilter::new("entity_harvester=debug,info"),
            2 => EnvFilter::new("entity_harvester=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Entity-Harvester Dry Run ===\n");

    println!("Remote:");
    println!("  Base URL: {}", config.remote.base());
    match config.remote.listing_url()? {
        Some(url) => println!("  Listing: {}", url),
        None => println!("  Listing: disabled (seeds only)"),
    }
    println!("  User agent: {}", config.remote.user_agent);
    println!("  Request timeout: {}s", config.remote.request_timeout_secs);

    println!("\nRate Limits:");
    println!("  Global: {}/s (burst {})", config.rate.global_per_second, config.rate.burst);
    println!("  Listing: {}/s", config.rate.listing_per_second);
    match config.rate.max_in_flight {
        Some(n) => println!("  Max in flight: {}", n),
        None => println!("  Max in flight: unlimited"),
    }

    println!("\nWorkers:");
    println!("  Fetch workers: {}", config.crawler.fetch_workers);
    println!("  Writers: {}", config.crawler.writer_workers);
    println!(
        "  Retries: {} (backoff from {}ms)",
        config.crawler.max_retries, config.crawler.retry_backoff_ms
    );
    println!(
        "  Frontier: capacity {}, discovery backlog {}",
        config.crawler.frontier_capacity, config.crawler.max_backlog
    );
    println!("  Revisit: {}", config.crawler.revisit);

    println!("\nOutput:");
    println!("  Root: {}", config.output.root);

    println!("\nEntity Types:");
    println!("  Excluded: {}", list_or_none(&config.entities.excluded));
    println!("  Follow-only: {}", list_or_none(&config.entities.follow_only));

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}/{}", seed.entity_type, seed.id);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

fn list_or_none(types: &[String]) -> String {
    if types.is_empty() {
        "none".to_string()
    } else {
        types.join(", ")
    }
}

/// Handles the --stats mode: shows what is already on disk
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let store = FileStore::new(&config.output.root);
    let inventory = store
        .inventory()
        .with_context(|| format!("Failed to read {}", config.output.root))?;

    print_inventory(store.root(), &inventory);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Seeds: {}, excluded types: {}, follow-only types: {}",
        config.seeds.len(),
        config.entities.excluded.len(),
        config.entities.follow_only.len()
    );

    let coordinator = Coordinator::new(config).context("Failed to start harvest")?;

    let shutdown = coordinator.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, stopping after queued writes are flushed");
                shutdown.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let summary = coordinator.run().await.context("Harvest failed")?;
    print_summary(&summary);

    Ok(())
}
