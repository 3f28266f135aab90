//! Watchlist main entry point
//!
//! This is the command-line interface for the watchlist listing monitor.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use watchlist::config::{load_config_with_hash, Config};
use watchlist::output::write_report;
use watchlist::run_watch_list;
use watchlist::sites::{input_path, load_watch_list, Site};

/// Watchlist: reports auction and shop listings you have not seen yet
///
/// Every run fetches the search or product pages named in the input lists,
/// compares the listings found against the watch history and writes a report
/// of the new ones.
#[derive(Parser, Debug)]
#[command(name = "watchlist")]
#[command(version)]
#[command(about = "Reports new auction and shop listings", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Watch Yahoo! Auctions keywords (default list: yahoo_keywords.txt)
    #[arg(short, long, value_name = "FILE", num_args = 0..=1)]
    yahoo: Option<Option<PathBuf>>,

    /// Also watch Diskunion products (default list: diskunion_items.txt)
    #[arg(short, long, value_name = "FILE", num_args = 0..=1)]
    diskunion: Option<Option<PathBuf>>,

    /// Watch Diskunion products only
    #[arg(long)]
    diskunion_only: bool,

    /// Show the requests that would be made without fetching anything
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Sites to watch, in run order, with the input list given for each
    fn sites(&self) -> Vec<(Site, Option<PathBuf>)> {
        let mut sites = Vec::new();
        if !self.diskunion_only {
            sites.push((Site::Yahoo, self.yahoo.clone().flatten()));
        }
        if self.diskunion_only || self.diskunion.is_some() {
            sites.push((Site::Diskunion, self.diskunion.clone().flatten()));
        }
        sites
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    for (site, file) in cli.sites() {
        let input = input_path(site, file.as_deref(), &config.paths.data_dir);
        let list = load_watch_list(site, &input, &config.paths.data_dir)?;

        if cli.dry_run {
            handle_dry_run(site, &list);
        } else {
            handle_watch(&config, site, &input, &list)?;
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("watchlist=info,warn"),
            1 => EnvFilter::new("watchlist=debug,info"),
            2 => EnvFilter::new("watchlist=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: shows each query and its request
fn handle_dry_run(site: Site, list: &watchlist::WatchList) {
    println!("=== {} ({} queries) ===", site.title(), list.len());
    println!("History: {}", list.history_path.display());

    for query in &list.queries {
        println!("  - {}", query.label());
        println!("    {}://{}{}", list.scheme, list.host, query.target());
    }
    println!();
}

/// Runs one watch list and writes its report
fn handle_watch(
    config: &Config,
    site: Site,
    input: &std::path::Path,
    list: &watchlist::WatchList,
) -> anyhow::Result<()> {
    let outcome = run_watch_list(config, list)
        .with_context(|| format!("Watching {} failed", site.title()))?;

    match write_report(&config.paths.report_dir, site.title(), input, &outcome)? {
        Some(path) => println!(
            "{}: {} new item(s), report written to {}",
            site.title(),
            outcome.new_item_count(),
            path.display()
        ),
        None => println!("{}: nothing new", site.title()),
    }

    for failure in outcome.failures() {
        eprintln!("{}: skipped {}: {}", site.title(), failure.label, failure.error);
    }

    Ok(())
}
