//! News crawler CLI
//!
//! Runs the configured spiders once or on a schedule.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use news_crawler::{
    config::load_config,
    error::{AppError, Result},
    models::{ScheduleConfig, ScheduleUnit},
    pipeline::Orchestrator,
    scheduler::{effective_schedule, run_every},
    storage::JsonCacheStore,
};

/// news-crawler - notifies you about new listings
#[derive(Parser, Debug)]
#[command(
    name = "news-crawler",
    version,
    about = "Crawls listing sites and notifies about new items"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory (overrides `cache.dir`)
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Append log output to this file instead of stderr
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run spiders and send notifications about new items
    Scrape {
        /// Spider to run (repeatable, default: all)
        #[arg(short = 's', long = "spider")]
        spiders: Vec<String>,

        #[command(subcommand)]
        schedule: Option<ScheduleCommand>,
    },

    /// Validate the configuration file
    Validate,

    /// Show cached history per spider
    History,
}

#[derive(Subcommand, Debug)]
enum ScheduleCommand {
    /// Repeat the scrape periodically
    Schedule {
        /// Number of units between runs
        #[arg(long)]
        every: u64,

        /// seconds, minutes, hours or days
        #[arg(long, default_value = "minutes")]
        units: ScheduleUnit,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, file: Option<&Path>) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    builder.format_timestamp_secs();

    if let Some(path) = file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

async fn scrape_once(orchestrator: &Orchestrator, spiders: &[String]) {
    match orchestrator.run_selected(spiders).await {
        Ok(report) => {
            report.log_summary();
            for outcome in report.outcomes.iter().filter(|o| o.is_failed()) {
                log::error!(
                    "{} failed while {}: {}",
                    outcome.collector,
                    outcome.failed_at.map(|s| s.as_str()).unwrap_or("running"),
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        Err(e) => log::error!("Scrape run aborted: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log.as_deref())?;

    let (config_path, mut config) = load_config(cli.config.as_deref())?;
    log::info!("Loaded configuration from {}", config_path.display());

    if let Some(cache) = cli.cache {
        config.cache.dir = cache;
    }

    match cli.command {
        Command::Scrape { spiders, schedule } => {
            if let Some(unknown) = spiders.iter().find(|s| !config.spiders.contains_key(*s)) {
                return Err(AppError::config(format!(
                    "unknown spider '{unknown}' (configured: {})",
                    config.spider_names().join(", ")
                )));
            }

            let cli_schedule = schedule.map(|ScheduleCommand::Schedule { every, units }| {
                ScheduleConfig { every, units }
            });

            let orchestrator = Orchestrator::from_config(&config)?;

            match effective_schedule(cli_schedule, config.schedule) {
                Some(schedule) => {
                    if schedule.every == 0 {
                        return Err(AppError::validation("schedule --every must be > 0"));
                    }
                    log::info!(
                        "Scraping every {} {:?}",
                        schedule.every,
                        schedule.units
                    );
                    let orchestrator = &orchestrator;
                    let spiders = spiders.as_slice();
                    run_every(schedule.period(), || scrape_once(orchestrator, spiders)).await;
                }
                None => scrape_once(&orchestrator, &spiders).await,
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            Orchestrator::from_config(&config)?;
            log::info!(
                "✓ Config OK ({} spiders: {})",
                config.spiders.len(),
                config.spider_names().join(", ")
            );
        }

        Command::History => {
            let store = JsonCacheStore::new(&config.cache.dir);
            let entries = store.list().await?;
            log::info!("Cache directory: {}", store.root_dir().display());

            if entries.is_empty() {
                log::info!("No cached history yet.");
            }
            for entry in entries {
                log::info!("  {}: {} records", entry.collector, entry.count);
            }
        }
    }

    Ok(())
}
