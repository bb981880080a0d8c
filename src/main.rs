use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use homily::config::Config;
use homily::storage::ResetScope;

mod commands;

#[derive(Parser)]
#[command(
    name = "homily",
    version,
    about = "Scheduler that alternates devotional texts and harvested sermon links",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "HOMILY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, pretty, json); defaults to [logging].format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one publish cycle
    Run {
        /// Publish even if the minimum interval has not elapsed
        #[arg(long, default_value = "false")]
        force: bool,
    },

    /// Refill the secondary backlog now
    Harvest,

    /// Show publication statistics
    Stats {
        /// Print as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Show recent publication history
    History {
        /// Number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Reset part of the registry
    Reset {
        /// What to reset: recent, harvest, history or all
        scope: ResetScope,

        /// Skip the confirmation prompt
        #[arg(long, default_value = "false")]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&format, &config.logging.level, cli.verbose)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(dispatch(cli.command, config))
}

async fn dispatch(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Run { force } => {
            tracing::info!(force = %force, "Starting run command");
            commands::run(config, force).await
        }
        Commands::Harvest => {
            tracing::info!("Starting harvest command");
            commands::harvest(config).await
        }
        Commands::Stats { json } => commands::stats(config, json),
        Commands::History { limit } => commands::history(config, limit),
        Commands::Reset { scope, yes } => {
            tracing::info!(scope = %scope, "Starting reset command");
            commands::reset(config, scope, yes)
        }
    }
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("homily=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(format!("homily={level},warn")))
            .context("Invalid log level")?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_target(false))
                .init();
        }
    }

    Ok(())
}
