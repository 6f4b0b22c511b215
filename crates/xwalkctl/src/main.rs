//! xwalkctl - operator CLI for the crosswalk controller
//!
//! Subcommands:
//! - `xwalkctl status` - Query controller state and component liveness
//! - `xwalkctl trigger [--walk W]` - Run a selection, or queue a named walk
//! - `xwalkctl reset` - Broadcast a reset to every station
//! - `xwalkctl press|release|timer|tick` - Publish a synthetic interaction
//! - `xwalkctl beat --component C` - Publish heartbeats as a station would
//! - `xwalkctl simulate --catalog P` - Offline selection distribution

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use xwalkconf::XwalkConfig;
use xwalkproto::{ComponentRole, InteractionKind};

mod commands;
mod simulate;

#[derive(Parser)]
#[command(name = "xwalkctl")]
#[command(about = "Operator CLI for the crosswalk controller")]
#[command(version)]
struct Cli {
    /// Config file (replaces ./xwalk.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print raw JSON replies instead of a summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query controller status
    Status,

    /// Run a selection now, or play a specific walk
    Trigger {
        /// Walk id to queue instead of drawing one
        #[arg(short, long)]
        walk: Option<String>,
    },

    /// Broadcast a reset command
    Reset,

    /// Publish a button press
    Press {
        #[arg(short, long, default_value = "xwalkctl")]
        source: String,
    },

    /// Publish a button release
    Release {
        #[arg(short, long, default_value = "xwalkctl")]
        source: String,
    },

    /// Publish a timer expiry
    Timer {
        #[arg(short, long, default_value = "xwalkctl")]
        source: String,
    },

    /// Publish a scheduler tick
    Tick {
        #[arg(short, long, default_value = "xwalkctl")]
        source: String,
    },

    /// Publish heartbeats for a component
    Beat {
        /// Component id
        #[arg(long)]
        component: String,

        /// Role (inferred from the component id when omitted)
        #[arg(long)]
        role: Option<ComponentRole>,

        /// Number of heartbeats to send
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,

        /// Interval between heartbeats (e.g. "1s", "500ms")
        #[arg(long, default_value = "1s", value_parser = xwalkconf::duration::parse)]
        every: Duration,
    },

    /// Simulate selections offline and print the distribution
    Simulate {
        /// Walk catalog YAML (defaults to catalog.path from config)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Weight profile (defaults to the one active now)
        #[arg(short, long)]
        profile: Option<String>,

        /// Number of selections
        #[arg(short = 'n', long, default_value = "10000")]
        trials: u32,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,

        /// Apply the catalog's cooldowns
        #[arg(long)]
        cooldown: bool,

        /// Simulated time between selections when cooldowns apply
        #[arg(long, default_value = "30s", value_parser = xwalkconf::duration::parse)]
        step: Duration,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config =
        XwalkConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Status => commands::status(&config, cli.json).await?,
        Commands::Trigger { walk } => commands::trigger(&config, walk, cli.json).await?,
        Commands::Reset => commands::reset(&config, cli.json).await?,
        Commands::Press { source } => {
            commands::interaction(&config, InteractionKind::Press, &source).await?
        }
        Commands::Release { source } => {
            commands::interaction(&config, InteractionKind::Release, &source).await?
        }
        Commands::Timer { source } => {
            commands::interaction(&config, InteractionKind::TimerExpired, &source).await?
        }
        Commands::Tick { source } => {
            commands::interaction(&config, InteractionKind::SchedulerTick, &source).await?
        }
        Commands::Beat {
            component,
            role,
            count,
            every,
        } => commands::beat(&config, &component, role, count, every).await?,
        Commands::Simulate {
            catalog,
            profile,
            trials,
            seed,
            cooldown,
            step,
        } => {
            let path = catalog.unwrap_or_else(|| config.bootstrap.catalog.path.clone());
            let options = simulate::Options {
                profile,
                trials,
                seed,
                cooldown: cooldown.then_some(step),
            };
            simulate::run(&path, &options)?;
        }
    }

    Ok(())
}
