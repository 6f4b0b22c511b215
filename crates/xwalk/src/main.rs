//! xwalk - crosswalk installation controller
//!
//! Loads config and the walk catalog, binds the bus, and runs the
//! controller until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use xwalk::{telemetry, Controller, ControllerSettings, SystemClock, WalkLibrary, ZmqBus};
use xwalkconf::XwalkConfig;

#[derive(Parser, Debug)]
#[command(name = "xwalk")]
#[command(about = "Crosswalk installation controller")]
#[command(version)]
struct Cli {
    /// Config file (replaces ./xwalk.toml; system and user files still load first)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Walk catalog YAML (overrides catalog.path)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Validate config and catalog, print a summary, and exit
    #[arg(long)]
    check: bool,

    /// Seed the selection RNG (for reproducible runs)
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = XwalkConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(catalog) = cli.catalog {
        config.bootstrap.catalog.path = catalog;
    }

    if cli.print_config {
        print!("{}", config.to_toml());
        return Ok(());
    }

    let telemetry = telemetry::init(&config.infra.telemetry)
        .context("Failed to initialize telemetry")?;

    for file in &sources.files {
        info!("Loaded config from {}", file.display());
    }
    for var in &sources.env_overrides {
        info!("Config override from ${}", var);
    }

    let catalog_path = config.bootstrap.catalog.path.clone();
    let library = match WalkLibrary::load(&catalog_path) {
        Ok(library) => library,
        Err(e) => {
            error!("Cannot start without a valid catalog: {}", e);
            telemetry.shutdown();
            return Err(e).context("Failed to load walk catalog");
        }
    };
    let settings = ControllerSettings::from_config(&config)?;

    if cli.check {
        print_summary(&library, &catalog_path);
        telemetry.shutdown();
        return Ok(());
    }

    let bus = match ZmqBus::bind(&config) {
        Ok(bus) => bus,
        Err(e) => {
            error!("Cannot bind the bus: {:#}", e);
            telemetry.shutdown();
            return Err(e);
        }
    };

    let rng = match cli.seed {
        Some(seed) => {
            info!(seed, "Using seeded selection RNG");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let mut controller = Controller::new(library, bus, settings, Arc::new(SystemClock), rng);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    controller.run(shutdown).await;

    telemetry.shutdown();
    Ok(())
}

fn print_summary(library: &WalkLibrary, path: &std::path::Path) {
    let catalog = library.catalog();
    let resolver = library.resolver();
    let cooldown = library.cooldown_settings();

    println!("catalog: {}", path.display());
    println!(
        "  {} walks in {} categories",
        catalog.walk_count(),
        catalog.categories().len()
    );
    for category in catalog.categories() {
        let marker = if category.cooldown_enabled { " (cooldown)" } else { "" };
        println!("  {:<20} {:>3} walks{}", category.id, category.walks.len(), marker);
    }

    let mut profiles: Vec<_> = resolver.profile_names().collect();
    profiles.sort_unstable();
    println!("weight profiles: {}", profiles.join(", "));
    println!("menu entries: {}", resolver.menu().entries().len());
    println!(
        "walk cooldown: {}s, category cooldown: {}s",
        cooldown.walk_cooldown.num_seconds(),
        cooldown.category_cooldown.num_seconds()
    );
    if let Some(fallback) = library.fallback_walk() {
        println!("fallback walk: {}", fallback);
    }
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                match signal(SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        error!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
