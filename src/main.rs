//! chartfeed CLI
//!
//! Runs the live feed against a telemetry server and logs series updates,
//! or writes a default configuration file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use chartfeed::config::{generate_default_config, Config};
use chartfeed::{
    init_logging, resolve_endpoint, shutdown_channel, ConnectionManager, FeedPipeline, Reconciler,
    WsConnector,
};

#[derive(Parser)]
#[command(name = "chartfeed")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live telemetry feed for charting dashboards")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the telemetry server and follow the feed
    Run {
        /// Config file (default: search the standard locations)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Origin the dashboard is served from, e.g. http://localhost:8081
        #[arg(long)]
        origin: Option<String>,
        /// Socket path on the origin
        #[arg(long)]
        path: Option<String>,
        /// Series to show and subscribe to (repeatable)
        #[arg(short, long = "series")]
        series: Vec<String>,
        /// Points retained per series
        #[arg(long)]
        retention: Option<usize>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            origin,
            path,
            series,
            retention,
        } => {
            let mut config = match config {
                Some(path) => Config::load_with_env(&path)?,
                None => Config::load_default(),
            };
            if let Some(origin) = origin {
                config.connection.origin = origin;
            }
            if let Some(path) = path {
                config.connection.path = path;
            }
            if let Some(retention) = retention {
                config.dashboard.retention_cap = retention;
            }
            for name in series {
                if !config.dashboard.series.contains(&name) {
                    config.dashboard.series.push(name);
                }
            }
            config.validate()?;

            run(config).await?;
        }

        Commands::Config { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)
                        .with_context(|| format!("writing {:?}", path))?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

async fn run(config: Config) -> anyhow::Result<()> {
    init_logging(&config.logging)?;

    tracing::info!("chartfeed v{}", env!("CARGO_PKG_VERSION"));

    let url = resolve_endpoint(&config.connection.origin, &config.connection.path)?;

    let mut reconciler = Reconciler::new(config.reconciler_options());
    for name in &config.dashboard.series {
        reconciler.register(name);
    }

    // Stand-in for a rendering layer: log every series update
    let reader = reconciler.reader();
    reader.subscribe(|update| {
        let latest = update.points.last();
        tracing::info!(
            series = %update.series,
            points = update.points.len(),
            cause = ?update.cause,
            latest_t = latest.map(|p| p.t),
            latest_v = latest.map(|p| p.v),
            "Series updated"
        );
    });

    let pipeline = FeedPipeline::new(reconciler);
    let counters = pipeline.counters();

    let mut manager = ConnectionManager::new(url.as_str(), Arc::new(WsConnector), config.manager_options());
    manager.on_message(pipeline);

    let mut status = manager.status();
    let status_task = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            if current.state.is_live() {
                tracing::info!(status = %current, "Feed live");
            } else {
                tracing::info!(status = %current, "Feed not live; showing stale data");
            }
        }
    });

    let (trigger, shutdown) = shutdown_channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
        tracing::info!("Shutting down...");
        trigger.trigger();
    });

    manager.run(shutdown).await;
    drop(manager);
    let _ = status_task.await;

    tracing::info!("Pipeline stats: {}", counters.snapshot());
    tracing::info!(series = reader.len(), "chartfeed shutdown complete");
    Ok(())
}
