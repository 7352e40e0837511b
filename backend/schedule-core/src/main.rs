// src/main.rs
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod data_source;
mod models;
mod schedule_table;
mod server;


use config::Config;
use data_source::{JsonFileLoader, SnapshotCache};
use schedule_table::compute_schedule_table;
use server::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(
    name = "schedule-core",
    version,
    about = "Serves worked hours per position and worker, pivoted by date"
)]
struct Cli {
    /// Directory holding the JSON datasets (overrides DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Port to listen on (overrides SERVER_PORT)
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Compute the schedule table once and write it to stdout
    Print {
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration from environment")?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(port) = cli.port {
        config.server_port = port;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.default_log_level().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cache = SnapshotCache::new(JsonFileLoader::new(&config.data_dir));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, cache).await,
        Command::Print { format } => print_table(&cache, format),
    }
}

async fn serve(config: Config, cache: SnapshotCache) -> Result<()> {
    info!("Starting schedule server in {} mode", config.environment);
    info!("Reading schedule data from {:?}", config.data_dir);

    let allowed_origins = config
        .allowed_origins()
        .map_err(|e| anyhow!("Invalid CORS_ALLOWED_ORIGINS: {}", e))?;
    let app = build_router(AppState::new(cache), allowed_origins);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await.context("HTTP server failed")?;

    Ok(())
}

fn print_table(cache: &SnapshotCache, format: OutputFormat) -> Result<()> {
    let snapshot = cache.snapshot().context("Failed to load schedule data")?;
    let table = compute_schedule_table(snapshot.as_ref()).context("Failed to process schedule data")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &table)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => table.write_csv(&mut out)?,
    }
    Ok(())
}
