//! PDMS development server
//!
//! Serves fixture records over the PDMS REST routes so the shape sync
//! engine can run without the real backend. Sync submissions are applied
//! to the in-memory store and forgotten on exit.
//!
//! Usage:
//!   pdms-devserver --port 5080 --fixture fixtures/plant.json

use std::{fs, path::PathBuf, sync::Arc};
use anyhow::{Context, Result};
use clap::Parser;
use pdms_devserver::{build_router, Fixture};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "pdms-devserver")]
#[command(about = "Fixture-backed PDMS backend for local development")]
struct Args {
    /// HTTP port to listen on
    #[arg(short, long, default_value = "5080")]
    port: u16,

    /// JSON file with projects, functions and materials to serve
    #[arg(short, long)]
    fixture: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_fixture(path: Option<&PathBuf>) -> Result<Fixture> {
    let Some(path) = path else {
        info!("No fixture given, starting empty");
        return Ok(Fixture::default());
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;
    let fixture = Fixture::from_json(&json)
        .with_context(|| format!("Failed to parse fixture {}", path.display()))?;
    info!(
        "Loaded fixture: {} projects, {} functions, {} materials",
        fixture.projects.len(),
        fixture.functions.len(),
        fixture.materials.len()
    );
    Ok(fixture)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let fixture = load_fixture(args.fixture.as_ref())?;
    let app = build_router(Arc::new(fixture.into_backend()));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port))
        .await
        .with_context(|| format!("Failed to bind port {}", args.port))?;
    info!("PDMS devserver listening on port {}", args.port);

    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}
