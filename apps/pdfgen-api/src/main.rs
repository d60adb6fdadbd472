//! pdfgen API Server - JSON to PDF through LaTeX
//!
//! Provides REST endpoints for:
//! - Template-driven compilation (`/compile`, `/proposal`)
//! - Stored customer headers with versioned updates
//! - Raw `.tex` and multi-file bundle uploads
//! - Toolchain health

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod handlers;
mod models;
mod routes;
mod state;
mod store;


use config::Args;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env()
            .add_directive("pdfgen_api=info".parse()?)
            .add_directive("latex_engine=info".parse()?)
            .add_directive("tower_http=debug".parse()?)
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Initializing pdfgen API...");
    let engine_config = args.engine_config();

    // Orphans from a previous run; must happen before any request is served
    let swept = latex_engine::sweep(&engine_config.temp_root, args.purge_temp_on_start);
    info!(
        root = %engine_config.temp_root.display(),
        removed = swept.removed,
        failed = swept.failed,
        "Swept temp root"
    );

    let state = Arc::new(AppState::new(&args).await?);

    let report = state.engine.health().await;
    for binary in &report.binaries {
        info!(
            role = binary.role,
            program = %binary.program,
            path = ?binary.resolved_path,
            version = ?binary.version,
            "Toolchain binary"
        );
    }
    if !report.ready {
        warn!("No LaTeX toolchain found; compile requests will fail until one is installed");
    }

    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting pdfgen API on http://{}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
