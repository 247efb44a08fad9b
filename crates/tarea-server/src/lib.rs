pub mod db;
pub mod error;
pub mod routes;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{ArgAction, Parser};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

pub use db::Db;
pub use routes::router;

#[derive(Parser, Debug, Clone)]
#[command(name = "tarea-server", version, about = "REST task service for the tarea tracker")]
pub struct ServerCli {
    /// Listen port; falls back to $PORT, then 3000.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// SQLite database path; falls back to $DATABASE_URL, then ./data/tarea.db.
    #[arg(long = "db")]
    pub db: Option<PathBuf>,

    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 2 {
        "trace"
    } else if verbose == 1 {
        "debug"
    } else {
        "info"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[tracing::instrument(skip_all)]
pub fn run() -> anyhow::Result<()> {
    let cli = ServerCli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    let port = cli
        .port
        .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
        .unwrap_or(3000);
    let db_path = cli
        .db
        .or_else(|| std::env::var("DATABASE_URL").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./data/tarea.db"));

    let db = Db::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    db.seed_default_categories()
        .context("failed to seed default categories")?;
    let app = routes::router(Arc::new(db));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;
        info!(port, db = %db_path.display(), "task service listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")
    })
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
