mod cleanup;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use chirpy_api::auth::{AppState, AppStateInner};
use chirpy_db::Database;

#[derive(Parser)]
#[command(author, version, about = "Chirpy API server")]
struct Cli {
    /// Start from an empty database, wiping any existing contents.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "chirpy=debug,chirpy_api=debug,chirpy_db=debug,tower_http=debug".into()
            }),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("CHIRPY_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let polka_key = std::env::var("CHIRPY_POLKA_KEY").unwrap_or_else(|_| "dev-polka-key".into());
    let db_path = std::env::var("CHIRPY_DB_PATH").unwrap_or_else(|_| "database.json".into());
    let file_root: PathBuf = std::env::var("CHIRPY_FILE_ROOT")
        .unwrap_or_else(|_| ".".into())
        .into();
    let host = std::env::var("CHIRPY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CHIRPY_PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()?;
    let retention_hours: i64 = std::env::var("CHIRPY_REVOCATION_RETENTION_HOURS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1440); // 60 days, matching the refresh token lifetime

    if cli.debug {
        info!("Debug mode: resetting database at {}", db_path);
    }

    // Init database
    let db = Database::open(&PathBuf::from(&db_path), cli.debug)?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        polka_key,
        fileserver_hits: AtomicU64::new(0),
    });

    // Background revocation pruning (runs every hour); 0 hours disables it
    if retention_hours > 0 {
        tokio::spawn(cleanup::run_cleanup_loop(
            state.clone(),
            retention_hours,
            3600,
        ));
    }

    let app = chirpy_api::router(state, &file_root)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Chirpy server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
