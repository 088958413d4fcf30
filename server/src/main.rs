//! Seminar signup HTTP server.
//!
//! Composition root: configuration, tracing, the Postgres store, initial
//! seeding, and the Axum server with graceful shutdown.

use seminar_signup_core::SystemClock;
use seminar_signup_postgres::PostgresSessionStore;
use seminar_signup_server::seed::seed_if_empty;
use seminar_signup_server::{build_router, AppState, Config};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "seminar_signup_server=info,seminar_signup_core=info,tower_http=info".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        host = %config.server.host,
        port = config.server.port,
        admin_enabled = config.admin_passcode.is_some(),
        "Configuration loaded"
    );

    info!("Connecting to session store...");
    let store = Arc::new(
        PostgresSessionStore::connect_with(
            &config.database.url,
            config.database.max_connections,
            Duration::from_secs(config.database.connect_timeout),
        )
        .await?,
    );
    info!("Session store connected");

    let seeded = seed_if_empty(store.as_ref()).await?;
    if seeded > 0 {
        info!(count = seeded, "Seeded initial sessions");
    }

    let state = AppState::new(store, Arc::new(SystemClock), Arc::new(config.clone()));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
