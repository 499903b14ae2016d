pub mod app;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;

use std::future::IntoFuture;
use std::time::Duration;

use anyhow::Result;
use clap::Subcommand;
use sea_orm_migration::MigratorTrait;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::app_context::AppContext;
use crate::config::{DatabaseConfig, ServerConfig};
use crate::database::{establish_connection, migrations::Migrator};

/// Upper bound on draining in-flight requests after a shutdown signal.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(10);

#[derive(Subcommand, Debug)]
pub enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

pub async fn start_server(server: &ServerConfig, database: &DatabaseConfig) -> Result<()> {
    let db = establish_connection(database).await?;
    info!(
        max_open_conns = database.max_open_conns,
        max_idle_conns = database.max_idle_conns,
        "database pool ready"
    );

    let ctx = AppContext::new(db).with_request_timeout(server.request_timeout());
    let app = app::create_app(ctx, server.cors_origin.as_deref())?;

    let addr = server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{}{}", addr, app::API_BASE_PATH);

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let serve = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = stop_tx.send(true);
        })
        .into_future();

    let drain_deadline = async move {
        if stop_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(SHUTDOWN_DRAIN).await;
    };

    tokio::select! {
        result = serve => result?,
        _ = drain_deadline => {
            warn!(drain_secs = SHUTDOWN_DRAIN.as_secs(), "in-flight requests did not drain in time");
        }
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining requests");
}

pub async fn migrate_database(database: &DatabaseConfig, direction: MigrateDirection) -> Result<()> {
    let db = establish_connection(database).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(&db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(&db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (down then up)");
            Migrator::down(&db, None).await?;
            Migrator::up(&db, None).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}
