//! Pawnshop Server
//!
//! Runs the loan lifecycle engine: scheduled overdue/confiscation processing,
//! late-fee accrual, customer reminders and an operational HTTP surface.

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::TraceLayer;

use pawnshop_server::app_state::AppState;
use pawnshop_server::clock::SystemClock;
use pawnshop_server::collateral::PgItemStore;
use pawnshop_server::config::Config;
use pawnshop_server::customer::PgCustomerStore;
use pawnshop_server::db;
use pawnshop_server::jobs::{register_engine_jobs, EngineDeps, EngineSettings, Scheduler};
use pawnshop_server::loan::PgLoanStore;
use pawnshop_server::notification::{
    HttpNotificationSender, LogNotificationSender, NotificationSender,
};
use pawnshop_server::routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        environment = config.environment.as_str(),
        branch_id = config.branch_id,
        utc_offset = %config.business_utc_offset,
        "Starting pawnshop server"
    );

    let db_pool = db::create_pool(&config).await?;
    db::run_migrations(&db_pool).await?;

    let sender: Arc<dyn NotificationSender> = match &config.notification_service_url {
        Some(url) => {
            let sender = HttpNotificationSender::new(
                url,
                Duration::from_secs(config.notification_timeout_seconds),
            );
            tracing::info!(endpoint = sender.endpoint(), "Notifications go to the notification service");
            Arc::new(sender)
        }
        None => {
            tracing::warn!("NOTIFICATION_SERVICE_URL not set, notifications will only be logged");
            Arc::new(LogNotificationSender)
        }
    };

    let deps = EngineDeps {
        loans: Arc::new(PgLoanStore::new(db_pool.clone(), config.loan_page_size)),
        items: Arc::new(PgItemStore::new(db_pool.clone())),
        customers: Arc::new(PgCustomerStore::new(db_pool.clone())),
        sender,
        clock: Arc::new(SystemClock),
    };

    let mut scheduler = Scheduler::new();
    register_engine_jobs(&mut scheduler, &deps, &EngineSettings::from(&config)).await?;
    scheduler.start();

    let app_state = AppState::new(db_pool.clone(), scheduler.status_board());

    let app = Router::new()
        .merge(routes::ops_routes())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    db_pool.close().await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
