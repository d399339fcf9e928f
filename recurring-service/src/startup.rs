//! Application startup and lifecycle management.

use crate::config::RecurringConfig;
use crate::handlers;
use crate::services::{init_metrics, spawn_periodic_runner, Database, Scheduler};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: RecurringConfig,
    pub scheduler: Arc<Scheduler>,
}

/// HTTP routes: batch trigger, due-set preview, health, readiness and metrics.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/recurring/run", post(handlers::run_batch))
        .route("/recurring/due", get(handlers::list_due_templates))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application against PostgreSQL.
    pub async fn build(config: RecurringConfig) -> Result<Self, AppError> {
        // Connect to database
        let db = Arc::new(
            Database::new(
                &config.database.url,
                config.database.max_connections,
                config.database.min_connections,
            )
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                e
            })?,
        );

        let scheduler = Arc::new(Scheduler::new(db.clone(), db.clone(), db));
        Self::build_with_scheduler(config, scheduler).await
    }

    /// Build the application around an already wired scheduler.
    pub async fn build_with_scheduler(
        config: RecurringConfig,
        scheduler: Arc<Scheduler>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let http_addr = config.common.socket_addr();
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %http_addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "Recurring service listener bound");

        Ok(Self {
            http_port,
            http_listener,
            state: AppState { config, scheduler },
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Get a handle to the scheduler.
    pub fn scheduler(&self) -> Arc<Scheduler> {
        self.state.scheduler.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let runner = self.state.config.scheduler.period().map(|period| {
            spawn_periodic_runner(
                self.state.scheduler.clone(),
                period,
                self.state.config.scheduler.run_on_startup,
            )
        });

        let http_router = router(self.state);

        tracing::info!(
            service = "recurring-service",
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        let result = axum::serve(self.http_listener, http_router).await;

        if let Some(runner) = runner {
            runner.abort();
        }

        result.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
