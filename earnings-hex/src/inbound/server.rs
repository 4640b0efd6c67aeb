//! HTTP server configuration and startup.

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use earnings_types::{LedgerRepository, PaymentGateway};

use super::handlers::{self, AppState};
use crate::EarningsService;
use crate::openapi::ApiDoc;

/// HTTP server for the earnings ledger API.
pub struct HttpServer<R: LedgerRepository, G: PaymentGateway> {
    state: Arc<AppState<R, G>>,
}

impl<R: LedgerRepository, G: PaymentGateway> HttpServer<R, G> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: EarningsService<R, G>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/charges", post(handlers::ingest_charge::<R, G>))
            .route(
                "/api/providers/{id}/balance",
                get(handlers::get_balance::<R, G>),
            )
            .route(
                "/api/providers/{id}/payouts",
                get(handlers::list_payouts::<R, G>),
            )
            .route(
                "/api/providers/{id}/reconcile",
                post(handlers::reconcile_provider::<R, G>),
            )
            .route("/api/payouts", post(handlers::create_payout::<R, G>))
            .route(
                "/api/payouts/{key}/cancel",
                post(handlers::cancel_payout::<R, G>),
            )
            .route("/api/analytics", get(handlers::get_analytics::<R, G>))
            .route(
                "/api-docs/openapi.json",
                get(|| async { Json(ApiDoc::openapi()) }),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
