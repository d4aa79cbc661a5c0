// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes and shared state. The webhook signature gate lives in
//! the POST handler itself rather than middleware: verification needs the
//! raw body bytes, and only that one route is signed.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use waflow_core::{AutoSuppressionConfig, WaflowError};
use waflow_storage::Database;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Single-writer database handle.
    pub db: Database,
    /// Webhook HMAC app secret. Empty enables compatibility mode.
    pub app_secret: String,
    /// Token expected in the provider's subscription handshake.
    pub verify_token: String,
    /// Auto-suppression policy injected into failure ingestion.
    pub suppression: AutoSuppressionConfig,
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field(
                "app_secret",
                &if self.app_secret.is_empty() { "unset" } else { "[redacted]" },
            )
            .field(
                "verify_token",
                &if self.verify_token.is_empty() { "unset" } else { "[redacted]" },
            )
            .finish_non_exhaustive()
    }
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Build the gateway router. Exposed separately from [`start_server`] so
/// tests can drive it with `tower::ServiceExt::oneshot`.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/webhook", get(handlers::get_webhook))
        .route("/webhook", post(handlers::post_webhook))
        .route(
            "/v1/campaigns/{campaign_id}/runs",
            get(handlers::get_campaign_runs),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway HTTP server and serve until the task is cancelled.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), WaflowError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WaflowError::Internal(format!("failed to bind {addr}: {e}")))?;

    tracing::info!(addr, "gateway listening");
    axum::serve(listener, build_router(state))
        .await
        .map_err(|e| WaflowError::Internal(format!("gateway server error: {e}")))
}
