// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.
//!
//! Handles the provider webhook (handshake + status ingestion), the
//! read-only run-listing endpoint, and health.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use waflow_core::{DeliveryRun, DeliveryStatus};
use waflow_engine::classify_payload;
use waflow_storage::queries::{events, suppression};
use waflow_webhook::{
    SIGNATURE_HEADER, check_verify_token, parse_status_events, verify_signature,
};

use crate::server::GatewayState;

/// Default page size for the run listing.
const DEFAULT_RUNS_LIMIT: usize = 20;
/// Hard cap on the run listing page size.
const MAX_RUNS_LIMIT: usize = 100;

/// Error envelope returned on every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
    /// Diagnostic details, when safe to expose.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /health
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Query parameters of the provider's subscription handshake.
#[derive(Debug, Deserialize)]
pub struct HubChallenge {
    #[serde(rename = "hub.mode", default)]
    pub mode: String,
    #[serde(rename = "hub.verify_token", default)]
    pub verify_token: String,
    #[serde(rename = "hub.challenge", default)]
    pub challenge: String,
}

/// GET /webhook subscription handshake. Echoes the challenge when the
/// verify token matches the configured value.
pub async fn get_webhook(
    State(state): State<GatewayState>,
    Query(params): Query<HubChallenge>,
) -> Response {
    if check_verify_token(&state.verify_token, &params.mode, &params.verify_token) {
        params.challenge.into_response()
    } else {
        tracing::warn!(mode = %params.mode, "webhook handshake rejected");
        (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("verification failed")),
        )
            .into_response()
    }
}

/// Response body for POST /webhook.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    /// Number of status events applied through the transition guard.
    pub processed: usize,
}

/// POST /webhook: authenticated status ingestion.
///
/// The signature is verified over the exact raw body bytes before any
/// parsing. A rejection response never includes the computed MAC or any
/// hint about the secret.
pub async fn post_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !verify_signature(&state.app_secret, &body, signature) {
        tracing::warn!("webhook rejected: signature verification failed");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("signature verification failed")),
        )
            .into_response();
    }

    let events = match parse_status_events(&body) {
        Ok(events) => events,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_details("malformed webhook body", e.to_string())),
            )
                .into_response();
        }
    };

    let mut processed = 0;
    for event in events {
        match ingest_status(&state, &event).await {
            Ok(applied) => {
                if applied {
                    processed += 1;
                }
            }
            Err(e) => {
                // One bad event must not fail the whole batch; the provider
                // retries batches wholesale.
                tracing::error!(phone = %event.phone, error = %e, "status ingestion failed");
            }
        }
    }

    (StatusCode::OK, Json(WebhookAck { processed })).into_response()
}

/// Apply one status callback: resolve the campaign through the latest
/// dispatch row for the phone, run the transition guard, and feed failure
/// details into the suppression flow.
async fn ingest_status(
    state: &GatewayState,
    event: &waflow_webhook::StatusEvent,
) -> Result<bool, waflow_core::WaflowError> {
    let Some(row) = events::find_latest_by_phone(&state.db, &event.phone).await? else {
        tracing::debug!(phone = %event.phone, "status for unknown recipient, ignoring");
        return Ok(false);
    };

    let applied =
        events::apply_status(&state.db, &row.campaign_id, &event.phone, event.status).await?;

    if event.status == DeliveryStatus::Failed
        && let Some(provider_error) = &event.error
    {
        let classification = classify_payload(provider_error);
        suppression::process_failure(
            &state.db,
            &state.suppression,
            &event.phone,
            classification.raw_code,
            &classification.user_message,
        )
        .await?;
    }

    Ok(applied)
}

/// Query parameters for the run listing.
#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Response body for GET /v1/campaigns/{id}/runs.
#[derive(Debug, Serialize)]
pub struct RunsResponse {
    pub campaign_id: String,
    pub runs: Vec<DeliveryRun>,
}

/// GET /v1/campaigns/{id}/runs: reconciled run listing.
///
/// Read-only and uncached: operators hit this while diagnosing a live
/// incident, so every response must reflect current state.
pub async fn get_campaign_runs(
    State(state): State<GatewayState>,
    Path(campaign_id): Path<String>,
    Query(query): Query<RunsQuery>,
) -> Response {
    let campaign_id = campaign_id.trim().to_string();
    if campaign_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("missing or invalid campaign id")),
        )
            .into_response();
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_RUNS_LIMIT)
        .clamp(1, MAX_RUNS_LIMIT);

    match waflow_storage::list_runs(&state.db, &campaign_id, limit).await {
        Ok(runs) => (
            StatusCode::OK,
            [(header::CACHE_CONTROL, "no-store")],
            Json(RunsResponse { campaign_id, runs }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(campaign_id, error = %e, "run listing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::with_details(
                    "failed to list delivery runs",
                    e.to_string(),
                )),
            )
                .into_response()
        }
    }
}
