// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP boundary around the Waflow delivery engine.
//!
//! Routes:
//! - `GET /health`: liveness.
//! - `GET /webhook`: provider subscription handshake.
//! - `POST /webhook`: signed status ingestion (HMAC gate, then the
//!   storage transition guard and suppression flow).
//! - `GET /v1/campaigns/{id}/runs`: reconciled run listing, uncached.

pub mod handlers;
pub mod server;

pub use server::{GatewayState, ServerConfig, build_router, start_server};
