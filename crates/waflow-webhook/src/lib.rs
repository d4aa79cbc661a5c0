// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook ingestion support: signature verification and payload parsing.
//!
//! [`signature`] gates the ingestion entry point with HMAC-SHA256 over the
//! raw request body; [`events`] flattens the provider's nested callback
//! envelope into per-message status events.

pub mod events;
pub mod signature;

pub use events::{StatusEvent, check_verify_token, parse_status_events};
pub use signature::{SIGNATURE_HEADER, SIGNATURE_PREFIX, compute_signature, verify_signature};
