// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HMAC-SHA256 verification of inbound provider callbacks.
//!
//! The provider signs the raw request body and sends the signature in the
//! `X-Hub-Signature-256` header as `sha256=<hex>`. Verification must run
//! over the exact raw bytes: re-serializing a parsed body changes
//! whitespace and breaks the MAC.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the provider's body signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Algorithm prefix expected on the signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify a callback signature against the configured app secret.
///
/// An empty `app_secret` enables compatibility mode and accepts every
/// request, so deployments that have not yet configured a secret do not
/// have their traffic silently rejected. Any non-empty secret, including a
/// whitespace-only one, disables compatibility mode.
///
/// With a secret configured: the header must carry the `sha256=` prefix and
/// a hex MAC of the right length; the MAC is checked against HMAC-SHA256
/// over the raw body using a constant-time comparison. Malformed input
/// rejects, it never panics.
pub fn verify_signature(app_secret: &str, raw_body: &[u8], signature_header: &str) -> bool {
    if app_secret.is_empty() {
        return true;
    }

    let Some(received_hex) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
        tracing::debug!("webhook signature rejected: missing sha256= prefix");
        return false;
    };

    let Ok(received) = hex::decode(received_hex) else {
        tracing::debug!("webhook signature rejected: non-hex signature");
        return false;
    };

    // Length gate before any byte comparison.
    if received.len() != 32 {
        tracing::debug!(len = received.len(), "webhook signature rejected: bad length");
        return false;
    }

    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);

    // verify_slice is the constant-time primitive; no manual byte loops.
    mac.verify_slice(&received).is_ok()
}

/// Compute the signature header value this deployment would expect for a
/// body. Test and tooling helper; the verification path never exposes it.
pub fn compute_signature(app_secret: &str, raw_body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(raw_body);
    format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    )
}
