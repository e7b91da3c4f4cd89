//! HMAC-SHA256 signing for outbound webhook payloads.
//!
//! The signature is computed over the exact serialized envelope that is sent as the request body,
//! keyed with the subscriber's shared secret, and hex encoded:
//!
//! ```text
//! X-<Product>-Signature: sha256=<hex(HMAC-SHA256(secret, body))>
//! ```
//!
//! Subscribers verify a delivery by recomputing the HMAC over the raw body they received.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Prefix carried by every signature header value
pub const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("webhook secret is empty")]
    EmptySecret,
    #[error("invalid HMAC key: {0}")]
    InvalidKey(#[from] hmac::digest::InvalidLength),
}

/// Sign a serialized payload with a subscriber secret.
///
/// Returns the header value in the form `sha256={hex-hmac-sha256}`. Deterministic for a given
/// `(payload, secret)` pair.
pub fn sign_payload(payload: &str, secret: &str) -> Result<String, SigningError> {
    if secret.is_empty() {
        return Err(SigningError::EmptySecret);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(payload.as_bytes());
    let digest = mac.finalize().into_bytes();

    Ok(format!("{}{}", SIGNATURE_PREFIX, hex::encode(digest)))
}

/// Verify a webhook signature header against a raw payload.
///
/// Returns `true` only if the header has the `sha256=` prefix and matches the expected HMAC.
pub fn verify_signature(payload: &str, signature: &str, secret: &str) -> bool {
    let Some(received) = signature.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };

    let Ok(expected) = sign_payload(payload, secret) else {
        return false;
    };

    let Some(expected) = expected.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };

    constant_time_eq(received.as_bytes(), expected.as_bytes())
}

/// Constant-time byte comparison to prevent timing attacks.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
