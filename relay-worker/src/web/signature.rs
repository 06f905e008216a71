//! HubSpot webhook signature verification.
//!
//! HubSpot signs webhook requests with HMAC-SHA256 over the request body
//! using the app's shared secret, hex-encoded in `X-HubSpot-Signature`.
//! The digest is computed over the raw bytes as received, before any JSON
//! parsing or input sanitization touches the body.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 digest.
pub const SIGNATURE_HEADER: &str = "X-HubSpot-Signature";

/// Header carrying the signature scheme version (logged, not validated).
pub const SIGNATURE_VERSION_HEADER: &str = "X-HubSpot-Signature-Version";

/// Compute the hex HMAC-SHA256 digest of `body` under `secret`.
///
/// Returns `None` only if the MAC cannot be keyed, which HMAC never
/// refuses in practice.
pub fn compute_signature(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a HubSpot webhook signature.
///
/// # Arguments
///
/// * `secret` - The configured webhook secret; `None` or blank rejects everything
/// * `body` - The raw request body bytes
/// * `signature` - The value of the `X-HubSpot-Signature` header
///
/// # Returns
///
/// `true` if the computed digest equals the received one, `false` otherwise.
pub fn verify_hubspot_signature(secret: Option<&str>, body: &[u8], signature: &str) -> bool {
    let secret = match secret {
        Some(s) if !s.trim().is_empty() => s,
        _ => {
            warn!("hubspot_signature_secret_missing");
            return false;
        }
    };

    if signature.is_empty() {
        return false;
    }

    let expected = match compute_signature(secret, body) {
        Some(sig) => sig,
        None => {
            warn!("hubspot_signature_invalid_key");
            return false;
        }
    };

    // HubSpot emits lowercase hex; accept uppercase senders too.
    let valid = constant_time_compare(&expected, &signature.to_ascii_lowercase());

    if !valid {
        debug!(
            expected_length = expected.len(),
            actual_length = signature.len(),
            "hubspot_signature_digest_differs"
        );
    }

    valid
}

/// Constant-time string comparison to prevent timing attacks.
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
