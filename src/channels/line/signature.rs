//! Webhook signature verification
//!
//! LINE signs each delivery with `base64(HMAC-SHA256(channel_secret, body))`
//! and sends it in the `x-line-signature` header.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Header carrying the delivery signature
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Check `signature` against the body signed with `channel_secret`
///
/// Comparison is constant-time. Malformed base64 is a mismatch.
#[must_use]
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(signature.trim()) else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    mac.verify_slice(&expected).is_ok()
}

/// Compute the signature for `body`
///
/// Used when replaying deliveries in tests and local tooling.
#[must_use]
pub fn sign(channel_secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = Hmac::<Sha256>::new_from_slice(channel_secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("hmac key length is unrestricted"));
    mac.update(body);
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}
