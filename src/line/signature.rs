//! Verification of the `x-line-signature` header sent with every webhook.

use base64::{Engine, engine::general_purpose::STANDARD};
use ring::hmac;

/// Name of the header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Checks that `signature` is the base64 encoded HMAC-SHA256 of `body` keyed
/// with the channel secret.
///
/// The comparison runs in constant time. A signature that isn't valid base64
/// is rejected.
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(tag) = STANDARD.decode(signature.trim()) else {
        return false;
    };

    let key = hmac::Key::new(hmac::HMAC_SHA256, channel_secret.as_bytes());
    hmac::verify(&key, body, &tag).is_ok()
}

/// Computes the signature LINE would send for `body`.
#[cfg(test)]
pub fn sign(channel_secret: &str, body: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, channel_secret.as_bytes());
    STANDARD.encode(hmac::sign(&key, body).as_ref())
}
