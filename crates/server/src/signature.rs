//! `x-line-signature` checks: base64 HMAC-SHA256 of the raw body, keyed by
//! the channel secret.

use base64::{Engine, prelude::BASE64_STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac(channel_secret: &str, body: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes()).ok()?;
    mac.update(body);
    Some(mac)
}

/// Signature LINE would attach to `body`.
pub fn sign(channel_secret: &str, body: &[u8]) -> String {
    match mac(channel_secret, body) {
        Some(mac) => BASE64_STANDARD.encode(mac.finalize().into_bytes()),
        None => String::new(),
    }
}

/// Constant-time check of a received signature.
pub fn verify(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = BASE64_STANDARD.decode(signature.trim()) else {
        return false;
    };
    mac(channel_secret, body).is_some_and(|mac| mac.verify_slice(&expected).is_ok())
}
