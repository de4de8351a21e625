//! # Payment signature verification
//!
//! After the customer completes payment in the gateway's UI, the gateway hands the browser a signature over
//! `{remote_order_id}|{remote_payment_id}`, computed as HMAC-SHA256 under the shared API secret and transmitted in
//! lowercase hex. The storefront forwards it with the verification request, and checking it here is what defeats a
//! forged client callback: the browser knows the ids, but not the secret.
//!
//! The same primitive authenticates webhook deliveries, where the signed data is the raw request body.
//!
//! Comparison is constant-time (via [`Mac::verify_slice`]) so the check leaks no timing information about the
//! expected signature.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_FIELD_SEPARATOR: &str = "|";

/// The byte string that gets signed for a payment verification payload.
pub fn signature_message(remote_order_id: &str, remote_payment_id: &str) -> String {
    format!("{remote_order_id}{SIGNATURE_FIELD_SEPARATOR}{remote_payment_id}")
}

/// HMAC-SHA256 of `data` under `secret`, as lowercase hex.
pub fn hmac_hex(secret: &str, data: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex-encoded HMAC-SHA256 signature over `data` in constant time.
///
/// A signature that is not valid hex, or has the wrong length, fails verification rather than erroring.
pub fn verify_hmac_hex(secret: &str, data: &[u8], signature: &str) -> bool {
    let supplied = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.verify_slice(&supplied).is_ok()
}

/// Verifies the client-submitted payment verification signature.
pub fn verify_payment_signature(
    secret: &str,
    remote_order_id: &str,
    remote_payment_id: &str,
    signature: &str,
) -> bool {
    let message = signature_message(remote_order_id, remote_payment_id);
    verify_hmac_hex(secret, message.as_bytes(), signature)
}
