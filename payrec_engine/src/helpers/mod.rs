pub mod payment_signature;

pub use payment_signature::{hmac_hex, signature_message, verify_hmac_hex, verify_payment_signature};
