use std::time::Duration;

use log::*;
use payrec_common::Secret;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway API, e.g. "https://api.razorpay.com"
    pub base_url: String,
    pub key_id: String,
    pub key_secret: Secret<String>,
    /// Per-request timeout for gateway calls.
    pub timeout: Duration,
    /// Retry budget for idempotent reads (fetch payment / fetch refund). Writes are never retried.
    pub max_retries: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.razorpay.com".to_string(),
            key_id: String::default(),
            key_secret: Secret::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        let defaults = GatewayConfig::default();
        let base_url = std::env::var("PRS_GATEWAY_URL").unwrap_or_else(|_| {
            info!("PRS_GATEWAY_URL not set, using {}", defaults.base_url);
            defaults.base_url
        });
        let key_id = std::env::var("PRS_GATEWAY_KEY_ID").unwrap_or_else(|_| {
            warn!("PRS_GATEWAY_KEY_ID is not set. Gateway calls will be rejected until it is configured.");
            String::default()
        });
        let key_secret = Secret::new(std::env::var("PRS_GATEWAY_KEY_SECRET").unwrap_or_else(|_| {
            warn!("PRS_GATEWAY_KEY_SECRET is not set. Gateway calls will be rejected until it is configured.");
            String::default()
        }));
        let timeout = std::env::var("PRS_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        let max_retries = std::env::var("PRS_GATEWAY_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.max_retries);
        Self { base_url, key_id, key_secret, timeout, max_retries }
    }
}
