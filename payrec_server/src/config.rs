use std::{env, net::IpAddr};

use chrono::Duration;
use gateway_client::GatewayConfig;
use log::*;
use payrec_common::{parse_boolean_flag, Secret};

const DEFAULT_PRS_HOST: &str = "127.0.0.1";
const DEFAULT_PRS_PORT: u16 = 8360;
/// The header the gateway uses to carry the HMAC signature of the webhook body.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-gateway-signature";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
const DEFAULT_STALE_ORDER_THRESHOLD: Duration = Duration::hours(1);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// Credentials and timeouts for the payment gateway API.
    pub gateway: GatewayConfig,
    /// Webhook authentication configuration.
    pub webhook: WebhookConfig,
    /// Reconciliation sweep configuration.
    pub sweep: SweepConfig,
}

#[derive(Clone, Debug, Default)]
pub struct WebhookConfig {
    /// The shared secret the gateway signs webhook bodies with.
    pub hmac_secret: Secret<String>,
    pub hmac_checks: bool,
    /// If supplied, requests against the webhook endpoint will be checked against a whitelist of gateway IP
    /// addresses. To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

#[derive(Clone, Copy, Debug)]
pub struct SweepConfig {
    pub enabled: bool,
    /// How often the sweep polls the gateway for stale orders.
    pub interval_secs: u64,
    /// How long an order must sit in `Pending`/`Pending` before the sweep considers it abandoned.
    pub stale_after: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { enabled: true, interval_secs: DEFAULT_SWEEP_INTERVAL_SECS, stale_after: DEFAULT_STALE_ORDER_THRESHOLD }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PRS_HOST.to_string(),
            port: DEFAULT_PRS_PORT,
            database_url: String::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            gateway: GatewayConfig::default(),
            webhook: WebhookConfig::default(),
            sweep: SweepConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PRS_HOST").ok().unwrap_or_else(|| DEFAULT_PRS_HOST.into());
        let port = env::var("PRS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for PRS_PORT. {e} Using the default, {DEFAULT_PRS_PORT}, instead."
                    );
                    DEFAULT_PRS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PRS_PORT);
        let database_url = env::var("PRS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ PRS_DATABASE_URL is not set. Please set it to the URL for the orders database.");
            String::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("PRS_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("PRS_USE_FORWARDED").ok(), false);
        let gateway = GatewayConfig::new_from_env_or_default();
        let webhook = WebhookConfig::from_env_or_default();
        let sweep = SweepConfig::from_env_or_default();
        Self { host, port, database_url, use_x_forwarded_for, use_forwarded, gateway, webhook, sweep }
    }
}

impl WebhookConfig {
    pub fn from_env_or_default() -> Self {
        let hmac_secret = env::var("PRS_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ PRS_WEBHOOK_SECRET is not set. Please set it to the webhook signing secret configured at the \
                 gateway."
            );
            String::default()
        });
        let hmac_secret = Secret::new(hmac_secret);
        let hmac_checks = parse_boolean_flag(env::var("PRS_WEBHOOK_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Webhook HMAC checks are disabled. Anyone can post forged events. Never do this in production.");
        }
        let whitelist = env::var("PRS_GATEWAY_IP_WHITELIST").ok().and_then(|s| {
            if ["none", "false", "0"].contains(&s.to_lowercase().as_str()) {
                info!(
                    "🪛️ The gateway IP whitelist is disabled. If this is not what you want, set \
                     PRS_GATEWAY_IP_WHITELIST to a comma-separated list of IP addresses to enable it."
                );
                return None;
            }
            let ip_addrs = s
                .split(',')
                .filter_map(|s| {
                    s.trim()
                        .parse()
                        .map_err(|e| {
                            warn!("🪛️ Ignoring invalid IP address ({s}) in PRS_GATEWAY_IP_WHITELIST: {e}");
                            None::<IpAddr>
                        })
                        .ok()
                })
                .collect::<Vec<IpAddr>>();
            Some(ip_addrs)
        });
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The gateway IP whitelist was configured, but is empty. The server will run, but won't \
                     accept any incoming webhook requests."
                );
            },
            Some(whitelist) => {
                info!("🪛️ Gateway IP whitelist is enabled with {} addresses.", whitelist.len());
            },
            None => {
                info!("🪛️ Gateway IP whitelist is disabled.");
            },
        }
        Self { hmac_secret, hmac_checks, whitelist }
    }
}

impl SweepConfig {
    pub fn from_env_or_default() -> Self {
        let defaults = SweepConfig::default();
        let enabled = parse_boolean_flag(env::var("PRS_SWEEP_ENABLED").ok(), defaults.enabled);
        let interval_secs = env::var("PRS_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.interval_secs);
        let stale_after = env::var("PRS_SWEEP_STALE_AFTER_SECS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Duration::seconds)
            .unwrap_or(defaults.stale_after);
        if enabled {
            info!(
                "🪛️ Reconciliation sweep runs every {interval_secs}s for orders pending longer than {}s.",
                stale_after.num_seconds()
            );
        } else {
            warn!("🪛️ The reconciliation sweep is disabled. Orders whose webhook never arrives will stay pending.");
        }
        Self { enabled, interval_secs, stale_after }
    }
}
