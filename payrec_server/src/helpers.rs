use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use log::{debug, trace};
use regex::Regex;

/// Resolves the IP the request came from, for the webhook whitelist check.
///
/// Proxy headers are spoofable, so they are only consulted when the deployment has opted in: `X-Forwarded-For`
/// behind `use_x_forwarded_for`, then `Forwarded` behind `use_forwarded`. When a proxy chain lists several hops,
/// the first entry is the originating client. The connection's own peer address is the fallback.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Remote address {ip} taken from X-Forwarded-For");
        }
    }
    if use_forwarded && result.is_none() {
        let re = Regex::new(r#"for=(?P<ip>[^;,]+)"#).unwrap();
        result = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| re.captures(v))
            .and_then(|caps| caps.name("ip"))
            .and_then(|m| IpAddr::from_str(m.as_str().trim_matches('"')).ok());
        if let Some(ip) = result {
            debug!("Remote address {ip} taken from Forwarded");
        }
    }
    result.or_else(|| {
        let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
        trace!("Using the connection peer address: {peer_addr:?}");
        peer_addr.and_then(|s| IpAddr::from_str(&s).ok())
    })
}
