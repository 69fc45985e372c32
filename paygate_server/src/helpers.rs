use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;

static FORWARDED_FOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"for="?(?P<ip>[^;,"]+)"#).expect("Forwarded header regex is valid"));

/// Identity used when no address can be determined for the caller.
pub const UNKNOWN_CALLER: &str = "unknown";

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The first entry of the `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `for=` field of the `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        result = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| FORWARDED_FOR.captures(v))
            .and_then(|caps| caps.name("ip"))
            .and_then(|m| IpAddr::from_str(m.as_str().trim()).ok());
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.peer_addr().map(|a| a.ip());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr
    })
}

/// The rate-limiting identity of the caller: its remote IP, or [`UNKNOWN_CALLER`].
pub fn caller_identity(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> String {
    get_remote_ip(req, use_x_forwarded_for, use_forwarded)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_CALLER.to_string())
}
