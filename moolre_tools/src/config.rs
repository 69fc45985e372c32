use std::time::Duration;

use log::*;
use paygate_common::{helpers::non_empty_env, Secret};

pub const DEFAULT_STATUS_URL: &str = "https://api.moolre.com/embed/status";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct MoolreConfig {
    pub status_url: String,
    pub api_user: Option<Secret<String>>,
    pub api_pubkey: Option<Secret<String>>,
    /// Upper bound on a single status request, including connecting.
    pub timeout: Duration,
}

impl Default for MoolreConfig {
    fn default() -> Self {
        Self { status_url: DEFAULT_STATUS_URL.to_string(), api_user: None, api_pubkey: None, timeout: DEFAULT_TIMEOUT }
    }
}

impl MoolreConfig {
    pub fn new_from_env_or_default() -> Self {
        let status_url = non_empty_env("MOOLRE_STATUS_URL").unwrap_or_else(|| {
            info!("MOOLRE_STATUS_URL not set, using {DEFAULT_STATUS_URL}");
            DEFAULT_STATUS_URL.to_string()
        });
        let api_user = non_empty_env("MOOLRE_API_USER").map(Secret::new);
        let api_pubkey = non_empty_env("MOOLRE_API_PUBKEY").map(Secret::new);
        if api_user.is_none() || api_pubkey.is_none() {
            warn!(
                "MOOLRE_API_USER and/or MOOLRE_API_PUBKEY are not set. Payment verification against the Moolre API is \
                 unavailable until both are configured."
            );
        }
        let timeout = non_empty_env("PAYGATE_PROVIDER_TIMEOUT")
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("Invalid PAYGATE_PROVIDER_TIMEOUT value '{s}': {e}. Using the default."))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        Self { status_url, api_user, api_pubkey, timeout }
    }

    pub fn with_credentials<S: Into<String>>(mut self, api_user: S, api_pubkey: S) -> Self {
        self.api_user = Some(Secret::new(api_user.into()));
        self.api_pubkey = Some(Secret::new(api_pubkey.into()));
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.api_user.is_some() && self.api_pubkey.is_some()
    }
}
