use std::{env, time::Duration};

use log::*;
use moolre_tools::MoolreConfig;
use paygate_common::{
    helpers::{non_empty_env, parse_boolean_flag},
    Secret,
};
use paygate_engine::reconciler::DEFAULT_EFFECT_TIMEOUT;

use crate::rate_limit::{RateLimitConfig, RateLimitPolicy};

const DEFAULT_PAYGATE_HOST: &str = "127.0.0.1";
const DEFAULT_PAYGATE_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/paygate.db";
const DEFAULT_PAYMENT_METHOD: &str = "moolre";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the `for=` field of the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// The secret Moolre includes in every webhook. When unset, webhooks cannot be authenticated and are accepted
    /// as unverifiable.
    pub callback_secret: Option<Secret<String>>,
    pub moolre: MoolreConfig,
    /// Where confirmation notices are posted. When unset, confirmations are only logged.
    pub notify_url: Option<String>,
    /// Upper bound on each post-payment effect (customer statistics, confirmation notice).
    pub effect_timeout: Duration,
    pub rate_limits: RateLimitConfig,
    /// The payment method name that the verification endpoint handles.
    pub payment_method: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PAYGATE_HOST.to_string(),
            port: DEFAULT_PAYGATE_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            callback_secret: None,
            moolre: MoolreConfig::default(),
            notify_url: None,
            effect_timeout: DEFAULT_EFFECT_TIMEOUT,
            rate_limits: RateLimitConfig::default(),
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PAYGATE_HOST").ok().unwrap_or_else(|| DEFAULT_PAYGATE_HOST.into());
        let port = env::var("PAYGATE_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for PAYGATE_PORT. {e} Using the default, {DEFAULT_PAYGATE_PORT}, \
                         instead."
                    );
                    DEFAULT_PAYGATE_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PAYGATE_PORT);
        let database_url = non_empty_env("PAYGATE_DATABASE_URL").unwrap_or_else(|| {
            info!("🪛️ PAYGATE_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("PAYGATE_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("PAYGATE_USE_FORWARDED").ok(), false);
        let callback_secret = non_empty_env("MOOLRE_CALLBACK_SECRET").map(Secret::new);
        if callback_secret.is_none() {
            warn!(
                "🚨️ MOOLRE_CALLBACK_SECRET is not set. Payment webhooks cannot be authenticated and will be accepted as \
                 unverifiable. Do not run a production instance like this."
            );
        }
        let moolre = MoolreConfig::new_from_env_or_default();
        let notify_url = non_empty_env("PAYGATE_NOTIFY_URL");
        if notify_url.is_none() {
            info!("🪛️ PAYGATE_NOTIFY_URL is not set. Order confirmations will only be logged.");
        }
        let effect_timeout = non_empty_env("PAYGATE_EFFECT_TIMEOUT")
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for PAYGATE_EFFECT_TIMEOUT. {e}"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_EFFECT_TIMEOUT);
        let rate_limits = RateLimitConfig {
            callback: policy_from_env("PAYGATE_RATE_LIMIT_CALLBACK", RateLimitConfig::default().callback),
            verify: policy_from_env("PAYGATE_RATE_LIMIT_VERIFY", RateLimitConfig::default().verify),
            notification: policy_from_env("PAYGATE_RATE_LIMIT_NOTIFICATION", RateLimitConfig::default().notification),
        };
        let payment_method = non_empty_env("PAYGATE_PAYMENT_METHOD").unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.into());
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            callback_secret,
            moolre,
            notify_url,
            effect_timeout,
            rate_limits,
            payment_method,
        }
    }
}

fn policy_from_env(name: &str, default: RateLimitPolicy) -> RateLimitPolicy {
    match non_empty_env(name) {
        None => default,
        Some(s) => s.parse::<RateLimitPolicy>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {name}. {e}. Using the default, {default}.");
            default
        }),
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub payment_method: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self { use_x_forwarded_for: false, use_forwarded: false, payment_method: DEFAULT_PAYMENT_METHOD.to_string() }
    }
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            payment_method: config.payment_method.clone(),
        }
    }
}

//-------------------------------------------------  CallbackConfig  ---------------------------------------------------
/// The webhook shared secret, kept apart from [`ServerOptions`] so that it is only handed to the webhook route.
#[derive(Clone, Debug, Default)]
pub struct CallbackConfig {
    pub secret: Option<Secret<String>>,
}

impl CallbackConfig {
    pub fn new(secret: Option<Secret<String>>) -> Self {
        Self { secret }
    }
}
