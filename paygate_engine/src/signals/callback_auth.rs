//! Webhook origin checks.
//!
//! The provider includes a shared secret in every webhook. When the server has a secret configured, a webhook that
//! does not present it is rejected. When no secret is configured the webhook cannot be verified at all; it is allowed
//! through, but tagged as [`CallbackTrust::Unverifiable`] and logged on the security target every time.
use log::*;
use paygate_common::Secret;
use subtle::ConstantTimeEq;

use crate::signals::CallbackTrust;

pub const SECURITY_LOG_TARGET: &str = "paygate::security";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAuth {
    Authenticated,
    Rejected,
    Unverifiable,
}

impl CallbackAuth {
    /// The trust level a signal built from this webhook carries, or `None` if the webhook must be dropped.
    pub fn trust(self) -> Option<CallbackTrust> {
        match self {
            CallbackAuth::Authenticated => Some(CallbackTrust::Authenticated),
            CallbackAuth::Unverifiable => Some(CallbackTrust::Unverifiable),
            CallbackAuth::Rejected => None,
        }
    }
}

/// Checks the secret a webhook presented against the configured one. The comparison runs in constant time.
pub fn authenticate(presented: Option<&str>, configured: Option<&Secret<String>>) -> CallbackAuth {
    let Some(expected) = configured.filter(|s| !s.reveal().is_empty()) else {
        warn!(
            target: SECURITY_LOG_TARGET,
            "🔐️ No callback secret is configured. Webhook origin cannot be verified and is accepted as unverifiable."
        );
        return CallbackAuth::Unverifiable;
    };
    match presented {
        Some(presented) if bool::from(presented.as_bytes().ct_eq(expected.reveal().as_bytes())) => {
            trace!(target: SECURITY_LOG_TARGET, "🔐️ Callback secret verified");
            CallbackAuth::Authenticated
        },
        Some(_) => {
            warn!(target: SECURITY_LOG_TARGET, "🔐️ Callback rejected: secret mismatch");
            CallbackAuth::Rejected
        },
        None => {
            warn!(target: SECURITY_LOG_TARGET, "🔐️ Callback rejected: no secret presented");
            CallbackAuth::Rejected
        },
    }
}
