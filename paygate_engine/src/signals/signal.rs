use rust_decimal::Decimal;

use crate::{db_types::OrderReference, traits::ProviderStatus};

/// Recorded as the provider reference when the provider status response does not carry a transaction id.
pub const POLL_PROVIDER_REFERENCE: &str = "provider-api-verify";

/// What the sender of a signal claims happened to the payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedStatus {
    Succeeded,
    Failed { reason: String },
    /// The provider has not (yet) confirmed the payment. Only produced by the polling path.
    Pending,
}

/// How far a webhook can be trusted. A webhook that failed authentication never becomes a signal, so there is no
/// "rejected" variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackTrust {
    /// The webhook presented the configured shared secret.
    Authenticated,
    /// No shared secret is configured, so the origin of the webhook could not be checked.
    Unverifiable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    Webhook(CallbackTrust),
    /// The provider's status API, queried with server-held credentials.
    ProviderApi,
}

/// A normalized, untrusted claim about the payment state of an order. Signals are never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSignal {
    pub order_reference: OrderReference,
    pub provider_reference: String,
    pub amount: Option<Decimal>,
    pub status: ReportedStatus,
    pub message: String,
    pub source: SignalSource,
}

impl PaymentSignal {
    /// Converts a provider status response into a signal. The polling path never reports a failure: anything short
    /// of a confirmed success means "not confirmed yet".
    pub fn from_provider_status(order_reference: OrderReference, status: ProviderStatus) -> Self {
        let reported = if status.succeeded { ReportedStatus::Succeeded } else { ReportedStatus::Pending };
        Self {
            order_reference,
            provider_reference: status.transaction_id.unwrap_or_else(|| POLL_PROVIDER_REFERENCE.to_string()),
            amount: status.amount,
            status: reported,
            message: status.raw_status,
            source: SignalSource::ProviderApi,
        }
    }

    pub fn is_webhook(&self) -> bool {
        matches!(self.source, SignalSource::Webhook(_))
    }
}
