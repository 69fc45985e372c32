use rust_decimal::Decimal;
use thiserror::Error;

use crate::db_types::OrderReference;

#[derive(Debug, Clone, Error)]
pub enum ProviderStatusError {
    /// The server holds no API credentials for the provider, so the status cannot be queried at all.
    #[error("Payment provider credentials are not configured")]
    CredentialsMissing,
    /// The provider could not be reached, returned an error, or answered with something unintelligible.
    #[error("Payment provider is unavailable: {0}")]
    Unavailable(String),
}

/// The provider's view of a transaction, reduced to what the reconciler needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderStatus {
    /// True only if the provider positively confirmed the payment.
    pub succeeded: bool,
    /// The provider's own status wording, kept for logging.
    pub raw_status: String,
    pub amount: Option<Decimal>,
    pub transaction_id: Option<String>,
}

#[allow(async_fn_in_trait)]
pub trait PaymentStatusProvider {
    /// Queries the provider for the status of the payment made against `reference`.
    async fn query_status(&self, reference: &OrderReference) -> Result<ProviderStatus, ProviderStatusError>;
}
