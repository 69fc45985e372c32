use log::*;
use moolre_tools::{MoolreApi, MoolreApiError, MoolreConfig};
use paygate_engine::{
    db_types::OrderReference,
    traits::{PaymentStatusProvider, ProviderStatus, ProviderStatusError},
};

use crate::errors::ServerError;

/// Asks the Moolre status endpoint about a payment.
///
/// The provider is always constructible. Without API credentials every query fails with
/// [`ProviderStatusError::CredentialsMissing`], which the verification route reports as a 503.
#[derive(Clone)]
pub struct MoolreStatusProvider {
    api: Option<MoolreApi>,
}

impl MoolreStatusProvider {
    pub fn new(config: MoolreConfig) -> Result<Self, ServerError> {
        match MoolreApi::new(config) {
            Ok(api) => Ok(Self { api: Some(api) }),
            Err(MoolreApiError::CredentialsMissing) => {
                warn!("🔎️ Moolre credentials are missing. Payment verification will be unavailable.");
                Ok(Self { api: None })
            },
            Err(e) => Err(ServerError::InitializeError(e.to_string())),
        }
    }

    pub fn is_available(&self) -> bool {
        self.api.is_some()
    }
}

impl PaymentStatusProvider for MoolreStatusProvider {
    async fn query_status(&self, reference: &OrderReference) -> Result<ProviderStatus, ProviderStatusError> {
        let api = self.api.as_ref().ok_or(ProviderStatusError::CredentialsMissing)?;
        let response = api.fetch_payment_status(reference.as_str()).await.map_err(|e| match e {
            MoolreApiError::CredentialsMissing => ProviderStatusError::CredentialsMissing,
            e => {
                warn!("🔎️ Could not fetch the payment status of {reference} from Moolre. {e}");
                ProviderStatusError::Unavailable(e.to_string())
            },
        })?;
        let status = ProviderStatus {
            succeeded: response.is_successful(),
            raw_status: response.transaction_status(),
            amount: response.amount(),
            transaction_id: response.transaction_id(),
        };
        debug!("🔎️ Moolre reports '{}' for {reference}", status.raw_status);
        Ok(status)
    }
}
