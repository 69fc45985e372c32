use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::MoolreConfig,
    data_objects::{StatusRequest, StatusResponse},
    MoolreApiError,
};

#[derive(Clone)]
pub struct MoolreApi {
    config: MoolreConfig,
    client: Arc<Client>,
}

impl MoolreApi {
    /// Creates a new client. The API credentials are sent as default headers on every request, so both must be
    /// configured; otherwise [`MoolreApiError::CredentialsMissing`] is returned.
    pub fn new(config: MoolreConfig) -> Result<Self, MoolreApiError> {
        let (Some(user), Some(pubkey)) = (config.api_user.as_ref(), config.api_pubkey.as_ref()) else {
            return Err(MoolreApiError::CredentialsMissing);
        };
        let mut headers = HeaderMap::with_capacity(3);
        let user = HeaderValue::from_str(user.reveal().as_str())
            .map_err(|e| MoolreApiError::Initialization(format!("Invalid API user. {e}")))?;
        let pubkey = HeaderValue::from_str(pubkey.reveal().as_str())
            .map_err(|e| MoolreApiError::Initialization(format!("Invalid API public key. {e}")))?;
        headers.insert("X-API-USER", user);
        headers.insert("X-API-PUBKEY", pubkey);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| MoolreApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &MoolreConfig {
        &self.config
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: &str,
        body: Option<B>,
    ) -> Result<T, MoolreApiError> {
        trace!("Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                MoolreApiError::Timeout(e.to_string())
            } else {
                MoolreApiError::RestResponseError(e.to_string())
            }
        })?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| MoolreApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| MoolreApiError::RestResponseError(e.to_string()))?;
            Err(MoolreApiError::QueryError { status, message })
        }
    }

    /// Asks Moolre for the status of the payment made against `externalref`.
    pub async fn fetch_payment_status(&self, externalref: &str) -> Result<StatusResponse, MoolreApiError> {
        debug!("Fetching Moolre payment status for {externalref}");
        let body = StatusRequest { externalref: externalref.to_string() };
        let result =
            self.rest_query::<StatusResponse, StatusRequest>(Method::POST, &self.config.status_url, Some(body)).await?;
        debug!(
            "Moolre status for {externalref}: api status {}, transaction status '{}'",
            result.status,
            result.transaction_status()
        );
        Ok(result)
    }
}
