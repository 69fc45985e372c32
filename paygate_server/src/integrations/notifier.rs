use std::time::Duration;

use log::*;
use paygate_engine::{
    db_types::Order,
    traits::{Notifier, NotifierError},
};
use serde::Serialize;

use crate::errors::ServerError;

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct ConfirmationNotice<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    order: &'a Order,
}

/// Hands order confirmations to the external email/SMS service by POSTing the order as JSON.
#[derive(Clone)]
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self, ServerError> {
        let client = reqwest::Client::builder()
            .timeout(NOTIFY_TIMEOUT)
            .build()
            .map_err(|e| ServerError::InitializeError(format!("Could not create notifier client. {e}")))?;
        Ok(Self { url: url.to_string(), client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Notifier for WebhookNotifier {
    async fn send_confirmation(&self, order: &Order) -> Result<(), NotifierError> {
        let notice = ConfirmationNotice { kind: "order_confirmation", order };
        let response = self
            .client
            .post(&self.url)
            .json(&notice)
            .send()
            .await
            .map_err(|e| NotifierError(format!("Request to {} failed. {e}", self.url)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifierError(format!("{} responded with {status}", self.url)));
        }
        debug!("📨️ Confirmation for order {} was accepted by the notifier", order.order_number);
        Ok(())
    }
}

/// Stand-in used when no notification service is configured. Confirmations are written to the log.
#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn send_confirmation(&self, order: &Order) -> Result<(), NotifierError> {
        info!(
            "📨️ Order confirmation for {} ({} paid, email: {}, phone: {})",
            order.order_number,
            order.total,
            order.email.as_deref().unwrap_or("none"),
            order.phone.as_deref().unwrap_or("none")
        );
        Ok(())
    }
}

/// The notifier selected by the server configuration.
#[derive(Clone)]
pub enum OrderNotifier {
    Webhook(WebhookNotifier),
    Log(LogNotifier),
}

impl OrderNotifier {
    pub fn from_url(notify_url: Option<&str>) -> Result<Self, ServerError> {
        match notify_url {
            Some(url) => {
                info!("📨️ Order confirmations will be sent to {url}");
                Ok(Self::Webhook(WebhookNotifier::new(url)?))
            },
            None => Ok(Self::Log(LogNotifier)),
        }
    }
}

impl Notifier for OrderNotifier {
    async fn send_confirmation(&self, order: &Order) -> Result<(), NotifierError> {
        match self {
            Self::Webhook(n) => n.send_confirmation(order).await,
            Self::Log(n) => n.send_confirmation(order).await,
        }
    }
}
