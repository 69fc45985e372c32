use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::helpers::parse_amount;

/// Transaction states (compared case-insensitively) that Moolre uses for a completed payment.
pub const SUCCESS_STATUSES: [&str; 4] = ["success", "successful", "completed", "paid"];

#[derive(Debug, Clone, Serialize)]
pub struct StatusRequest {
    pub externalref: String,
}

/// The body returned by the status endpoint. Only the fields the gateway relies on are modelled; the rest is ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StatusResponse {
    /// `1` when the API call itself succeeded.
    #[serde(default)]
    pub status: Value,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<StatusData>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StatusData {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub transactionid: Option<Value>,
    #[serde(default)]
    pub externalref: Option<String>,
}

impl StatusResponse {
    /// The transaction state as reported by Moolre, lower-cased. Empty if absent.
    pub fn transaction_status(&self) -> String {
        self.data.as_ref().and_then(|d| d.status.as_deref()).unwrap_or_default().trim().to_lowercase()
    }

    /// True only if the API call succeeded and the transaction is in one of the [`SUCCESS_STATUSES`].
    pub fn is_successful(&self) -> bool {
        let api_ok = self.status.as_i64() == Some(1);
        api_ok && self.data.is_some() && SUCCESS_STATUSES.contains(&self.transaction_status().as_str())
    }

    pub fn amount(&self) -> Option<Decimal> {
        self.data.as_ref().and_then(|d| d.amount.as_ref()).and_then(parse_amount)
    }

    pub fn transaction_id(&self) -> Option<String> {
        match self.data.as_ref()?.transactionid.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
