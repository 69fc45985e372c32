use std::str::FromStr;

use log::*;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::{
    db_types::OrderReference,
    signals::{CallbackTrust, NormalizeError, PaymentSignal, ReportedStatus, SignalSource},
};

/// Recorded as the provider reference when a webhook does not carry a transaction id.
pub const DEFAULT_PROVIDER_REFERENCE: &str = "callback";

const REFERENCE_FIELDS: [&str; 3] = ["externalref", "external_reference", "orderRef"];
const TOP_LEVEL_REFERENCE_FIELDS: [&str; 3] = ["externalref", "orderRef", "external_reference"];
const TRANSACTION_ID_FIELDS: [&str; 2] = ["transactionid", "thirdpartyref"];
const DEFAULT_FAILURE_REASON: &str = "Payment failed";

type Fields = Map<String, Value>;

/// A webhook body after transport decoding, tagged with how it was decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundPayload {
    /// Declared and parsed as `application/json`.
    Json(Fields),
    /// Declared as a form and decoded as `application/x-www-form-urlencoded`.
    Form(Fields),
    /// Any other content type. The body is tried as JSON first, then as a query string.
    Text(Fields),
}

impl InboundPayload {
    pub fn parse(content_type: Option<&str>, body: &[u8]) -> Result<Self, NormalizeError> {
        let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
        if content_type.contains("application/json") {
            return match serde_json::from_slice::<Value>(body) {
                Ok(Value::Object(fields)) => Ok(Self::Json(fields)),
                Ok(_) => Err(NormalizeError::MalformedBody("JSON body is not an object".into())),
                Err(e) => Err(NormalizeError::MalformedBody(e.to_string())),
            };
        }
        if content_type.contains("form") {
            return Ok(Self::Form(decode_query_string(body)));
        }
        let text = String::from_utf8_lossy(body);
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(Value::Object(fields)) => Ok(Self::Text(fields)),
            _ => Ok(Self::Text(decode_query_string(text.trim().as_bytes()))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Form(_) => "form",
            Self::Text(_) => "text",
        }
    }

    pub fn into_fields(self) -> Fields {
        match self {
            Self::Json(f) | Self::Form(f) | Self::Text(f) => f,
        }
    }
}

fn decode_query_string(body: &[u8]) -> Fields {
    url::form_urlencoded::parse(body).into_owned().map(|(k, v)| (k, Value::String(v))).collect()
}

/// The strict view of a provider webhook. Every field has been looked up in all the places providers are known to
/// put it, but nothing has been validated yet; that happens in [`CallbackPayload::into_signal`], after the caller has
/// been authenticated.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackPayload {
    pub order_reference: Option<OrderReference>,
    pub provider_reference: String,
    pub amount: Option<String>,
    /// The API-level `status` flag.
    pub api_status_ok: bool,
    /// The transaction-level `data.txtstatus` flag.
    pub transaction_status_ok: bool,
    pub message: String,
    pub presented_secret: Option<String>,
}

impl CallbackPayload {
    pub fn parse(content_type: Option<&str>, body: &[u8]) -> Result<Self, NormalizeError> {
        let payload = InboundPayload::parse(content_type, body)?;
        debug!("💳️ Callback body decoded as {}", payload.kind());
        Ok(Self::from_inbound(payload))
    }

    pub fn from_inbound(payload: InboundPayload) -> Self {
        let fields = payload.into_fields();
        let data = nested_object(&fields, "data").unwrap_or_default();

        let order_reference = REFERENCE_FIELDS
            .iter()
            .find_map(|k| text_field(&data, k))
            .or_else(|| TOP_LEVEL_REFERENCE_FIELDS.iter().find_map(|k| text_field(&fields, k)))
            .and_then(|r| OrderReference::from_provider_value(&r))
            .or_else(|| {
                let data_meta = nested_object(&data, "metadata").and_then(|m| text_field(&m, "original_order_number"));
                let meta = || nested_object(&fields, "metadata").and_then(|m| text_field(&m, "original_order_number"));
                data_meta.or_else(meta).and_then(|r| OrderReference::from_provider_value(&r))
            });

        let provider_reference = TRANSACTION_ID_FIELDS
            .iter()
            .find_map(|k| text_field(&data, k))
            .or_else(|| text_field(&fields, "reference"))
            .unwrap_or_else(|| DEFAULT_PROVIDER_REFERENCE.to_string());

        Self {
            order_reference,
            provider_reference,
            amount: text_field(&data, "amount").or_else(|| text_field(&fields, "amount")),
            api_status_ok: is_success_flag(fields.get("status")),
            transaction_status_ok: is_success_flag(data.get("txtstatus")),
            message: text_field(&fields, "message").unwrap_or_default(),
            presented_secret: fields.get("secret").and_then(Value::as_str).map(String::from),
        }
    }

    /// Decides what the webhook claims. A message mentioning a failure or an error always wins over the status flags,
    /// since providers have been seen to send `status: 1` alongside a failure message.
    pub fn reported_status(&self) -> ReportedStatus {
        let message = self.message.to_lowercase();
        let vetoed = message.contains("fail") || message.contains("error");
        if (self.api_status_ok || self.transaction_status_ok) && !vetoed {
            ReportedStatus::Succeeded
        } else {
            let reason = if self.message.is_empty() { DEFAULT_FAILURE_REASON.to_string() } else { self.message.clone() };
            ReportedStatus::Failed { reason }
        }
    }

    pub fn into_signal(self, trust: CallbackTrust) -> Result<PaymentSignal, NormalizeError> {
        let status = self.reported_status();
        let order_reference = self.order_reference.ok_or(NormalizeError::MissingReference)?;
        let amount = self.amount.map(parse_reported_amount).transpose()?;
        Ok(PaymentSignal {
            order_reference,
            provider_reference: self.provider_reference,
            amount,
            status,
            message: self.message,
            source: SignalSource::Webhook(trust),
        })
    }
}

/// Amounts must be plain, non-negative decimals. `Decimal` has no representation for NaN or infinity, so those fail to
/// parse as well.
fn parse_reported_amount(amount: String) -> Result<Decimal, NormalizeError> {
    match Decimal::from_str(amount.trim()) {
        Ok(value) if !value.is_sign_negative() || value.is_zero() => Ok(value),
        _ => Err(NormalizeError::InvalidAmount(amount)),
    }
}

/// Returns the object stored under `key`. Form deliveries carry nested objects as JSON strings, so those are decoded.
fn nested_object(fields: &Fields, key: &str) -> Option<Fields> {
    match fields.get(key)? {
        Value::Object(map) => Some(map.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

/// Returns a non-empty, trimmed text value. Numbers are accepted and rendered as text.
fn text_field(fields: &Fields, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(String::from),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_success_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Number(n)) => n.as_i64() == Some(1) || n.as_f64() == Some(1.0),
        Some(Value::String(s)) => s.trim() == "1",
        _ => false,
    }
}
