use std::fmt::Display;

use chrono::{DateTime, SecondsFormat, Utc};
use paygate_engine::db_types::{Order, OrderIdentifier, OrderReference, OrderStatus, PaymentStatus};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Readiness payload returned on `GET` of the webhook URL, so that the provider's dashboard can probe it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackReadiness {
    pub message: String,
    pub timestamp: String,
}

impl CallbackReadiness {
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            message: "Moolre callback endpoint ready".into(),
            timestamp: time.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

//--------------------------------------   Verification   --------------------------------------------------------------
/// Body of a client-initiated payment verification. The order number is kept as raw JSON so that a missing or
/// non-string value can be told apart from a badly formatted one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    #[serde(rename = "orderNumber", default)]
    pub order_number: Value,
}

/// Result of a verification. The order's state is always reported; it is `unknown` when the store could not be read.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResponse {
    pub success: bool,
    pub order_number: OrderReference,
    #[serde(serialize_with = "or_unknown")]
    pub status: Option<OrderStatus>,
    #[serde(serialize_with = "or_unknown")]
    pub payment_status: Option<PaymentStatus>,
    pub message: String,
}

impl VerificationResponse {
    pub fn for_order<S: Display>(success: bool, order: &Order, message: S) -> Self {
        Self {
            success,
            order_number: order.order_number.clone(),
            status: Some(order.status),
            payment_status: Some(order.payment_status),
            message: message.to_string(),
        }
    }

    pub fn unknown<S: Display>(reference: &OrderReference, message: S) -> Self {
        Self {
            success: false,
            order_number: reference.clone(),
            status: None,
            payment_status: None,
            message: message.to_string(),
        }
    }
}

fn or_unknown<T: Serialize, S: Serializer>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => v.serialize(serializer),
        None => serializer.serialize_str("unknown"),
    }
}

//--------------------------------------   Notifications   -------------------------------------------------------------
pub const ORDER_CREATED: &str = "order_created";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl NotificationRequest {
    /// The order number carried by an `order_created` payload, if there is one.
    pub fn order_number(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| p.get("order_number"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The order named by the payload. `order_number` wins; otherwise `id` is used, as a row id if it is an integer
    /// and as an order number if it is any other non-empty string.
    pub fn order_identifier(&self) -> Option<OrderIdentifier> {
        if let Some(number) = self.order_number() {
            return Some(OrderIdentifier::Reference(OrderReference::from(number)));
        }
        match self.payload.as_ref()?.get("id")? {
            Value::Number(n) => n.as_i64().map(OrderIdentifier::Id),
            Value::String(s) => {
                let s = s.trim();
                match s.parse::<i64>() {
                    Ok(id) => Some(OrderIdentifier::Id(id)),
                    Err(_) if !s.is_empty() => Some(OrderIdentifier::Reference(OrderReference::from(s))),
                    Err(_) => None,
                }
            },
            _ => None,
        }
    }
}
