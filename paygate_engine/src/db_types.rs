use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use paygate_common::Money;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

static STOREFRONT_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ORD-\d+-\d+$").expect("storefront order reference pattern is valid"));

static RETRY_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"-R\d+$").expect("retry suffix pattern is valid"));

//--------------------------------------    OrderReference    ---------------------------------------------------------
/// The human-readable order number shared by the storefront, the payment provider and the customer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderReference(pub String);

impl OrderReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds a reference from the value a provider echoes back. Providers append `-R<n>` to the reference when a
    /// payment is retried; the suffix is removed so that every attempt maps onto the same order.
    ///
    /// Returns `None` if nothing is left once the value is trimmed and the suffix removed.
    pub fn from_provider_value(value: &str) -> Option<Self> {
        let stripped = RETRY_SUFFIX.replace(value.trim(), "");
        if stripped.is_empty() {
            None
        } else {
            Some(Self(stripped.into_owned()))
        }
    }

    /// True if the reference has the storefront's `ORD-<digits>-<digits>` shape.
    pub fn is_storefront_format(&self) -> bool {
        STOREFRONT_REFERENCE.is_match(&self.0)
    }
}

impl From<String> for OrderReference {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderReference {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The ways a caller may name an order: by its storefront order number or by its store row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderIdentifier {
    Reference(OrderReference),
    Id(i64),
}

impl Display for OrderIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderIdentifier::Reference(r) => write!(f, "{r}"),
            OrderIdentifier::Id(id) => write!(f, "#{id}"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status value: {0}")]
pub struct ConversionError(String);

//--------------------------------------    PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// No confirmed payment has been recorded for the order.
    Unpaid,
    /// A confirmed payment was recorded. Terminal.
    Paid,
    /// The provider reported the payment as failed. Terminal.
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "unpaid"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(Self::Unpaid),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------     OrderStatus      ---------------------------------------------------------
/// The fulfilment lifecycle of an order. This is independent of [`PaymentStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        Order         ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderReference,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total: Money,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub metadata: Json<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.0.get(key).and_then(Value::as_str)
    }

    /// The payment method the customer chose at checkout, if recorded.
    pub fn payment_method(&self) -> Option<&str> {
        self.metadata_str("payment_method")
    }

    /// The provider transaction id recorded when the payment state last changed.
    pub fn provider_reference(&self) -> Option<&str> {
        self.metadata_str("provider_reference")
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.metadata_str("failure_reason")
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

//--------------------------------------       NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: OrderReference,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total: Money,
    pub metadata: Value,
}

impl NewOrder {
    pub fn new(order_number: OrderReference, total: Money) -> Self {
        Self { order_number, email: None, phone: None, total, metadata: Value::Object(Default::default()) }
    }

    pub fn with_email<S: Into<String>>(mut self, email: S) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone<S: Into<String>>(mut self, phone: S) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_payment_method<S: Into<String>>(mut self, method: S) -> Self {
        if let Value::Object(map) = &mut self.metadata {
            map.insert("payment_method".into(), Value::String(method.into()));
        }
        self
    }
}

//--------------------------------------    CustomerStats     ---------------------------------------------------------
/// Running totals for a customer, keyed by (lower-cased) email address.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CustomerStats {
    pub id: i64,
    pub email: String,
    pub total_spent: Money,
    pub order_count: i64,
    pub last_order_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
