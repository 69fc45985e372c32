//! #  Order store contracts.
//!
//! This module defines the behaviour a storage backend must expose in order to be used by the reconciler.
//!
//! * [`PaymentGatewayDatabase`] covers the order record: point lookups by order reference and the conditional
//!   payment-state transitions. Every transition is a single conditional statement that only matches an `unpaid`
//!   order, so concurrent callers can never both win.
//! * [`CustomerManagement`] maintains the per-customer running totals that are updated after a successful payment.
mod customer_management;
mod errors;
mod payment_gateway_database;

pub use customer_management::CustomerManagement;
pub use errors::PaymentGatewayError;
pub use payment_gateway_database::PaymentGatewayDatabase;
