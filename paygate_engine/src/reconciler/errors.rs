use thiserror::Error;

use crate::{db::traits::PaymentGatewayError, db_types::OrderReference};

#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderReference),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<PaymentGatewayError> for ReconcileError {
    fn from(e: PaymentGatewayError) -> Self {
        ReconcileError::DatabaseError(e.to_string())
    }
}
