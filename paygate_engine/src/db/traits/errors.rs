use thiserror::Error;

use crate::db_types::OrderReference;

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderReference),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for PaymentGatewayError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        PaymentGatewayError::DatabaseError(format!("Migration failed: {e}"))
    }
}
