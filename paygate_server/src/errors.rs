use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use paygate_engine::{NormalizeError, ReconcileError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("{0}")]
    InvalidRequestBody(String),
    #[error("{0}")]
    InvalidPayload(#[from] NormalizeError),
    #[error("{0}")]
    AuthenticationError(String),
    #[error("{0}")]
    NoRecordFound(String),
    #[error("Payment amount does not match order total")]
    AmountMismatch,
    #[error("Too many requests")]
    RateLimited { retry_after: u64 },
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::AmountMismatch => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Server-side faults are logged in full but never described to the caller
        let message = if status.is_server_error() {
            error!("💻️ {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        let mut response = HttpResponse::build(status);
        response.insert_header(ContentType::json());
        if let Self::RateLimited { retry_after } = self {
            response
                .insert_header(("X-RateLimit-Remaining", "0"))
                .insert_header(("X-RateLimit-Reset", retry_after.to_string()))
                .insert_header(("Retry-After", retry_after.to_string()));
        }
        response.body(serde_json::json!({ "success": false, "message": message }).to_string())
    }
}

impl From<ReconcileError> for ServerError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::OrderNotFound(_) => Self::NoRecordFound("Order not found".into()),
            ReconcileError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
        }
    }
}
