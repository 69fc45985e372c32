use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoolreApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Moolre API credentials are not configured")]
    CredentialsMissing,
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}
