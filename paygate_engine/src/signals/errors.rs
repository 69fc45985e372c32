use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
    #[error("Missing order reference")]
    MissingReference,
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}
