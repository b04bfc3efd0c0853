//! Error types for the push gateway client
//!
//! Delivery results are not errors (see `DeliveryOutcome`); these only cover
//! building a gateway.

/// Push gateway error type
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Gateway configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for gateway construction
pub type Result<T> = std::result::Result<T, PushError>;

impl PushError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        PushError::ConfigError(msg.into())
    }
}
