//! Error types for the dispatch jobs

use muezzin_push::PushError;

/// Engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The job could not even list its work; nothing was processed
    #[error("Failed to enumerate {what}: {source}")]
    FatalEnumeration {
        what: &'static str,
        #[source]
        source: muezzin_core::Error,
    },

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User {0} has no deliverable registration token")]
    NoDeliverableToken(String),

    #[error(transparent)]
    Core(#[from] muezzin_core::Error),

    #[error(transparent)]
    Push(#[from] PushError),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn enumeration(what: &'static str, source: muezzin_core::Error) -> Self {
        EngineError::FatalEnumeration { what, source }
    }
}
