//! Error types for campaign dispatch.

use thiserror::Error;

/// Errors raised by the store seams (client, template, config, campaign and
/// message-log stores).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The backend could not be reached or rejected the operation.
    #[error("store unavailable: {0}")]
    Backend(String),
}

impl From<database::DatabaseError> for StoreError {
    fn from(err: database::DatabaseError) -> Self {
        match err {
            database::DatabaseError::NotFound { entity, id } => StoreError::NotFound { entity, id },
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Errors surfaced to whoever triggered a dispatch run.
///
/// Per-recipient failures never show up here; they are absorbed into the
/// message log and campaign counters.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The invocation payload is missing or malformed.
    #[error("invalid payload: {0}")]
    Payload(String),

    /// Gateway configuration is incomplete.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The campaign cannot be started in its current state.
    #[error("campaign cannot start: {0}")]
    Precondition(String),

    /// The audience could not be resolved. No state was changed.
    #[error("audience resolution failed: {0}")]
    AudienceResolution(#[source] StoreError),

    /// The run hit an unrecoverable error and the campaign was marked failed.
    #[error("campaign run failed: {0}")]
    RunFailure(String),
}

impl DispatchError {
    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Payload(_) => "payload",
            DispatchError::Configuration(_) => "configuration",
            DispatchError::Precondition(_) => "precondition",
            DispatchError::AudienceResolution(_) => "audience_resolution",
            DispatchError::RunFailure(_) => "run_failure",
        }
    }
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
