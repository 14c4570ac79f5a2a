//! Error types for waha-client.

use thiserror::Error;

/// Errors that can occur when building or talking to the gateway client.
///
/// Sends never return these; they are normalized into
/// [`SendOutcome::Failed`](crate::SendOutcome::Failed).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
