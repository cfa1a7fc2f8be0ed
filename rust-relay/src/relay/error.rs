//! Outbound relay errors.

use thiserror::Error;

/// Failure to deliver a reply through the provider.
///
/// None of these reach the webhook caller; they are logged by the task that
/// dispatched the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("provider request failed: {0}")]
    Network(String),

    #[error("provider rejected message (http {status}, code {code}): {message}")]
    Api {
        status: u16,
        code: i64,
        message: String,
    },

    #[error("unexpected provider response: {0}")]
    Parse(String),

    #[error("invalid address: {0:?}")]
    InvalidAddress(String),
}

impl RelayError {
    /// Stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Network(_) => "network",
            RelayError::Api { .. } => "api",
            RelayError::Parse(_) => "parse",
            RelayError::InvalidAddress(_) => "invalid_address",
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Network(e.to_string())
    }
}
