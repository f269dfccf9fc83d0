use crate::model::SessionId;
use thiserror::Error;

/// Failures of the host's page capabilities.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host refused to run the inspection inside the document.
    #[error("page inspection denied: {reason}")]
    Denied { reason: String },

    /// The session is unknown or has gone away.
    #[error("no such session: {0}")]
    SessionNotFound(SessionId),

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Fetch(#[from] reqwest::Error),
}

impl HostError {
    pub fn denied(reason: impl Into<String>) -> Self {
        HostError::Denied {
            reason: reason.into(),
        }
    }
}
