//! DigitalOcean client errors

use thiserror::Error;

/// Errors that can occur when interacting with the DigitalOcean API
#[derive(Debug, Error)]
pub enum DropletError {
    /// HTTP request/response error (connection, timeout, TLS, body decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a status code outside the accepted set.
    ///
    /// `body` is the raw response body, kept verbatim for diagnostics.
    #[error("DigitalOcean API error: {request} returned {status} - {body}")]
    Api {
        /// Method and path of the failed request, e.g. `GET /v2/droplets`
        request: String,
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid request (e.g., unknown droplet in the mock store)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl DropletError {
    /// HTTP status of an [`DropletError::Api`] error, if this is one
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
