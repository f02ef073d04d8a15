//! Fetch error taxonomy.
//!
//! Every failure of a backend call is classified into one [`FetchError`].
//! The `Display` text is what the results view shows to the user.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The backend could not be reached at all.
    #[error("Connection failed. Is the backend server running?")]
    ConnectionFailed,

    /// The backend answered with a non-success status.
    #[error("Server error: {status} {reason}")]
    Server { status: u16, reason: String },

    /// A product lookup returned 404.
    #[error("Product not found")]
    NotFound,

    #[error("Request timed out")]
    Timeout,

    /// The response body was not the expected JSON.
    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    Transport(String),

    /// The request could not be built (e.g. an endpoint that resolves to no URL).
    #[error("{0}")]
    Request(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            FetchError::ConnectionFailed
        } else if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_decode() {
            FetchError::Parse(e.to_string())
        } else if e.is_builder() {
            FetchError::Request(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::Server {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            }
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}
