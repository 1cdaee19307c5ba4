use std::path::PathBuf;

use thiserror::Error;

/// A block that cannot become a request. Such blocks are skipped, never
/// reported to the user.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedBlock {
    #[error("request line '{0}' has no method and target")]
    IncompleteRequestLine(String),
}

#[derive(Debug, Error)]
#[error("request body is not valid json: {0}")]
pub struct BodyParseError(#[from] pub serde_json::Error);

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("couldn't open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of the underlying http client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        return if err.is_timeout() {
            TransportError::Timeout(message)
        } else if err.is_connect() {
            TransportError::Connect(message)
        } else if err.is_builder() {
            TransportError::InvalidRequest(message)
        } else {
            TransportError::Other(message)
        };
    }
}
