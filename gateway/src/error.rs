//! Error types for the gateway

use protocol_core::ErrorKind;
use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected by the rail (format, authorization, duplication, resource, pause)
    #[error(transparent)]
    Protocol(#[from] protocol_core::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Failure class, for rail rejections
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Protocol(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Underlying rail error
    pub fn as_protocol(&self) -> Option<&protocol_core::Error> {
        match self {
            Self::Protocol(e) => Some(e),
            _ => None,
        }
    }
}
