//! Error types for service discovery

use thiserror::Error;

use crate::registration::ServiceName;

/// Discovery error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Registration rejected: registry responded with status {0}")]
    RegistrationRejected(u16),

    #[error("Deregistration rejected: registry responded with status {0}")]
    DeregistrationRejected(u16),

    #[error("No provider available for service {0}")]
    NoProvider(ServiceName),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for discovery operations
pub type Result<T> = std::result::Result<T, Error>;
