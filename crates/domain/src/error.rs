use thiserror::Error;

use crate::diagnostic::RemoteError;
use crate::method::{Operation, ResourceKind};

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Connectivity or timeout failure talking to the hub. Never retried.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The module answered but rejected the request.
    #[error("Remote operation failed: {}", .0.message)]
    RemoteOperation(RemoteError),

    #[error("Operation {operation} is not supported for {kind}")]
    UnsupportedOperation {
        operation: Operation,
        kind: ResourceKind,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Not connected to an IoT Hub")]
    NotConnected,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// The remote error payload, when the module rejected the request
    pub fn remote_error(&self) -> Option<&RemoteError> {
        match self {
            Self::RemoteOperation(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
