//! Gateway errors.

use thiserror::Error;

use crate::backend::LocatorError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Unresolved(#[from] LocatorError),

    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx reply; `detail` is the message shown to the user.
    #[error("{detail}")]
    Status { status: u16, detail: String },

    #[error("bad response: {0}")]
    BadResponse(String),
}

/// Coarse classification used by callers deciding how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    NetworkFailure,
    HttpStatus(u16),
    BadResponse,
}

impl GatewayError {
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            GatewayError::Unresolved(_) | GatewayError::Network(_) => {
                GatewayErrorKind::NetworkFailure
            }
            GatewayError::Status { status, .. } => GatewayErrorKind::HttpStatus(*status),
            GatewayError::BadResponse(_) => GatewayErrorKind::BadResponse,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
