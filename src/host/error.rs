//! Host bridge errors.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    /// No bridge adapter could reach the host, or the process runs standalone.
    #[error("host bridge unavailable")]
    Unavailable,

    /// The host received the command and raised.
    #[error("host command failed: {0}")]
    Command(String),
}
