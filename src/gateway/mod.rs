//! Request gateway: the only place that talks HTTP to the backend.
//!
//! Every operation derives its URL from [`BackendLocator::api_base`], so
//! callers never know which port the backend ended up on.
//!
//! [`BackendLocator::api_base`]: crate::backend::BackendLocator::api_base

mod client;
mod error;
mod models;

#[cfg(test)]
pub(crate) mod testing;

pub use client::Gateway;
pub use error::{GatewayError, GatewayErrorKind};
pub use models::{SearchHit, UploadResponse};
