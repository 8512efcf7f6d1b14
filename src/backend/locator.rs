//! Backend port resolution.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::host::{GET_BACKEND_PORT, HostBridge, HostMode};

/// Port used when no desktop host supplies one.
pub const DEFAULT_BACKEND_PORT: u16 = 8000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("backend not available: {0}")]
    BackendPortUnavailable(String),
}

/// Where the backend listens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendAddress {
    pub port: u16,
}

impl BackendAddress {
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/api", self.port)
    }
}

/// Resolves the backend port once and remembers it.
///
/// In hosted mode the port comes from the host bridge; in standalone mode it
/// is the configured default. Resolution holds the cache lock, so callers
/// racing on a cold cache share a single host round trip.
pub struct BackendLocator {
    mode: HostMode,
    host: Arc<dyn HostBridge>,
    default_port: u16,
    port: Mutex<Option<u16>>,
}

impl BackendLocator {
    pub fn new(mode: HostMode, host: Arc<dyn HostBridge>) -> Self {
        Self {
            mode,
            host,
            default_port: DEFAULT_BACKEND_PORT,
            port: Mutex::new(None),
        }
    }

    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    /// Resolve the backend port, using the cached value when present.
    pub async fn get_backend_port(&self) -> Result<u16, LocatorError> {
        let mut cached = self.port.lock().await;
        if let Some(port) = *cached {
            return Ok(port);
        }

        let port = match self.mode {
            HostMode::Standalone => {
                debug!(port = self.default_port, "standalone mode, using default backend port");
                self.default_port
            }
            HostMode::Hosted => self.resolve_from_host().await?,
        };

        *cached = Some(port);
        Ok(port)
    }

    async fn resolve_from_host(&self) -> Result<u16, LocatorError> {
        let reply = self
            .host
            .invoke(GET_BACKEND_PORT, None)
            .await
            .map_err(|e| {
                warn!(error = %e, "failed to get backend port from host");
                LocatorError::BackendPortUnavailable(e.to_string())
            })?;

        let port = port_from_reply(&reply).ok_or_else(|| {
            warn!(reply = %reply, "host returned no usable backend port");
            LocatorError::BackendPortUnavailable("backend port not found".to_string())
        })?;

        debug!(port, "resolved backend port from host");
        Ok(port)
    }

    /// Forget the cached port so the next lookup resolves again.
    pub async fn invalidate_port(&self) {
        let previous = self.port.lock().await.take();
        debug!(?previous, "backend port invalidated");
    }

    /// Cached port, if one has been resolved.
    pub async fn cached_port(&self) -> Option<u16> {
        *self.port.lock().await
    }

    pub async fn address(&self) -> Result<BackendAddress, LocatorError> {
        self.get_backend_port().await.map(|port| BackendAddress { port })
    }

    /// Base URL for every backend request, e.g. `http://127.0.0.1:8000/api`.
    pub async fn api_base(&self) -> Result<Url, LocatorError> {
        let address = self.address().await?;
        Url::parse(&address.base_url())
            .map_err(|e| LocatorError::BackendPortUnavailable(e.to_string()))
    }
}

/// Accept a non-zero port as a JSON number or numeric string.
fn port_from_reply(reply: &Value) -> Option<u16> {
    let raw = match reply {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u16::try_from(raw).ok().filter(|p| *p != 0)
}
