//! Startup wiring for the client.
//!
//! The host mode is detected once here and threaded through every component.
//! The session only hands out the [`Gateway`] after bootstrap reached
//! [`BootstrapState::Ready`].

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{
    BackendLocator, BootstrapFailure, BootstrapState, Bootstrapper, HealthProbe,
};
use crate::config::ClientConfig;
use crate::gateway::Gateway;
use crate::host::{
    CLEANUP_BACKEND, HostBridge, HostBridgeChain, HostError, HostMarkers, HostMode, HttpBridge,
    PortFileBridge, detect_host_mode,
};
use crate::upload::UploadGuard;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    BackendStartFailed(BootstrapFailure),

    #[error("backend is not ready ({0})")]
    NotReady(BootstrapState),
}

pub struct ClientSession {
    mode: HostMode,
    host: Arc<dyn HostBridge>,
    locator: Arc<BackendLocator>,
    gateway: Arc<Gateway>,
    bootstrapper: Arc<Bootstrapper>,
    upload_guard: UploadGuard,
}

impl ClientSession {
    /// Build a session from the markers present in the environment.
    pub fn from_env(config: &ClientConfig) -> Self {
        Self::new(config, &HostMarkers::from_env())
    }

    pub fn new(config: &ClientConfig, markers: &HostMarkers) -> Self {
        let mode = detect_host_mode(markers);
        let chain = bridge_chain(mode, markers, config);
        info!(mode = %mode, adapters = chain.len(), "host mode detected");
        Self::with_host(mode, Arc::new(chain), config)
    }

    pub fn with_host(mode: HostMode, host: Arc<dyn HostBridge>, config: &ClientConfig) -> Self {
        let locator = Arc::new(
            BackendLocator::new(mode, Arc::clone(&host)).with_default_port(config.default_port),
        );
        let gateway = Arc::new(Gateway::new(Arc::clone(&locator)));
        let probe: Arc<dyn HealthProbe> = gateway.clone();
        let bootstrapper = Arc::new(
            Bootstrapper::new(mode, Arc::clone(&host), Arc::clone(&locator), probe)
                .with_policy(config.readiness_policy()),
        );

        Self {
            mode,
            host,
            locator,
            gateway,
            bootstrapper,
            upload_guard: UploadGuard::new(config.upload_confirm_mb),
        }
    }

    pub fn mode(&self) -> HostMode {
        self.mode
    }

    pub fn state(&self) -> BootstrapState {
        self.bootstrapper.state()
    }

    pub fn locator(&self) -> &BackendLocator {
        &self.locator
    }

    pub fn bootstrapper(&self) -> &Arc<Bootstrapper> {
        &self.bootstrapper
    }

    pub fn upload_guard(&self) -> UploadGuard {
        self.upload_guard
    }

    /// Bootstrap the backend. Dropping the returned future cancels polling.
    pub async fn start(&self) -> Result<(), SessionError> {
        match self.bootstrapper.spawn().wait().await {
            BootstrapState::Ready => Ok(()),
            BootstrapState::Failed(reason) => Err(SessionError::BackendStartFailed(reason)),
            other => Err(SessionError::NotReady(other)),
        }
    }

    /// The gateway, provided bootstrap has completed.
    pub fn gateway(&self) -> Result<&Gateway, SessionError> {
        match self.state() {
            BootstrapState::Ready => Ok(&self.gateway),
            BootstrapState::Failed(reason) => Err(SessionError::BackendStartFailed(reason)),
            other => Err(SessionError::NotReady(other)),
        }
    }

    /// Start if needed, then hand out the gateway.
    pub async fn ready_gateway(&self) -> Result<&Gateway, SessionError> {
        if !self.state().is_ready() {
            self.start().await?;
        }
        self.gateway()
    }

    /// Ask the host to stop the backend it launched.
    ///
    /// Returns `false` when the host reports there was nothing to stop. Hosts
    /// that reply without a `stopped` flag are taken to have stopped it.
    pub async fn stop_backend(&self) -> Result<bool, HostError> {
        let reply = self.host.invoke(CLEANUP_BACKEND, None).await?;
        self.locator.invalidate_port().await;
        Ok(reply.get("stopped").and_then(Value::as_bool).unwrap_or(true))
    }
}

fn bridge_chain(mode: HostMode, markers: &HostMarkers, config: &ClientConfig) -> HostBridgeChain {
    let mut chain = HostBridgeChain::new(mode);

    if let Some(raw) = &markers.host_url {
        match HttpBridge::from_marker(raw) {
            Some(bridge) => chain = chain.with_adapter(bridge),
            None => warn!(value = %raw, "ignoring malformed host url marker"),
        }
    }

    if let Some(path) = &markers.port_file {
        let mut bridge =
            PortFileBridge::new(path.clone()).with_wait_timeout(config.port_file_timeout());
        if let Some(argv) = &config.backend_command {
            bridge = bridge.with_backend_command(argv.clone());
        }
        chain = chain.with_adapter(bridge);
    }

    chain
}
