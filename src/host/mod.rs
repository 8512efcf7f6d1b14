//! Desktop host integration.
//!
//! When the client is launched by the desktop host, the host injects one or
//! more markers into the environment and answers a small set of named
//! commands (`start_backend`, `get_backend_port`, `cleanup_backend`). This
//! module detects which mode the process is in and provides the call
//! surface for those commands.

mod bridge;
mod detect;
mod error;
mod http;
mod port_file;

pub use bridge::{HostBridge, HostBridgeChain};
pub use detect::{HOST_URL_VAR, HostMarkers, HostMode, PORT_FILE_VAR, detect_host_mode};
pub use error::HostError;
pub use http::HttpBridge;
pub use port_file::PortFileBridge;

#[cfg(test)]
pub use bridge::MockHostBridge;

/// Command asking the host to launch the backend process.
pub const START_BACKEND: &str = "start_backend";

/// Command asking the host for the TCP port the backend listens on.
pub const GET_BACKEND_PORT: &str = "get_backend_port";

/// Command asking the host to terminate the backend it launched.
pub const CLEANUP_BACKEND: &str = "cleanup_backend";
