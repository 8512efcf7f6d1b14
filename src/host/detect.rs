//! Host environment detection.

use std::path::PathBuf;

/// Environment variable carrying the host control endpoint.
pub const HOST_URL_VAR: &str = "INKLING_HOST_URL";

/// Environment variable naming the file the host writes the backend port to.
pub const PORT_FILE_VAR: &str = "INKLING_PORT_FILE";

/// Whether the client was launched by the desktop host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMode {
    Hosted,
    Standalone,
}

impl std::fmt::Display for HostMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostMode::Hosted => write!(f, "hosted"),
            HostMode::Standalone => write!(f, "standalone"),
        }
    }
}

/// Snapshot of the markers the desktop host injects at launch.
///
/// Hosts of different versions inject different subsets, so each marker is
/// optional and any one of them is enough to count as hosted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostMarkers {
    pub host_url: Option<String>,
    pub port_file: Option<PathBuf>,
}

impl HostMarkers {
    /// Read markers from the process environment.
    pub fn from_env() -> Self {
        Self {
            host_url: non_empty_var(HOST_URL_VAR),
            port_file: non_empty_var(PORT_FILE_VAR).map(PathBuf::from),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Decide the host mode from a marker snapshot.
pub fn detect_host_mode(markers: &HostMarkers) -> HostMode {
    let has_url = markers
        .host_url
        .as_deref()
        .is_some_and(|u| !u.trim().is_empty());
    let has_port_file = markers
        .port_file
        .as_ref()
        .is_some_and(|p| !p.as_os_str().is_empty());

    if has_url || has_port_file {
        HostMode::Hosted
    } else {
        HostMode::Standalone
    }
}
