//! CLI command implementations.

mod config;
mod open;
mod search;
mod stats;
mod status;
mod stop;
mod thumbnail;
mod upload;

pub use config::ConfigCmd;
pub use open::OpenCmd;
pub use search::SearchCmd;
pub use stats::StatsCmd;
pub use status::StatusCmd;
pub use stop::StopCmd;
pub use thumbnail::ThumbnailCmd;
pub use upload::UploadCmd;

use anyhow::{Context, Result};

use crate::config::ClientConfig;
use crate::session::ClientSession;

/// Load config and build a session for the current environment.
fn open_session() -> Result<(ClientConfig, ClientSession)> {
    let config = ClientConfig::load()?;
    let session = ClientSession::from_env(&config);
    Ok((config, session))
}

/// Bootstrap the backend, failing with a blocking error when it never comes up.
async fn ready(session: &ClientSession) -> Result<&crate::gateway::Gateway> {
    session
        .ready_gateway()
        .await
        .context("Inkling backend is unavailable. Restart the app to try again.")
}
