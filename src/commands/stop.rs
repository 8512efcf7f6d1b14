//! Stop command - ask the desktop host to shut the backend down.

use anyhow::{Context, Result};
use clap::Args;

use super::open_session;
use crate::host::HostMode;

#[derive(Args)]
pub struct StopCmd;

impl StopCmd {
    pub async fn run(&self) -> Result<()> {
        let (_, session) = open_session()?;

        if session.mode() == HostMode::Standalone {
            println!("Not running under the desktop host; nothing to stop.");
            return Ok(());
        }

        let stopped = session
            .stop_backend()
            .await
            .context("Failed to stop backend")?;
        if stopped {
            println!("Backend stopped.");
        } else {
            println!("No backend was running; nothing to stop.");
        }
        Ok(())
    }
}
