//! Status command - bootstrap the backend and report where it lives.

use std::future::Future;

use anyhow::{Result, bail};
use clap::Args;

use super::open_session;
use crate::session::ClientSession;

#[derive(Args)]
pub struct StatusCmd;

impl StatusCmd {
    pub async fn run(&self) -> Result<()> {
        let (_, session) = open_session()?;
        println!("Mode:     {}", session.mode());

        follow_bootstrap(&session, tokio::signal::ctrl_c()).await?;

        let base = session.locator().api_base().await?;
        println!("API:      {}", base);
        Ok(())
    }
}

/// Start the backend, printing each state change until it settles or
/// `interrupt` fires.
async fn follow_bootstrap<F: Future>(session: &ClientSession, interrupt: F) -> Result<()> {
    let mut states = session.bootstrapper().subscribe();
    let start = session.start();
    tokio::pin!(start);
    tokio::pin!(interrupt);

    // Dropping `start` on interrupt cancels the readiness polling.
    let outcome = loop {
        tokio::select! {
            outcome = &mut start => break outcome,
            changed = states.changed() => {
                if changed.is_err() {
                    break (&mut start).await;
                }
                println!("  {}", *states.borrow_and_update());
            }
            _ = &mut interrupt => {
                bail!("Interrupted while waiting for the backend");
            }
        }
    };

    println!("State:    {}", session.state());
    outcome?;
    Ok(())
}
