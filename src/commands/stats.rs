//! Stats command - show knowledge base statistics.

use anyhow::{Context, Result};
use clap::Args;

use super::{open_session, ready};

#[derive(Args)]
pub struct StatsCmd;

impl StatsCmd {
    pub async fn run(&self) -> Result<()> {
        let (_, session) = open_session()?;
        let gateway = ready(&session).await?;

        let stats = gateway.get_stats().await.context("Failed to fetch stats")?;

        match stats.total_documents {
            Some(total) => println!("Documents:   {}", total),
            None => println!("Documents:   -"),
        }

        Ok(())
    }
}
