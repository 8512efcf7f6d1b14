//! Thumbnail command - print the preview URL for a stored file.

use anyhow::Result;
use clap::Args;

use super::{open_session, ready};

#[derive(Args)]
pub struct ThumbnailCmd {
    /// Stored file name
    pub file_name: String,
}

impl ThumbnailCmd {
    pub async fn run(&self) -> Result<()> {
        let (_, session) = open_session()?;
        let gateway = ready(&session).await?;

        println!("{}", gateway.thumbnail_url(&self.file_name).await?);
        Ok(())
    }
}
