//! Open command - download a stored file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use super::{open_session, ready};

#[derive(Args)]
pub struct OpenCmd {
    /// Stored file name
    pub file_name: String,

    /// Where to write the file (default: file name in current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl OpenCmd {
    pub async fn run(&self) -> Result<()> {
        let (_, session) = open_session()?;
        let gateway = ready(&session).await?;

        let bytes = gateway.open_file(&self.file_name).await?;

        let output = self.output.clone().unwrap_or_else(|| {
            Path::new(&self.file_name)
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(&self.file_name))
        });

        tokio::fs::write(&output, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;

        println!("Saved {} ({} bytes)", output.display(), bytes.len());
        Ok(())
    }
}
