//! Upload command - add files to the knowledge base.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;

use super::{open_session, ready};
use crate::gateway::{Gateway, UploadResponse};
use crate::upload::{UploadBatch, UploadOutcome};

#[derive(Args)]
pub struct UploadCmd {
    /// Files to upload (.pdf, .txt, .md, .zip)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Upload large batches without asking
    #[arg(short, long)]
    pub yes: bool,
}

impl UploadCmd {
    pub async fn run(&self) -> Result<()> {
        let batch = UploadBatch::from_paths(&self.paths)
            .await
            .context("Failed to read files")?;

        let (_, session) = open_session()?;
        let gateway = ready(&session).await?;

        let response = match session.upload_guard().submit(gateway, batch).await? {
            UploadOutcome::Uploaded(response) => response,
            UploadOutcome::NeedsConfirmation(pending) => {
                if !self.yes && !confirm(pending.batch().len(), pending.total_mb())? {
                    println!("Upload cancelled.");
                    return Ok(());
                }
                pending.confirm(gateway).await?
            }
        };

        report(gateway, response).await
    }
}

fn confirm(files: usize, total_mb: f64) -> Result<bool> {
    print!(
        "You are uploading {} files ({:.2} MB). Large uploads may take a while. Continue? [y/N] ",
        files, total_mb
    );
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

async fn report(gateway: &Gateway, response: UploadResponse) -> Result<()> {
    if let Some(error) = response.error {
        bail!("Upload failed: {}", error);
    }

    println!(
        "{}",
        response
            .message
            .as_deref()
            .unwrap_or("Files uploaded successfully!")
    );

    // Refresh the count; the upload itself already succeeded.
    match gateway.get_stats().await {
        Ok(stats) => {
            if let Some(total) = stats.total_documents {
                println!("Documents:   {}", total);
            }
        }
        Err(e) => tracing::warn!(error = %e, "failed to refresh stats after upload"),
    }

    Ok(())
}
