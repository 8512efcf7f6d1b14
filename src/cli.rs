//! CLI argument definitions.

use clap::{Parser, Subcommand};

use crate::commands::{
    ConfigCmd, OpenCmd, SearchCmd, StatsCmd, StatusCmd, StopCmd, ThumbnailCmd, UploadCmd,
};

#[derive(Parser)]
#[command(name = "inkling")]
#[command(about = "Inkling - search your local knowledge base")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Search uploaded documents
    Search(SearchCmd),

    /// Upload files to the knowledge base
    Upload(UploadCmd),

    /// Show knowledge base statistics
    Stats(StatsCmd),

    /// Download a stored file
    Open(OpenCmd),

    /// Print the thumbnail URL for a stored file
    Thumbnail(ThumbnailCmd),

    /// Start the backend if needed and report its status
    Status(StatusCmd),

    /// Stop the backend launched by the desktop host
    Stop(StopCmd),

    /// Manage configuration
    Config(ConfigCmd),
}

impl Command {
    pub async fn execute(&self) -> anyhow::Result<()> {
        match self {
            Command::Search(cmd) => cmd.run().await,
            Command::Upload(cmd) => cmd.run().await,
            Command::Stats(cmd) => cmd.run().await,
            Command::Open(cmd) => cmd.run().await,
            Command::Thumbnail(cmd) => cmd.run().await,
            Command::Status(cmd) => cmd.run().await,
            Command::Stop(cmd) => cmd.run().await,
            Command::Config(cmd) => cmd.run().await,
        }
    }
}
