//! Config command - manage client configuration.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};

use crate::config::ClientConfig;
use crate::host::{HOST_URL_VAR, HostMarkers, PORT_FILE_VAR, detect_host_mode};

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub command: ConfigSubCmd,
}

#[derive(Subcommand)]
pub enum ConfigSubCmd {
    /// Set the backend port used outside the desktop host (default: 8000)
    SetPort(SetPortCmd),

    /// Set the command that launches the backend (port file path is appended)
    SetBackendCommand(SetBackendCommandCmd),

    /// Set the upload size that asks for confirmation, in MB (default: 5)
    SetUploadLimit(SetUploadLimitCmd),

    /// Show current configuration
    Show,
}

#[derive(Args)]
pub struct SetPortCmd {
    pub port: u16,
}

#[derive(Args)]
pub struct SetBackendCommandCmd {
    /// Program and arguments, e.g. `python backend/app/main.py`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub argv: Vec<String>,
}

#[derive(Args)]
pub struct SetUploadLimitCmd {
    pub megabytes: f64,
}

impl ConfigCmd {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            ConfigSubCmd::SetPort(cmd) => {
                if cmd.port == 0 {
                    bail!("Port must be non-zero");
                }
                let mut config = ClientConfig::load()?;
                config.default_port = cmd.port;
                config.save()?;
                println!("Default port set to: {}", cmd.port);
            }
            ConfigSubCmd::SetBackendCommand(cmd) => {
                let mut config = ClientConfig::load()?;
                if cmd.argv.is_empty() {
                    config.backend_command = None;
                    println!("Backend command cleared.");
                } else {
                    config.backend_command = Some(cmd.argv.clone());
                    println!("Backend command set to: {}", cmd.argv.join(" "));
                }
                config.save()?;
            }
            ConfigSubCmd::SetUploadLimit(cmd) => {
                if !(cmd.megabytes.is_finite() && cmd.megabytes >= 0.0) {
                    bail!("Upload limit must be a non-negative number");
                }
                let mut config = ClientConfig::load()?;
                config.upload_confirm_mb = cmd.megabytes;
                config.save()?;
                println!("Upload confirmation above: {} MB", cmd.megabytes);
            }
            ConfigSubCmd::Show => {
                let config = ClientConfig::load()?;
                let markers = HostMarkers::from_env();
                println!("Config: {}", ClientConfig::config_path()?.display());
                println!();
                println!("mode:             {}", detect_host_mode(&markers));
                println!(
                    "{:<17} {}",
                    format!("{}:", HOST_URL_VAR.to_lowercase()),
                    markers.host_url.as_deref().unwrap_or("(not set)")
                );
                println!(
                    "{:<17} {}",
                    format!("{}:", PORT_FILE_VAR.to_lowercase()),
                    markers
                        .port_file
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(not set)".to_string())
                );
                println!("default_port:     {}", config.default_port);
                println!(
                    "readiness:        every {}ms, max {} attempts",
                    config.readiness_interval_ms, config.readiness_max_attempts
                );
                println!("upload_confirm:   {} MB", config.upload_confirm_mb);
                println!("top_k:            {}", config.top_k);
                println!(
                    "backend_command:  {}",
                    config
                        .backend_command
                        .as_ref()
                        .map(|c| c.join(" "))
                        .unwrap_or_else(|| "(not set)".to_string())
                );
            }
        }
        Ok(())
    }
}
