//! CLI for BKF.

mod commands;

use anyhow::Result;
use bkf_core::config::{self, BkfConfig};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use commands::{run_backup, run_show_config};

/// Top-level CLI for the BKF backup fetcher.
#[derive(Debug, Parser)]
#[command(name = "bkf", version)]
#[command(about = "BKF: trigger a cloud export, wait for it, and download the backup archive", long_about = None)]
pub struct Cli {
    /// Read settings from this file instead of ~/.config/bkf/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run one export and save the archive.
    Backup(BackupArgs),

    /// Print the config file location and the effective settings.
    Config,
}

#[derive(Debug, Clone, Args)]
pub struct BackupArgs {
    /// User to execute the backup job as.
    #[arg(short = 'u', long = "username")]
    pub user: String,

    /// API token to authenticate the user.
    #[arg(short = 't', long = "token", env = "BKF_TOKEN", hide_env_values = true)]
    pub api_token: String,

    /// Instance host (e.g. acme.atlassian.net) or base URL.
    #[arg(short = 'i', long = "instance")]
    pub instance: String,

    /// Directory to save the downloaded backup file in. Must exist.
    #[arg(short = 'd', long = "dir", default_value = ".")]
    pub directory: PathBuf,

    /// Maximum number of progress checks before giving up.
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Pause between progress checks, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// File name of the saved archive.
    #[arg(long, value_name = "NAME")]
    pub archive_name: Option<String>,
}

impl BackupArgs {
    /// Apply command-line overrides on top of the file config.
    pub fn merge_into(&self, mut cfg: BkfConfig) -> BkfConfig {
        if let Some(n) = self.max_attempts {
            cfg.polling.max_attempts = n;
        }
        if let Some(ms) = self.delay_ms {
            cfg.polling.delay_ms = ms;
        }
        if let Some(name) = &self.archive_name {
            cfg.archive_file_name = name.clone();
        }
        cfg
    }
}

fn load_config(explicit: Option<&Path>) -> Result<(BkfConfig, PathBuf)> {
    match explicit {
        Some(path) => Ok((config::load_from(path)?, path.to_path_buf())),
        None => Ok((config::load_or_init()?, config::config_path()?)),
    }
}

impl CliCommand {
    /// Parse arguments and run. Returns the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        let (cfg, cfg_path) = load_config(cli.config.as_deref())?;
        tracing::debug!("loaded config from {}: {:?}", cfg_path.display(), cfg);

        match cli.command {
            CliCommand::Backup(args) => {
                let cfg = args.merge_into(cfg);
                run_backup(&args, &cfg).await
            }
            CliCommand::Config => {
                run_show_config(&cfg_path, &cfg)?;
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests;
