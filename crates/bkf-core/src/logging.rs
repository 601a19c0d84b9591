//! `tracing` setup for the `bkf` binary.
//!
//! Events go to `$XDG_STATE_HOME/bkf/bkf.log`. If that file cannot be opened
//! the CLI calls `init_logging_stderr` instead. `RUST_LOG` overrides the
//! default filter in both cases.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,bkf=debug,bkf_core=debug,bkf_cli=debug";
const LOG_FILE_NAME: &str = "bkf.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Open `<dir>/bkf.log` for appending, creating `dir` first.
fn open_log_file(dir: &Path) -> Result<(PathBuf, File)> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let path = dir.join(LOG_FILE_NAME);
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    Ok((path, file))
}

/// Log to the state-dir file. Returns the file's path.
pub fn init_logging() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bkf")?;
    let (path, file) = open_log_file(&xdg_dirs.get_state_home())?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e))?;

    tracing::info!("bkf logging to {}", path.display());
    Ok(path)
}

/// Log to stderr. Never fails; a second install is ignored.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn log_file_is_created_under_missing_dir_and_appended() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("state").join("bkf");

        let (path, mut file) = open_log_file(&dir).unwrap();
        assert_eq!(path, dir.join("bkf.log"));
        writeln!(file, "first").unwrap();
        drop(file);

        let (_, mut file) = open_log_file(&dir).unwrap();
        writeln!(file, "second").unwrap();
        drop(file);

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn unusable_log_dir_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        fs::write(&blocker, b"").unwrap();

        let err = open_log_file(&blocker.join("bkf")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to create log directory"), "{err:#}");
    }
}
