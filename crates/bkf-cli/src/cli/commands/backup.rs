//! Backup command: compose the export pipeline and run it once.

use crate::cli::BackupArgs;
use anyhow::{Context, Result};
use bkf_core::auth::Credentials;
use bkf_core::config::BkfConfig;
use bkf_core::control::AbortToken;
use bkf_core::export::{ExportReport, Exporter, TerminalState};
use bkf_core::transport::{CurlOptions, CurlTransport};

/// Exit code for each terminal state. `TimedOut` uses EX_TEMPFAIL: try again later.
pub(crate) fn exit_code(state: TerminalState) -> i32 {
    match state {
        TerminalState::Completed => 0,
        TerminalState::Failed => 1,
        TerminalState::TimedOut => 75,
        TerminalState::Cancelled => 130,
    }
}

/// `sha256  path  (N bytes, took T)`, the line printed after a completed export.
pub(crate) fn summary_line(report: &ExportReport) -> String {
    format!(
        "{}  {}  ({} bytes, took {:.1?})",
        report.archive.sha256,
        report.archive.path.display(),
        report.archive.bytes,
        report.elapsed
    )
}

/// Run one export. Ctrl-C sets the abort token; the workflow stops at its next check.
pub async fn run_backup(args: &BackupArgs, cfg: &BkfConfig) -> Result<i32> {
    if !args.directory.is_dir() {
        anyhow::bail!(
            "output directory {} does not exist or is not a directory",
            args.directory.display()
        );
    }
    let policy = cfg.polling_policy()?;
    let target = cfg.download_target(&args.directory)?;

    let abort = AbortToken::new();
    let authorization = Credentials::new(&args.user, &args.api_token).authorization();
    let transport = CurlTransport::new(&args.instance, authorization)
        .with_context(|| format!("invalid instance {:?}", args.instance))?
        .with_options(CurlOptions::from(&cfg.http))
        .with_abort(abort.clone());
    let exporter = Exporter::new(transport, policy, target).with_abort(abort.clone());

    tracing::info!(
        instance = %args.instance,
        max_attempts = policy.max_attempts(),
        delay_ms = cfg.polling.delay_ms,
        "starting the backup"
    );

    let mut handle = tokio::task::spawn_blocking(move || exporter.run());
    let joined = tokio::select! {
        joined = &mut handle => joined,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupt received, cancelling the export");
            eprintln!("bkf: cancelling…");
            abort.request_abort();
            handle.await
        }
    };

    match joined.context("export task panicked")? {
        Ok(report) => {
            println!("{}", summary_line(&report));
            Ok(exit_code(TerminalState::Completed))
        }
        Err(e) => {
            let state = e.terminal_state();
            eprintln!("bkf error: {:#}", anyhow::Error::new(e));
            Ok(exit_code(state))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bkf_core::storage::SavedArchive;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn exit_codes_distinguish_terminal_states() {
        assert_eq!(exit_code(TerminalState::Completed), 0);
        assert_eq!(exit_code(TerminalState::Failed), 1);
        assert_eq!(exit_code(TerminalState::TimedOut), 75);
        assert_eq!(exit_code(TerminalState::Cancelled), 130);
    }

    #[test]
    fn summary_line_reports_digest_size_and_duration() {
        let report = ExportReport {
            task_id: "10023".to_string(),
            result_location: "export/download/?fileId=abc".to_string(),
            polls: 2,
            archive: SavedArchive {
                path: PathBuf::from("/srv/backups/backup.zip"),
                bytes: 16,
                sha256: "ab".repeat(32),
            },
            elapsed: Duration::from_millis(2500),
        };

        assert_eq!(
            summary_line(&report),
            format!(
                "{}  /srv/backups/backup.zip  (16 bytes, took 2.5s)",
                "ab".repeat(32)
            )
        );
    }
}
