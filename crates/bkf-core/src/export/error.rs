//! Terminal reasons of an export run.

use crate::transport::TransportError;
use std::fmt;
use std::path::PathBuf;

/// Longest body excerpt shown in error messages. The full body stays on the error.
const SNIPPET_CHARS: usize = 300;

/// Workflow phase, used to label transport failures and cancellations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Submit,
    Poll,
    Download,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Submit => "submit",
            Phase::Poll => "progress check",
            Phase::Download => "download",
        };
        f.write_str(name)
    }
}

/// States a run can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Completed,
    /// Protocol, transport or local I/O failure.
    Failed,
    /// The job did not finish within the attempt budget; retrying later may work.
    TimedOut,
    Cancelled,
}

/// Why an export run did not complete.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("export request rejected (HTTP {status}): {}", snippet(.body))]
    SubmitRejected { status: u32, body: String },

    /// Commonly an HTML login page served to unauthenticated clients.
    #[error(
        "export response is not JSON (HTTP {status}); check the username and API token: {}",
        snippet(.body)
    )]
    UnauthenticatedOrMalformedResponse { status: u32, body: String },

    #[error("progress check {attempt} failed (HTTP {status}): {reason}")]
    PollProtocolError {
        attempt: u32,
        status: u32,
        reason: String,
    },

    #[error(
        "export did not finish after {attempts} progress checks (last progress: {})",
        progress_label(.last_progress)
    )]
    TimedOut {
        attempts: u32,
        last_progress: Option<u8>,
    },

    #[error("cannot download {location} (HTTP {status})")]
    DownloadRejected { status: u32, location: String },

    #[error("cannot save archive to {}", .path.display())]
    IoFailure {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{phase} request failed")]
    Transport {
        phase: Phase,
        source: TransportError,
    },

    #[error("export cancelled during {phase}")]
    Cancelled { phase: Phase },
}

impl ExportError {
    pub fn terminal_state(&self) -> TerminalState {
        match self {
            ExportError::TimedOut { .. } => TerminalState::TimedOut,
            ExportError::Cancelled { .. } => TerminalState::Cancelled,
            _ => TerminalState::Failed,
        }
    }

    /// Map a transport failure in `phase`. Aborts become `Cancelled`.
    pub(crate) fn from_transport(phase: Phase, source: TransportError) -> Self {
        match source {
            TransportError::Aborted => ExportError::Cancelled { phase },
            source => ExportError::Transport { phase, source },
        }
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    let mut out: String = trimmed.chars().take(SNIPPET_CHARS).collect();
    if trimmed.chars().count() > SNIPPET_CHARS {
        out.push('…');
    }
    out
}

fn progress_label(progress: &Option<u8>) -> String {
    match progress {
        Some(p) => format!("{}%", p),
        None => "none".to_string(),
    }
}
