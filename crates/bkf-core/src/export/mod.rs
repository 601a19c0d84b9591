//! Export workflow: submit, poll, download.
//!
//! `Exporter::run` walks `Idle → Submitted → Polling → Completed` and stops at
//! the first phase that does not succeed. Only the poll phase repeats a
//! request, bounded by `PollingPolicy`. Everything else fails fast with one
//! `ExportError`.

mod error;
mod job;
mod policy;
mod reply;


pub use error::{ExportError, Phase, TerminalState};
pub use job::{DownloadTarget, ExportJob};
pub use policy::{PollDecision, PollingPolicy};

use crate::control::AbortToken;
use crate::delay::{Delay, ThreadSleep};
use crate::storage::{ArchiveWriter, SavedArchive};
use crate::transport::{ExportTransport, TransportError};
use reply::ProgressReport;
use std::time::{Duration, Instant};

/// Invalid run parameters, rejected before any request is made.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("maximum progress checks must be at least 1")]
    ZeroAttempts,
    #[error("archive file name must be a plain file name, got {0:?}")]
    BadArchiveName(String),
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub task_id: String,
    pub result_location: String,
    /// Progress checks issued, including the one that reported 100.
    pub polls: u32,
    pub archive: SavedArchive,
    pub elapsed: Duration,
}

/// Drives one export through a transport. Holds no state between runs.
pub struct Exporter<T, D = ThreadSleep> {
    transport: T,
    delay: D,
    policy: PollingPolicy,
    target: DownloadTarget,
    abort: AbortToken,
}

impl<T: ExportTransport> Exporter<T> {
    pub fn new(transport: T, policy: PollingPolicy, target: DownloadTarget) -> Self {
        Self {
            transport,
            delay: ThreadSleep::default(),
            policy,
            target,
            abort: AbortToken::new(),
        }
    }
}

impl<T: ExportTransport, D: Delay> Exporter<T, D> {
    /// Replace the pause between progress checks.
    pub fn with_delay<D2: Delay>(self, delay: D2) -> Exporter<T, D2> {
        Exporter {
            transport: self.transport,
            delay,
            policy: self.policy,
            target: self.target,
            abort: self.abort,
        }
    }

    /// Use `abort` as the cancellation hook. Hand the same token to the transport
    /// so in-flight requests stop too.
    pub fn with_abort(mut self, abort: AbortToken) -> Self {
        self.abort = abort;
        self
    }

    pub fn abort_token(&self) -> AbortToken {
        self.abort.clone()
    }

    /// Submit, poll and download. Logs the outcome and how long it took.
    pub fn run(&self) -> Result<ExportReport, ExportError> {
        let started = Instant::now();
        tracing::info!(
            "starting export, archive will be saved to {}",
            self.target.final_path().display()
        );

        let result = self.run_phases(started);
        let took = started.elapsed();
        match &result {
            Ok(report) => tracing::info!(
                task_id = %report.task_id,
                polls = report.polls,
                "export succeeded and took {:.1?}",
                took
            ),
            Err(e) => tracing::error!(
                state = ?e.terminal_state(),
                "export failed and took {:.1?}: {}",
                took,
                e
            ),
        }
        result
    }

    fn run_phases(&self, started: Instant) -> Result<ExportReport, ExportError> {
        let mut job = self.submit()?;
        let result_location = self.poll(&mut job)?;
        let archive = self.download(&result_location)?;
        Ok(ExportReport {
            task_id: job.task_id().to_string(),
            result_location,
            polls: job.polls(),
            archive,
            elapsed: started.elapsed(),
        })
    }

    fn check_abort(&self, phase: Phase) -> Result<(), ExportError> {
        if self.abort.is_aborted() {
            tracing::warn!("abort requested before {}", phase);
            return Err(ExportError::Cancelled { phase });
        }
        Ok(())
    }

    /// Trigger the export. `Idle → Submitted`.
    pub fn submit(&self) -> Result<ExportJob, ExportError> {
        self.check_abort(Phase::Submit)?;
        let reply = self
            .transport
            .submit_export()
            .map_err(|e| ExportError::from_transport(Phase::Submit, e))?;
        match reply::parse_submit(&reply) {
            Ok(task_id) => {
                tracing::info!("export task ID is {}", task_id);
                Ok(ExportJob::new(task_id))
            }
            Err(e) => {
                tracing::debug!(status = reply.status, "export request response body: {}", reply.text());
                Err(e)
            }
        }
    }

    /// Check progress until 100, the attempt budget runs out, or a response
    /// is unusable. `Submitted → Polling → (result location)`.
    ///
    /// Returns the result location from the response that reported 100.
    pub fn poll(&self, job: &mut ExportJob) -> Result<String, ExportError> {
        let mut attempt = 0u32;
        loop {
            self.check_abort(Phase::Poll)?;
            attempt += 1;
            let reply = self
                .transport
                .check_progress(job.task_id())
                .map_err(|e| ExportError::from_transport(Phase::Poll, e))?;
            job.count_poll();

            match reply::parse_progress(&reply, attempt)? {
                ProgressReport::Finished(location) => {
                    tracing::info!(attempt, "export progress: 100");
                    tracing::info!("export finished successfully");
                    job.finish(location.clone());
                    return Ok(location);
                }
                ProgressReport::Running(progress) => {
                    tracing::info!(attempt, "export progress: {}", progress);
                    job.observe(progress);
                }
            }

            match self.policy.decide(attempt) {
                PollDecision::GiveUp => {
                    return Err(ExportError::TimedOut {
                        attempts: attempt,
                        last_progress: job.progress(),
                    })
                }
                PollDecision::PollAgainAfter(delay) => {
                    if !self.delay.pause(delay, &self.abort) {
                        tracing::warn!("abort requested while waiting for the export");
                        return Err(ExportError::Cancelled { phase: Phase::Poll });
                    }
                }
            }
        }
    }

    /// Fetch the archive and publish it at the target path. `→ Completed`.
    ///
    /// The body goes to a `.part` file first; any failure (non-200, transport,
    /// disk) removes it and leaves an existing archive untouched.
    pub fn download(&self, location: &str) -> Result<SavedArchive, ExportError> {
        self.check_abort(Phase::Download)?;
        let final_path = self.target.final_path();
        tracing::info!("downloading now: {} (this may take a while)", location);

        let mut writer = ArchiveWriter::create(&final_path).map_err(|source| {
            ExportError::IoFailure {
                path: final_path.clone(),
                source,
            }
        })?;
        let status = match self.transport.download(location, &mut writer) {
            Ok(status) => status,
            Err(TransportError::Sink(source)) => {
                return Err(ExportError::IoFailure {
                    path: writer.temp_path().to_path_buf(),
                    source,
                })
            }
            Err(e) => return Err(ExportError::from_transport(Phase::Download, e)),
        };
        if status != 200 {
            return Err(ExportError::DownloadRejected {
                status,
                location: location.to_string(),
            });
        }

        let saved = writer.commit().map_err(|source| ExportError::IoFailure {
            path: final_path.clone(),
            source,
        })?;
        tracing::info!(
            bytes = saved.bytes,
            sha256 = %saved.sha256,
            "saved the export archive to {}",
            saved.path.display()
        );
        Ok(saved)
    }
}
