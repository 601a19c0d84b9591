//! libcurl implementation of `ExportTransport`.
//!
//! Every call builds a fresh `Easy` handle with basic auth, compression and
//! timeouts, and runs on the current thread. Call from `spawn_blocking` if
//! used from async code.

use super::endpoints::Endpoints;
use super::{ExportTransport, HttpReply, TransportError};
use crate::auth::Authorization;
use crate::control::AbortToken;
use curl::easy::{Easy, List};
use std::io::Write;
use std::time::Duration;
use url::Url;

const JSON_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";
const DOWNLOAD_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,\
                               */*;q=0.8,application/signed-exchange;v=b3";
const RUN_BACKUP_BODY: &[u8] = br#"{"cbAttachments":"true","exportToCloud":"true"}"#;

/// Per-request curl limits.
#[derive(Debug, Clone, Copy)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Wall-clock cap on a whole request, download included.
    pub request_timeout: Duration,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(3600),
        }
    }
}

/// Talks to one export-service instance with one set of credentials.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    endpoints: Endpoints,
    authorization: Authorization,
    options: CurlOptions,
    abort: AbortToken,
}

impl CurlTransport {
    pub fn new(instance: &str, authorization: Authorization) -> Result<Self, url::ParseError> {
        Ok(Self {
            endpoints: Endpoints::new(instance)?,
            authorization,
            options: CurlOptions::default(),
            abort: AbortToken::new(),
        })
    }

    pub fn with_options(mut self, options: CurlOptions) -> Self {
        self.options = options;
        self
    }

    /// Abort in-flight transfers when `abort` is set.
    pub fn with_abort(mut self, abort: AbortToken) -> Self {
        self.abort = abort;
        self
    }

    fn handle(&self, url: &Url, accept: &str, extra: &[(&str, &str)]) -> Result<Easy, curl::Error> {
        let mut easy = Easy::new();
        easy.url(url.as_str())?;
        self.authorization.apply(&mut easy)?;
        // Empty string: let libcurl advertise every encoding it was built with.
        easy.accept_encoding("")?;
        easy.connect_timeout(self.options.connect_timeout)?;
        easy.timeout(self.options.request_timeout)?;
        easy.progress(true)?;

        let mut list = List::new();
        list.append(&format!("accept: {}", accept))?;
        for (k, v) in extra {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        easy.http_headers(list)?;
        Ok(easy)
    }

    /// Run a request and buffer the whole body.
    fn fetch(&self, mut easy: Easy) -> Result<HttpReply, TransportError> {
        let mut body = Vec::new();
        let abort = &self.abort;
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.progress_function(|_, _, _, _| !abort.is_aborted())?;
            transfer.perform().map_err(|e| self.classify(e))?;
        }
        let status = easy.response_code()?;
        Ok(HttpReply { status, body })
    }

    fn classify(&self, e: curl::Error) -> TransportError {
        if e.is_aborted_by_callback() || self.abort.is_aborted() {
            TransportError::Aborted
        } else {
            TransportError::Curl(e)
        }
    }
}

impl ExportTransport for CurlTransport {
    fn submit_export(&self) -> Result<HttpReply, TransportError> {
        let url = self.endpoints.run_backup()?;
        let origin = self.endpoints.origin();
        let mut easy = self.handle(
            &url,
            JSON_ACCEPT,
            &[
                ("origin", origin.as_str()),
                ("content-type", "application/json"),
                ("x-requested-with", "XMLHttpRequest"),
            ],
        )?;
        easy.post(true)?;
        easy.post_fields_copy(RUN_BACKUP_BODY)?;
        tracing::debug!("POST {}", url);
        self.fetch(easy)
    }

    fn check_progress(&self, task_id: &str) -> Result<HttpReply, TransportError> {
        let url = self.endpoints.progress(task_id)?;
        let easy = self.handle(&url, JSON_ACCEPT, &[])?;
        tracing::debug!("GET {}", url);
        self.fetch(easy)
    }

    fn download(&self, location: &str, sink: &mut dyn Write) -> Result<u32, TransportError> {
        let url = self.endpoints.download(location)?;
        let mut easy = self.handle(&url, DOWNLOAD_ACCEPT, &[])?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        tracing::debug!("GET {}", url);

        let mut sink_error: Option<std::io::Error> = None;
        let abort = &self.abort;
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match sink.write_all(data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    sink_error = Some(e);
                    Ok(0) // abort transfer
                }
            })?;
            transfer.progress_function(|_, _, _, _| !abort.is_aborted())?;
            let performed = transfer.perform();
            drop(transfer);
            if let Err(e) = performed {
                if e.is_write_error() {
                    if let Some(io_err) = sink_error.take() {
                        return Err(TransportError::Sink(io_err));
                    }
                }
                return Err(self.classify(e));
            }
        }
        sink.flush().map_err(TransportError::Sink)?;
        Ok(easy.response_code()?)
    }
}
