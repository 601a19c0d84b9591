//! HTTP side of the export workflow.
//!
//! The orchestrator only sees `ExportTransport`: three fully formed requests
//! that hand back a status and a body (or stream the body into a sink).
//! `CurlTransport` is the libcurl implementation.

mod curl_client;
mod endpoints;

pub use curl_client::{CurlOptions, CurlTransport};
pub use endpoints::Endpoints;

use std::borrow::Cow;
use std::io::Write;

/// Status and body of a small JSON-ish response (submit, progress).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u32,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn new(status: u32, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Body as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Failure below the HTTP status level.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection refused, DNS, TLS, timeout, etc.
    #[error(transparent)]
    Curl(#[from] curl::Error),
    /// Could not build a request URL from the instance and a server-supplied fragment.
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The local sink refused bytes during a download.
    #[error("local write failed: {0}")]
    Sink(#[source] std::io::Error),
    /// The abort token was set while the request was in flight.
    #[error("request aborted")]
    Aborted,
}

/// The three requests the export workflow needs.
pub trait ExportTransport {
    /// Trigger a new export job.
    fn submit_export(&self) -> Result<HttpReply, TransportError>;

    /// Ask for the progress of `task_id`.
    fn check_progress(&self, task_id: &str) -> Result<HttpReply, TransportError>;

    /// Fetch the archive at `location`, streaming the body into `sink`.
    /// Returns the HTTP status; the caller decides what to do with the bytes.
    fn download(&self, location: &str, sink: &mut dyn Write) -> Result<u32, TransportError>;
}

impl<T: ExportTransport + ?Sized> ExportTransport for &T {
    fn submit_export(&self) -> Result<HttpReply, TransportError> {
        (**self).submit_export()
    }

    fn check_progress(&self, task_id: &str) -> Result<HttpReply, TransportError> {
        (**self).check_progress(task_id)
    }

    fn download(&self, location: &str, sink: &mut dyn Write) -> Result<u32, TransportError> {
        (**self).download(location, sink)
    }
}
