//! Interpretation of submit and progress responses.

use super::error::ExportError;
use crate::transport::HttpReply;
use serde_json::{Map, Value};

const KEY_TASK_ID: &str = "taskId";
const KEY_PROGRESS: &str = "progress";
const KEY_RESULT: &str = "result";

/// What one progress check said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ProgressReport {
    Running(u8),
    /// Progress 100 and the result location from the same response.
    Finished(String),
}

/// True when the body is markup rather than JSON, e.g. a login page.
fn looks_like_markup(body: &str) -> bool {
    body.trim_start().starts_with('<')
}

/// Accept both `"10023"` and `10023`.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract the task identifier from the export-trigger response.
///
/// The body is inspected as text before any JSON parsing: an empty body or
/// an HTML page must not turn into a parse error.
pub(super) fn parse_submit(reply: &HttpReply) -> Result<String, ExportError> {
    let body = reply.text();
    if body.trim().is_empty() {
        return Err(ExportError::SubmitRejected {
            status: reply.status,
            body: body.into_owned(),
        });
    }
    if looks_like_markup(&body) {
        return Err(ExportError::UnauthenticatedOrMalformedResponse {
            status: reply.status,
            body: body.into_owned(),
        });
    }
    if reply.status != 200 {
        return Err(ExportError::SubmitRejected {
            status: reply.status,
            body: body.into_owned(),
        });
    }
    let object: Map<String, Value> = match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(object)) => object,
        _ => {
            return Err(ExportError::UnauthenticatedOrMalformedResponse {
                status: reply.status,
                body: body.into_owned(),
            })
        }
    };
    match object.get(KEY_TASK_ID).and_then(scalar_text) {
        Some(task_id) => Ok(task_id),
        None => Err(ExportError::SubmitRejected {
            status: reply.status,
            body: body.into_owned(),
        }),
    }
}

/// Interpret one progress response. Anything but a 200 with a usable
/// `progress` field is fatal for the run.
pub(super) fn parse_progress(reply: &HttpReply, attempt: u32) -> Result<ProgressReport, ExportError> {
    let fail = |reason: &str| ExportError::PollProtocolError {
        attempt,
        status: reply.status,
        reason: reason.to_string(),
    };
    if reply.status != 200 {
        return Err(fail("unexpected status"));
    }
    let object = match serde_json::from_slice::<Value>(&reply.body) {
        Ok(Value::Object(object)) => object,
        _ => return Err(fail("response is not a JSON object")),
    };
    let progress = object
        .get(KEY_PROGRESS)
        .ok_or_else(|| fail("response has no progress field"))?;
    let progress = progress_value(progress).ok_or_else(|| {
        fail(&format!("progress {} is not an integer between 0 and 100", progress))
    })?;
    if progress < 100 {
        return Ok(ProgressReport::Running(progress));
    }
    match object.get(KEY_RESULT).and_then(scalar_text) {
        Some(location) => Ok(ProgressReport::Finished(location)),
        None => Err(fail("progress is 100 but the response has no result location")),
    }
}

fn progress_value(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    if n > 100 {
        return None;
    }
    u8::try_from(n).ok()
}
