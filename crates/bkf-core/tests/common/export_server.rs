//! Minimal HTTP/1.1 server that plays the export service for integration tests.
//!
//! Serves scripted responses for the three export endpoints and records every
//! request it sees. Progress responses are consumed in order; once the script
//! runs out the last one is repeated.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const RUN_BACKUP_PATH: &str = "/rest/backup/1/export/runbackup";
pub const PROGRESS_PATH: &str = "/rest/backup/1/export/getProgress";
pub const DOWNLOAD_PREFIX: &str = "/plugins/servlet/";

#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// Announce more bytes than `body` holds, send `body`, then hold the
    /// connection open until the client goes away.
    pub stall: bool,
}

impl Canned {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
            stall: false,
        }
    }

    pub fn html(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/html",
            body: body.as_bytes().to_vec(),
            stall: false,
        }
    }

    pub fn bytes(status: u16, body: &[u8]) -> Self {
        Self {
            status,
            content_type: "application/zip",
            body: body.to_vec(),
            stall: false,
        }
    }

    /// 200 archive response that sends `head` and then never finishes.
    pub fn stalled(head: &[u8]) -> Self {
        Self {
            stall: true,
            ..Self::bytes(200, head)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Script {
    pub submit: Canned,
    pub progress: Vec<Canned>,
    pub download: Canned,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path plus query, as sent on the request line.
    pub target: String,
    pub authorization: Option<String>,
    pub accept: Option<String>,
    pub body: Vec<u8>,
}

struct State {
    script: Script,
    next_progress: usize,
    requests: Vec<RecordedRequest>,
}

pub struct ExportServer {
    pub base_url: String,
    state: Arc<Mutex<State>>,
}

impl ExportServer {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Number of recorded requests whose target starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.target.starts_with(prefix))
            .count()
    }
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start(script: Script) -> ExportServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(Mutex::new(State {
        script,
        next_progress: 0,
        requests: Vec::new(),
    }));
    let server_state = Arc::clone(&state);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let state = Arc::clone(&server_state);
            thread::spawn(move || handle(stream, &state));
        }
    });
    ExportServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        state,
    }
}

/// Returns a base URL that accepts connections and reads requests but never
/// answers them.
pub fn silent_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || drain_until_closed(stream));
        }
    });
    format!("http://127.0.0.1:{}/", port)
}

/// Returns a base URL on which nothing is listening.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}

fn handle(mut stream: TcpStream, state: &Mutex<State>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(request) = read_request(&mut stream) else {
        return;
    };

    let response = {
        let mut st = state.lock().unwrap();
        let canned = route(&mut st, &request);
        st.requests.push(request);
        canned
    };

    let announced = if response.stall {
        response.body.len() + (1 << 20)
    } else {
        response.body.len()
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        reason(response.status),
        response.content_type,
        announced
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&response.body);
    let _ = stream.flush();
    if response.stall {
        drain_until_closed(stream);
    }
}

/// Block reading until the peer closes the connection.
fn drain_until_closed(mut stream: TcpStream) {
    let _ = stream.set_read_timeout(None);
    let mut buf = [0u8; 1024];
    while let Ok(n) = stream.read(&mut buf) {
        if n == 0 {
            break;
        }
    }
}

fn route(st: &mut State, request: &RecordedRequest) -> Canned {
    if request.target.starts_with(RUN_BACKUP_PATH) && request.method == "POST" {
        return st.script.submit.clone();
    }
    if request.target.starts_with(PROGRESS_PATH) {
        let progress = &st.script.progress;
        if progress.is_empty() {
            return Canned::json(404, "{}");
        }
        let idx = st.next_progress.min(progress.len() - 1);
        st.next_progress += 1;
        return progress[idx].clone();
    }
    if request.target.starts_with(DOWNLOAD_PREFIX) {
        return st.script.download.clone();
    }
    Canned::html(404, "<html>Not Found</html>")
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = find_header_end(&data) {
            break pos;
        }
    };
    let head = std::str::from_utf8(&data[..header_end]).ok()?.to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let mut authorization = None;
    let mut accept = None;
    let mut content_length = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            if name.eq_ignore_ascii_case("authorization") {
                authorization = Some(value.trim().to_string());
            }
            if name.eq_ignore_ascii_case("accept") {
                accept = Some(value.trim().to_string());
            }
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = data[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }

    Some(RecordedRequest {
        method,
        target,
        authorization,
        accept,
        body,
    })
}

fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}
