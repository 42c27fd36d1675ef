//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves static bodies by path. Honors `Range: bytes=X-` with 206 Partial
//! Content unless ranges are disabled; unknown paths get 404.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

pub struct MediaServer {
    pub base_url: String,
    range_requests: Arc<AtomicUsize>,
}

impl MediaServer {
    /// Start serving `files` (path without leading slash -> body).
    pub fn start(files: Vec<(&str, Vec<u8>)>, support_ranges: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let files: Arc<HashMap<String, Vec<u8>>> = Arc::new(
            files
                .into_iter()
                .map(|(path, body)| (path.to_string(), body))
                .collect(),
        );
        let range_requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&range_requests);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let files = Arc::clone(&files);
                let counter = Arc::clone(&counter);
                thread::spawn(move || handle(stream, &files, support_ranges, &counter));
            }
        });
        Self {
            base_url: format!("http://127.0.0.1:{}/", port),
            range_requests,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET requests that carried a Range header.
    pub fn range_requests(&self) -> usize {
        self.range_requests.load(Ordering::SeqCst)
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    files: &HashMap<String, Vec<u8>>,
    support_ranges: bool,
    range_requests: &AtomicUsize,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let (path, range_start) = parse_request(request);
    let Some(body) = files.get(path.trim_start_matches('/')) else {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\n\r\nnot found");
        return;
    };
    if range_start.is_some() {
        range_requests.fetch_add(1, Ordering::SeqCst);
    }

    let total = body.len() as u64;
    let (status, content_range, slice) = match range_start.filter(|_| support_ranges) {
        Some(start) if start >= total => {
            ("416 Range Not Satisfiable", format!("bytes */{}", total), &body[0..0])
        }
        Some(start) => (
            "206 Partial Content",
            format!("bytes {}-{}/{}", start, total - 1, total),
            &body[start as usize..],
        ),
        None => (
            "200 OK",
            format!("bytes 0-{}/{}", total.saturating_sub(1), total),
            &body[..],
        ),
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Range: {}\r\n\r\n",
        status,
        slice.len(),
        content_range
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(slice);
}

/// Returns (path, optional range start for `Range: bytes=X-`).
fn parse_request(request: &str) -> (&str, Option<u64>) {
    let mut lines = request.lines();
    let path = lines
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/");
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                range = value
                    .trim()
                    .strip_prefix("bytes=")
                    .and_then(|v| v.split('-').next())
                    .and_then(|s| s.trim().parse().ok());
            }
        }
    }
    (path, range)
}
