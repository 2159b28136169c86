#![allow(dead_code)]
//! Minimal HTTP/1.1 server for exercising the client over a real socket.
//!
//! Every connection gets the same canned response. The server counts
//! accepted connections and records each request it reads.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// How the response body is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `Content-Length` header.
    Length,
    /// No length; the body ends when the server closes the socket.
    Close,
}

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    content_type: &'static str,
    parts: Vec<Vec<u8>>,
    framing: Framing,
    declared_length: Option<usize>,
    pause: Duration,
    stall: Duration,
}

impl MockResponse {
    pub fn json(status: u16, body: &Value) -> Self {
        Self::text(status, "application/json", &body.to_string())
    }

    pub fn text(status: u16, content_type: &'static str, body: &str) -> Self {
        Self::bytes(status, content_type, body.as_bytes().to_vec())
    }

    pub fn bytes(status: u16, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            parts: vec![body],
            framing: Framing::Length,
            declared_length: None,
            pause: Duration::ZERO,
            stall: Duration::ZERO,
        }
    }

    /// An event stream written one line per socket write.
    pub fn event_stream(lines: &[&str]) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream",
            parts: lines
                .iter()
                .map(|line| format!("{line}\n").into_bytes())
                .collect(),
            framing: Framing::Close,
            declared_length: None,
            pause: Duration::from_millis(5),
            stall: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Announce `len` bytes in `Content-Length` whatever the body size, so
    /// the connection drops before the body is complete.
    #[must_use]
    pub const fn declared_length(mut self, len: usize) -> Self {
        self.framing = Framing::Length;
        self.declared_length = Some(len);
        self
    }

    /// Keep the connection open for `stall` after the last part.
    #[must_use]
    pub const fn stall(mut self, stall: Duration) -> Self {
        self.stall = stall;
        self
    }

    fn head(&self) -> String {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nConnection: close\r\n",
            self.status,
            reason(self.status),
            self.content_type
        );
        if self.framing == Framing::Length {
            let len = self
                .declared_length
                .unwrap_or_else(|| self.parts.iter().map(Vec::len).sum());
            head.push_str(&format!("Content-Length: {len}\r\n"));
        }
        head.push_str("\r\n");
        head
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Unknown",
    }
}

/// A request as seen by the server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }
}

#[derive(Debug)]
pub struct MockServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(response: MockResponse) -> Self {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let task = {
            let hits = Arc::clone(&hits);
            let requests = Arc::clone(&requests);
            tokio::spawn(async move {
                while let Ok((socket, _)) = listener.accept().await {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let response = response.clone();
                    let requests = Arc::clone(&requests);
                    tokio::spawn(async move {
                        let _ = serve(socket, &response, &requests).await;
                    });
                }
            })
        };

        Self {
            addr,
            hits,
            requests,
            task,
        }
    }

    /// Base URL to hand to the client.
    pub fn url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    /// Connections accepted so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("at least one request")
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut socket: TcpStream,
    response: &MockResponse,
    requests: &Mutex<Vec<RecordedRequest>>,
) -> std::io::Result<()> {
    let request = read_request(&mut socket).await?;
    requests.lock().expect("requests lock").push(request);

    socket.write_all(response.head().as_bytes()).await?;
    for part in &response.parts {
        socket.write_all(part).await?;
        socket.flush().await?;
        if !response.pause.is_zero() {
            tokio::time::sleep(response.pause).await;
        }
    }
    if !response.stall.is_zero() {
        tokio::time::sleep(response.stall).await;
    }
    socket.shutdown().await
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 4096];

    let head_len = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_len]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(": "))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_len + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let end = buf.len().min(head_len + content_length);
    Ok(RecordedRequest {
        method,
        path,
        headers,
        body: buf[head_len..end].to_vec(),
    })
}
