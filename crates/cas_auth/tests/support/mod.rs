#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

#[derive(Clone, Debug)]
pub struct ResponseChunk {
    pub delay_ms: u64,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub headers: Vec<(String, String)>,
    pub head_delay_ms: u64,
    pub chunks: Vec<ResponseChunk>,
}

impl Reply {
    pub fn new(status: u16, content_type: &'static str, body: &str) -> Self {
        Self {
            status,
            content_type,
            headers: Vec::new(),
            head_delay_ms: 0,
            chunks: vec![ResponseChunk {
                delay_ms: 0,
                bytes: body.as_bytes().to_vec(),
            }],
        }
    }

    pub fn json(status: u16, body: &str) -> Self {
        Self::new(status, "application/json", body)
    }

    pub fn html(status: u16, body: &str) -> Self {
        Self::new(status, "text/html", body)
    }

    pub fn status(status: u16) -> Self {
        Self::new(status, "text/plain", "")
    }

    /// Event-stream body sent as one chunk per line.
    pub fn stream<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        Self {
            chunks: lines
                .into_iter()
                .map(|line| ResponseChunk {
                    delay_ms: 0,
                    bytes: format!("{}\n", line.as_ref()).into_bytes(),
                })
                .collect(),
            ..Self::new(200, "text/event-stream", "")
        }
    }

    /// Event-stream body from raw chunks, for split-line and stall cases.
    pub fn raw_stream(chunks: Vec<ResponseChunk>) -> Self {
        Self {
            chunks,
            ..Self::new(200, "text/event-stream", "")
        }
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push(("Set-Cookie".to_string(), format!("{name}={value}; Path=/")));
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Holds the status line back for `delay_ms`.
    pub fn delayed(mut self, delay_ms: u64) -> Self {
        self.head_delay_ms = delay_ms;
        self
    }
}

pub fn chunk(delay_ms: u64, text: &str) -> ResponseChunk {
    ResponseChunk {
        delay_ms,
        bytes: text.as_bytes().to_vec(),
    }
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

type Routes = HashMap<(String, String), Vec<Reply>>;

#[derive(Default)]
struct ServerState {
    routes: Routes,
    served: HashMap<(String, String), usize>,
    requests: Vec<RecordedRequest>,
}

/// Local HTTP/1.1 server answering each `(method, path)` from a script.
///
/// Replies for a route are served in order and the last one repeats.
/// Unscripted routes answer 404.
pub struct ScriptedServer {
    pub base_url: String,
    state: Arc<Mutex<ServerState>>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    pub async fn new(routes: Vec<(&str, &str, Vec<Reply>)>) -> Self {
        let routes = routes
            .into_iter()
            .map(|(method, path, replies)| ((method.to_string(), path.to_string()), replies))
            .collect();
        let state = Arc::new(Mutex::new(ServerState {
            routes,
            ..ServerState::default()
        }));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let base_url = format!("http://{addr}/api");

        let handle = tokio::spawn({
            let state = Arc::clone(&state);
            async move {
                loop {
                    let (socket, _) = match listener.accept().await {
                        Ok(pair) => pair,
                        Err(_) => break,
                    };
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        serve_one(socket, state).await;
                    });
                }
            }
        });

        Self {
            base_url,
            state,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().expect("server state").requests.clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }

    pub fn last(&self, method: &str, path: &str) -> Option<RecordedRequest> {
        self.requests()
            .into_iter()
            .rev()
            .find(|request| request.method == method && request.path == path)
    }

    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_one(mut socket: TcpStream, state: Arc<Mutex<ServerState>>) {
    let Ok(Some(request)) = read_request(&mut socket).await else {
        return;
    };

    let reply = {
        let mut state = state.lock().expect("server state");
        let key = (request.method.clone(), request.path.clone());
        state.requests.push(request);
        let index = {
            let served = state.served.entry(key.clone()).or_insert(0);
            let index = *served;
            *served += 1;
            index
        };
        state
            .routes
            .get(&key)
            .and_then(|replies| replies.get(index).or_else(|| replies.last()))
            .cloned()
            .unwrap_or_else(|| Reply::json(404, r#"{"error":"unexpected request"}"#))
    };

    if reply.head_delay_ms > 0 {
        sleep(Duration::from_millis(reply.head_delay_ms)).await;
    }

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n",
        reply.status,
        status_reason(reply.status),
        reply.content_type,
    );
    for (name, value) in &reply.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");

    if socket.write_all(head.as_bytes()).await.is_err() {
        return;
    }

    for chunk in reply.chunks {
        if chunk.delay_ms > 0 {
            sleep(Duration::from_millis(chunk.delay_ms)).await;
        }
        if chunk.bytes.is_empty() {
            continue;
        }
        let prefix = format!("{:X}\r\n", chunk.bytes.len());
        if socket.write_all(prefix.as_bytes()).await.is_err() {
            return;
        }
        if socket.write_all(&chunk.bytes).await.is_err() {
            return;
        }
        if socket.write_all(b"\r\n").await.is_err() {
            return;
        }
    }

    let _ = socket.write_all(b"0\r\n\r\n").await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<Option<RecordedRequest>> {
    let mut raw = Vec::new();
    let mut buffer = [0_u8; 2048];

    let header_end = loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            return Ok(None);
        }
        raw.extend_from_slice(&buffer[..n]);
        if let Some(position) = raw.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default();
    let path = target.split('?').next().unwrap_or_default().to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let content_length = headers
        .get("content-length")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = raw[header_end..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buffer[..n]);
    }

    Ok(Some(RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    }))
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
