//! HTTP surface for the issue service.
//!
//! A deliberately small std-TCP server: one thread per connection, strict
//! HTTP/1.1 request/response with `Connection: close`. Domain refusals
//! render inside 200 responses in the wire shapes existing clients expect;
//! only transport problems and storage faults surface as 4xx/5xx.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use serde_json::{Value, json};
use thiserror::Error;
use tracklet_core::{FilterCriteria, IssueDraft, IssuePatch, timestamp};
use tracklet_store::ProjectStore;

use crate::{IssueError, IssueService};

const MAX_HEAD_BYTES: usize = 16 * 1024;
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub bind: SocketAddr,
}

#[derive(Debug, Error)]
pub enum HttpServeError {
    #[error("bind failed: {0}")]
    Bind(std::io::Error),
    #[error("local address unavailable: {0}")]
    LocalAddr(std::io::Error),
    #[error("accept failed: {0}")]
    Accept(std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HttpResponse {
    status: u16,
    body: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Index,
    Healthz,
    Issues { project: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
enum RequestError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    target: String,
    body: Vec<u8>,
}

/// A bound listener ready to serve the issue API.
pub struct HttpServer<S: ProjectStore> {
    listener: TcpListener,
    service: Arc<IssueService<S>>,
}

impl<S: ProjectStore + 'static> HttpServer<S> {
    /// Bind the configured address without accepting yet.
    pub fn bind(
        config: &HttpServerConfig,
        service: IssueService<S>,
    ) -> Result<Self, HttpServeError> {
        let listener = TcpListener::bind(config.bind).map_err(HttpServeError::Bind)?;
        Ok(Self {
            listener,
            service: Arc::new(service),
        })
    }

    /// The bound address; port 0 in the config resolves here.
    pub fn local_addr(&self) -> Result<SocketAddr, HttpServeError> {
        self.listener.local_addr().map_err(HttpServeError::LocalAddr)
    }

    /// Accept and serve connections until the process exits.
    pub fn serve(self) -> Result<(), HttpServeError> {
        self.run(None)
    }

    /// Serve at most `max_requests` connections, then return once their
    /// handlers finish. Lets a test run a real server to completion on an
    /// ephemeral port.
    pub fn serve_bounded(self, max_requests: usize) -> Result<(), HttpServeError> {
        self.run(Some(max_requests))
    }

    fn run(self, max_requests: Option<usize>) -> Result<(), HttpServeError> {
        let mut served = 0usize;
        let mut workers = Vec::new();

        for stream in self.listener.incoming() {
            match stream {
                Ok(mut stream) => {
                    let service = Arc::clone(&self.service);
                    let worker = thread::spawn(move || handle_connection(&mut stream, &service));
                    if max_requests.is_some() {
                        workers.push(worker);
                    }
                    served += 1;
                }
                Err(err) => return Err(HttpServeError::Accept(err)),
            }
            if let Some(limit) = max_requests
                && served >= limit
            {
                break;
            }
        }

        for worker in workers {
            let _ = worker.join();
        }
        Ok(())
    }
}

fn handle_connection<S: ProjectStore>(stream: &mut TcpStream, service: &IssueService<S>) {
    let response = match read_request(stream) {
        Ok(request) => {
            let response = match execute_request(service, &request) {
                Ok(response) => response,
                Err(err) => request_error_response(err),
            };
            tracing::info!(
                method = %request.method,
                target = %request.target,
                status = response.status,
                "request handled"
            );
            response
        }
        Err(err) => {
            tracing::warn!(error = %err, "unreadable request");
            request_error_response(err)
        }
    };

    if let Err(err) = write_json_response(stream, response) {
        tracing::warn!(error = %err, "failed to write response");
    }
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest, RequestError> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];

    let head_end = loop {
        if let Some(at) = find_head_end(&buffer) {
            break at;
        }
        if buffer.len() > MAX_HEAD_BYTES {
            return Err(RequestError::BadRequest("request head too large".to_string()));
        }
        let n = stream
            .read(&mut chunk)
            .map_err(|e| RequestError::BadRequest(format!("failed to read request: {e}")))?;
        if n == 0 {
            if buffer.is_empty() {
                return Err(RequestError::BadRequest("empty request".to_string()));
            }
            return Err(RequestError::BadRequest("truncated request head".to_string()));
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buffer[..head_end]).into_owned();
    let mut lines = head.lines();
    let request_line = lines
        .next()
        .ok_or_else(|| RequestError::BadRequest("missing request line".to_string()))?;
    let (method, target) = parse_request_line(request_line)?;
    let content_length = parse_content_length(lines)?;
    if content_length > MAX_BODY_BYTES {
        return Err(RequestError::BadRequest("request body too large".to_string()));
    }

    let mut body = buffer[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream
            .read(&mut chunk)
            .map_err(|e| RequestError::BadRequest(format!("failed to read request: {e}")))?;
        if n == 0 {
            return Err(RequestError::BadRequest("truncated request body".to_string()));
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(HttpRequest {
        method,
        target,
        body,
    })
}

fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}

fn parse_request_line(line: &str) -> Result<(String, String), RequestError> {
    let mut parts = line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| RequestError::BadRequest("missing method".to_string()))?;
    let target = parts
        .next()
        .ok_or_else(|| RequestError::BadRequest("missing target".to_string()))?;
    Ok((method.to_string(), target.to_string()))
}

fn parse_content_length<'a>(
    lines: impl Iterator<Item = &'a str>,
) -> Result<usize, RequestError> {
    for line in lines {
        if let Some((name, value)) = line.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
        {
            let value = value.trim();
            return value.parse().map_err(|_| {
                RequestError::BadRequest(format!("invalid content-length: {value}"))
            });
        }
    }
    Ok(0)
}

fn parse_route_target(target: &str) -> Result<(Route, BTreeMap<String, String>), RequestError> {
    let (path, query) = split_target(target);
    let params = parse_query_params(query);

    match path {
        "/" => Ok((Route::Index, params)),
        "/healthz" => Ok((Route::Healthz, params)),
        _ => match path.strip_prefix("/api/issues/") {
            Some(rest) if !rest.is_empty() && !rest.contains('/') => {
                let project = percent_decode(rest);
                Ok((Route::Issues { project }, params))
            }
            _ => Err(RequestError::NotFound(format!("unknown route: {path}"))),
        },
    }
}

fn split_target(target: &str) -> (&str, &str) {
    match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    }
}

fn parse_query_params(query: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (k, v) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        let key = percent_decode(k);
        if key.is_empty() {
            continue;
        }
        out.insert(key, percent_decode(v));
    }
    out
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                if let (Some(h), Some(l)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                    out.push(h * 16 + l);
                    i += 3;
                } else {
                    out.push(b'%');
                    i += 1;
                }
            }
            ch => {
                out.push(ch);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        _ => None,
    }
}

fn execute_request<S: ProjectStore>(
    service: &IssueService<S>,
    request: &HttpRequest,
) -> Result<HttpResponse, RequestError> {
    let (route, params) = parse_route_target(&request.target)?;

    match route {
        Route::Index => {
            require_get(&request.method)?;
            Ok(HttpResponse {
                status: 200,
                body: json!({
                    "service": "tracklet.issues.v1",
                    "routes": [
                        "/healthz",
                        "GET /api/issues/{project}",
                        "POST /api/issues/{project}",
                        "PUT /api/issues/{project}",
                        "DELETE /api/issues/{project}"
                    ]
                }),
            })
        }
        Route::Healthz => {
            require_get(&request.method)?;
            Ok(HttpResponse {
                status: 200,
                body: json!({ "ok": true }),
            })
        }
        Route::Issues { project } => match request.method.as_str() {
            "GET" => Ok(list_response(service, &project, params)),
            "POST" => {
                let draft: IssueDraft = parse_body(&request.body)?;
                Ok(create_response(service, &project, draft))
            }
            "PUT" => {
                let patch: IssuePatch = parse_body(&request.body)?;
                Ok(update_response(service, &project, &patch))
            }
            "DELETE" => {
                let payload: IssuePatch = parse_body(&request.body)?;
                Ok(delete_response(service, &project, &payload))
            }
            other => Err(RequestError::MethodNotAllowed(format!(
                "{other} not supported; use GET, POST, PUT, or DELETE"
            ))),
        },
    }
}

fn require_get(method: &str) -> Result<(), RequestError> {
    if method == "GET" {
        Ok(())
    } else {
        Err(RequestError::MethodNotAllowed(format!(
            "{method} not supported; use GET"
        )))
    }
}

fn parse_body<T: serde::de::DeserializeOwned + Default>(body: &[u8]) -> Result<T, RequestError> {
    // An absent or blank body reads as the empty object, so a bare DELETE
    // reports "missing _id" rather than a parse failure.
    if body.iter().all(|byte| byte.is_ascii_whitespace()) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| RequestError::BadRequest(format!("invalid JSON body: {e}")))
}

fn list_response<S: ProjectStore>(
    service: &IssueService<S>,
    project: &str,
    params: BTreeMap<String, String>,
) -> HttpResponse {
    let criteria = FilterCriteria::from_pairs(params);
    match service.list(project, &criteria) {
        Ok(issues) => match serde_json::to_value(&issues) {
            Ok(body) => HttpResponse { status: 200, body },
            Err(err) => fault_response(&err),
        },
        Err(err) => fault_response(&err),
    }
}

fn create_response<S: ProjectStore>(
    service: &IssueService<S>,
    project: &str,
    draft: IssueDraft,
) -> HttpResponse {
    match service.create(project, draft, timestamp::now_ms()) {
        Ok(issue) => match serde_json::to_value(&issue) {
            Ok(body) => HttpResponse { status: 200, body },
            Err(err) => fault_response(&err),
        },
        Err(IssueError::RequiredFieldsMissing) => HttpResponse {
            status: 200,
            body: json!({ "error": "required field(s) missing" }),
        },
        Err(err) => fault_response(&err),
    }
}

fn update_response<S: ProjectStore>(
    service: &IssueService<S>,
    project: &str,
    patch: &IssuePatch,
) -> HttpResponse {
    match service.update(project, patch, timestamp::now_ms()) {
        Ok(id) => HttpResponse {
            status: 200,
            body: json!({ "result": "successfully updated", "_id": id }),
        },
        Err(IssueError::MissingId) => HttpResponse {
            status: 200,
            body: json!({ "error": "missing _id" }),
        },
        Err(IssueError::NoUpdateFields { id }) => HttpResponse {
            status: 200,
            body: json!({ "error": "no update field(s) sent", "_id": id }),
        },
        Err(IssueError::UpdateNotFound { id }) | Err(IssueError::WriteMissed { id }) => {
            HttpResponse {
                status: 200,
                body: json!({ "error": "could not update", "_id": id }),
            }
        }
        Err(err) => fault_response(&err),
    }
}

fn delete_response<S: ProjectStore>(
    service: &IssueService<S>,
    project: &str,
    payload: &IssuePatch,
) -> HttpResponse {
    match service.delete(project, payload) {
        Ok(id) => HttpResponse {
            status: 200,
            body: json!({ "result": "successfully deleted", "_id": id }),
        },
        Err(IssueError::MissingId) => HttpResponse {
            status: 200,
            body: json!({ "error": "missing _id" }),
        },
        Err(IssueError::DeleteNotFound { id }) => HttpResponse {
            status: 200,
            body: json!({ "error": "could not delete", "_id": id }),
        },
        Err(err) => fault_response(&err),
    }
}

fn fault_response(err: &dyn std::fmt::Display) -> HttpResponse {
    tracing::error!(error = %err, "internal error while handling request");
    HttpResponse {
        status: 500,
        body: json!({ "error": format!("internal server error: {err}") }),
    }
}

fn request_error_response(err: RequestError) -> HttpResponse {
    match err {
        RequestError::BadRequest(msg) => HttpResponse {
            status: 400,
            body: json!({ "error": msg }),
        },
        RequestError::NotFound(msg) => HttpResponse {
            status: 404,
            body: json!({ "error": msg }),
        },
        RequestError::MethodNotAllowed(msg) => HttpResponse {
            status: 405,
            body: json!({ "error": msg }),
        },
    }
}

fn write_json_response(stream: &mut TcpStream, response: HttpResponse) -> std::io::Result<()> {
    let body = serde_json::to_vec_pretty(&response.body)?;
    let status_text = reason_phrase(response.status);
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nAccess-Control-Allow-Origin: *\r\nAccess-Control-Allow-Methods: GET, POST, PUT, DELETE\r\nConnection: close\r\n\r\n",
        response.status,
        status_text,
        body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(&body)?;
    stream.flush()
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
