//! LAN HTTP endpoint for the phone client
//!
//! Serves the client page at `/` and maps the JSON routes onto a [`Session`].
//! A fixed pool of workers shares the listener's `recv`; ordering between
//! requests is the session's job.

use std::io::{Cursor, Read};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use tiny_http::{Header, Method, Request, Response, Server};

use crate::protocol::{
    Action, MoveCursorRequest, ProtocolError, Reply, SendTextRequest, Session,
};

/// Largest request body we read
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Worker threads serving requests
pub const DEFAULT_WORKERS: usize = 4;

const INDEX_HTML: &str = include_str!("index.html");

type HttpResponse = Response<Cursor<Vec<u8>>>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: SocketAddr, reason: String },
}

/// Known request paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Index,
    Send,
    SendEnter,
    MoveCursor,
    Undo,
}

impl Route {
    fn from_path(path: &str) -> Option<Self> {
        match path {
            "/" | "/index.html" => Some(Route::Index),
            "/send" => Some(Route::Send),
            "/send_enter" => Some(Route::SendEnter),
            "/move_cursor" => Some(Route::MoveCursor),
            "/undo" => Some(Route::Undo),
            _ => None,
        }
    }

    fn accepts(self, method: &Method) -> bool {
        match self {
            Route::Index => matches!(method, Method::Get | Method::Head),
            _ => *method == Method::Post,
        }
    }
}

/// Handle for stopping a running server from another thread
#[derive(Clone)]
pub struct ShutdownHandle {
    http: Arc<Server>,
    workers: usize,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        // Each unblock releases a single waiting `recv`
        for _ in 0..self.workers {
            self.http.unblock();
        }
    }
}

pub struct RelayServer {
    http: Arc<Server>,
    session: Arc<Session>,
    workers: usize,
}

impl RelayServer {
    /// Bind to `addr`. Port 0 picks a free port; see [`RelayServer::local_addr`].
    pub fn bind(addr: SocketAddr, session: Arc<Session>) -> Result<Self, ServerError> {
        let http = Server::http(addr).map_err(|e| ServerError::Bind {
            addr,
            reason: e.to_string(),
        })?;
        Ok(Self {
            http: Arc::new(http),
            session,
            workers: DEFAULT_WORKERS,
        })
    }

    /// Serve with `workers` threads instead of [`DEFAULT_WORKERS`] (at least one)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.http.server_addr().to_ip()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            http: Arc::clone(&self.http),
            workers: self.workers,
        }
    }

    /// Serve until [`ShutdownHandle::shutdown`] is called
    pub fn run(&self) {
        tracing::debug!("Serving with {} worker(s)", self.workers);
        thread::scope(|scope| {
            for _ in 0..self.workers {
                scope.spawn(|| self.serve());
            }
        });
        tracing::info!("Server stopped");
    }

    /// One worker: take requests until the listener is unblocked
    fn serve(&self) {
        loop {
            match self.http.recv() {
                Ok(request) => handle_request(&self.session, request),
                Err(e) => {
                    tracing::debug!("Worker exiting: {}", e);
                    break;
                }
            }
        }
    }

    /// Serve on a background thread
    pub fn spawn(self) -> (ShutdownHandle, thread::JoinHandle<()>) {
        let handle = self.shutdown_handle();
        let join = thread::spawn(move || self.run());
        (handle, join)
    }
}

fn handle_request(session: &Session, mut request: Request) {
    let method = request.method().clone();
    let path = request
        .url()
        .split('?')
        .next()
        .unwrap_or("/")
        .to_string();

    let response = respond_to(session, &method, &path, &mut request);
    if let Err(e) = request.respond(response) {
        tracing::warn!("Failed to send response for {} {}: {}", method, path, e);
    }
}

fn respond_to(
    session: &Session,
    method: &Method,
    path: &str,
    request: &mut Request,
) -> HttpResponse {
    let Some(route) = Route::from_path(path) else {
        tracing::debug!("{} {} -> 404", method, path);
        return json_response(404, &Reply::failed("not found"));
    };

    if !route.accepts(method) {
        tracing::debug!("{} {} -> 405", method, path);
        return json_response(405, &Reply::failed("method not allowed"));
    }

    let action = match route {
        Route::Index => return html_response(INDEX_HTML),
        Route::Send => match read_json::<SendTextRequest>(request) {
            Ok(body) => Action::SendText(body.text),
            Err((status, reply)) => return json_response(status, &reply),
        },
        Route::SendEnter => Action::SendEnter,
        Route::MoveCursor => match read_json::<MoveCursorRequest>(request) {
            Ok(body) => Action::MoveCursor(body.direction_str().to_string()),
            Err((status, reply)) => return json_response(status, &reply),
        },
        Route::Undo => Action::Undo,
    };

    match session.handle(action) {
        Ok(reply) => json_response(200, &reply),
        // Undo with nothing to undo is an expected answer, not a server fault
        Err(e @ ProtocolError::NoHistory) => json_response(200, &e.to_reply()),
        Err(e @ ProtocolError::Injector(_)) => json_response(500, &e.to_reply()),
    }
}

/// Parse the body as JSON. An empty body counts as `{}`.
///
/// Fails with 413 above [`MAX_BODY_BYTES`] and 400 on malformed JSON.
fn read_json<T>(request: &mut Request) -> Result<T, (u16, Reply)>
where
    T: serde::de::DeserializeOwned + Default,
{
    if request
        .body_length()
        .is_some_and(|len| len as u64 > MAX_BODY_BYTES)
    {
        return Err((413, Reply::failed("request body too large")));
    }

    let mut body = Vec::new();
    request
        .as_reader()
        .take(MAX_BODY_BYTES + 1)
        .read_to_end(&mut body)
        .map_err(|e| (400, Reply::failed(format!("failed to read request body: {e}"))))?;

    // Chunked bodies carry no length up front
    if body.len() as u64 > MAX_BODY_BYTES {
        return Err((413, Reply::failed("request body too large")));
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(&body)
        .map_err(|e| (400, Reply::failed(format!("invalid JSON body: {e}"))))
}

fn with_content_type(response: HttpResponse, value: &str) -> HttpResponse {
    match Header::from_bytes(&b"Content-Type"[..], value.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

fn json_response(status: u16, reply: &Reply) -> HttpResponse {
    with_content_type(
        Response::from_string(reply.to_json()).with_status_code(status),
        "application/json",
    )
}

fn html_response(body: &str) -> HttpResponse {
    with_content_type(Response::from_string(body), "text/html; charset=utf-8")
}
