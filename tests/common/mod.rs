//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use keyrelay::injector::MemoryInjector;
use keyrelay::protocol::{Reply, Session};
use keyrelay::rules::{parse_rules, RuleEngine};
use keyrelay::server::{RelayServer, ShutdownHandle, DEFAULT_WORKERS};

/// Build an engine from rules-file text, panicking on any bad line
pub fn rules(text: &str) -> RuleEngine {
    let parsed = parse_rules(text);
    assert!(parsed.errors.is_empty(), "bad test rules: {:?}", parsed.errors);
    parsed.engine
}

/// A session backed by an in-memory injector, plus a handle to inspect it
pub fn memory_session(rules_text: &str) -> (Arc<Session>, MemoryInjector) {
    let injector = MemoryInjector::new();
    let session = Session::new(rules(rules_text), Box::new(injector.clone()));
    (Arc::new(session), injector)
}

/// A relay server on a free localhost port, stopped on drop
pub struct TestServer {
    pub addr: SocketAddr,
    pub injector: MemoryInjector,
    pub session: Arc<Session>,
    shutdown: ShutdownHandle,
    join: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn start(rules_text: &str) -> Self {
        Self::start_with_workers(rules_text, DEFAULT_WORKERS)
    }

    pub fn start_with_workers(rules_text: &str, workers: usize) -> Self {
        let (session, injector) = memory_session(rules_text);
        let bind: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = RelayServer::bind(bind, Arc::clone(&session))
            .expect("bind test server")
            .with_workers(workers);
        let addr = server.local_addr().expect("server has an IP address");
        let (shutdown, join) = server.spawn();

        Self {
            addr,
            injector,
            session,
            shutdown,
            join: Some(join),
        }
    }

    pub fn get(&self, path: &str) -> HttpReply {
        request(self.addr, "GET", path, None)
    }

    pub fn post(&self, path: &str, body: Option<&str>) -> HttpReply {
        request(self.addr, "POST", path, body)
    }

    /// POST and decode the JSON reply
    pub fn post_json(&self, path: &str, body: Option<&str>) -> (u16, Reply) {
        let reply = self.post(path, body);
        (reply.status, reply.json())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.shutdown();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// A parsed HTTP response
#[derive(Debug)]
pub struct HttpReply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpReply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> Reply {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|e| panic!("invalid JSON reply {:?}: {}", self.body, e))
    }
}

/// Send one raw HTTP/1.1 request and read the whole response
pub fn request(addr: SocketAddr, method: &str, path: &str, body: Option<&str>) -> HttpReply {
    let mut stream =
        TcpStream::connect_timeout(&addr, Duration::from_secs(2)).expect("connect to test server");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    let body = body.unwrap_or("");
    let raw = format!(
        "{method} {path} HTTP/1.1\r\n\
         Host: {addr}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(raw.as_bytes()).unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();
    parse_response(&String::from_utf8_lossy(&response))
}

fn parse_response(raw: &str) -> HttpReply {
    let (head, body) = raw.split_once("\r\n\r\n").expect("response has a header block");
    let mut lines = head.lines();
    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .expect("response has a status line");
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    HttpReply {
        status,
        headers,
        body: body.to_string(),
    }
}
