//! HTTP/1.x server on top of [`TcpServer`].
//!
//! Reads accumulate until a whole request is buffered, then a [`HttpRequestReceived`]
//! event hands the request and a `200 OK` response to the user's handler. Whatever the
//! handler leaves in the response is framed with `Content-Length` and written back.
//! Afterwards the connection waits for the next request or closes:
//!
//! - closed when keep-alive is disabled in [`HttpConfig`] or the handler asked for it
//! - otherwise a `Connection: keep-alive` or `Connection: close` request header decides
//! - otherwise HTTP/1.0 closes and HTTP/1.1 keeps the connection
//!
//! Pipelining is not supported: when more bytes follow a complete request, that request
//! is answered and the connection closed.
//!
//! Unparsable requests get `400`, heads over 64 KiB get `431` and requests growing past
//! the configured maximum get `413`; the connection is closed in each case.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use http::{Method, StatusCode, Version};
use tracing::{debug, error, warn};

use crate::event::{Event, EventKind};
use crate::protocol::{HeaderFieldName, HttpRequest, HttpResponse, ParseError};
use crate::server::{DataReceived, DataSent, HttpConfig, Operation, ServerConfig, ServerError, TcpServer};

const SIGNAL_KEEP_ALIVE: u64 = 0;
const SIGNAL_CLOSE: u64 = 1;

/// A complete request arrived.
#[derive(Debug)]
pub struct HttpRequestReceived {
    request: HttpRequest,
    response: HttpResponse,
    peer_addr: SocketAddr,
    close: bool,
}

impl HttpRequestReceived {
    fn new(request: HttpRequest, peer_addr: SocketAddr) -> Self {
        Self { request, response: HttpResponse::new(StatusCode::OK), peer_addr, close: false }
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut HttpResponse {
        &mut self.response
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Closes the connection once the response is written.
    pub fn close(&mut self) {
        self.close = true;
    }

    pub fn is_close_requested(&self) -> bool {
        self.close
    }
}

impl Event for HttpRequestReceived {
    const KIND: EventKind = EventKind::HTTP_REQUEST_RECEIVED;
}

#[derive(Debug)]
pub struct HttpServer {
    tcp: TcpServer,
}

impl HttpServer {
    pub fn new(server_config: ServerConfig, http_config: HttpConfig) -> Self {
        let config = Arc::new(http_config);
        let tcp = TcpServer::new(server_config)
            .with_handler(move |e: &mut DataReceived| on_data_received(e, &config))
            .with_handler(|e: &mut DataSent| on_data_sent(e))
            .with_handler(|_: &mut HttpRequestReceived| {});
        Self { tcp }
    }

    /// Installs the request handler, replacing the previous one.
    pub fn on_request<F>(&mut self, handler: F) -> Result<&mut Self, ServerError>
    where
        F: Fn(&mut HttpRequestReceived) + Send + Sync + 'static,
    {
        self.tcp.register(handler)?;
        Ok(self)
    }

    pub fn start(&mut self) -> Result<SocketAddr, ServerError> {
        self.tcp.start()
    }

    pub fn stop(&mut self) -> Result<(), ServerError> {
        self.tcp.stop()
    }

    pub fn is_running(&self) -> bool {
        self.tcp.is_running()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.tcp.local_addr()
    }
}

fn on_data_received(e: &mut DataReceived, config: &HttpConfig) {
    let mut src = BytesMut::from(e.content());
    match HttpRequest::decode(&mut src) {
        Ok(Some(request)) => {
            let pipelined = !src.is_empty();
            if pipelined {
                debug!(id = e.id(), bytes = src.len(), "request pipelined after this one, closing after the response");
            }
            respond(e, request, config, pipelined);
        }
        Ok(None) if e.content_size() >= config.max_request_size() => {
            warn!(id = e.id(), size = e.content_size(), limit = config.max_request_size(), "request too large");
            reject(e, StatusCode::PAYLOAD_TOO_LARGE);
        }
        Ok(None) => {
            e.retain_content();
            e.set_next_operation(Operation::Read);
        }
        Err(ParseError::TooLargeHeader { current_size, max_size }) => {
            warn!(id = e.id(), current_size, max_size, "request head too large");
            reject(e, StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE);
        }
        Err(cause) => {
            warn!(id = e.id(), cause = %cause, "bad request");
            reject(e, StatusCode::BAD_REQUEST);
        }
    }
}

fn respond(e: &mut DataReceived, request: HttpRequest, config: &HttpConfig, pipelined: bool) {
    let keep_alive = config.keep_alive() && wants_keep_alive(&request);
    let head_only = *request.method() == Method::HEAD;

    let mut event = HttpRequestReceived::new(request, e.peer_addr());
    if let Err(cause) = e.registry().call(&mut event) {
        error!(id = e.id(), cause = %cause, "failed to dispatch request");
        event.response = HttpResponse::new(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let HttpRequestReceived { mut response, close, .. } = event;
    let close = close || !keep_alive || pipelined;

    let content_length = response.body().len().to_string();
    response.headers_mut().add_common(HeaderFieldName::ContentLength, content_length);
    if close && !response.headers().contains("Connection") {
        response.headers_mut().add_common(HeaderFieldName::Connection, "close");
    }
    if head_only {
        response.body_mut().clear();
    }

    send(e, &response, close);
}

fn reject(e: &mut DataReceived, status: StatusCode) {
    let mut response = HttpResponse::new(status);
    response.headers_mut().add_common(HeaderFieldName::ContentLength, "0");
    response.headers_mut().add_common(HeaderFieldName::Connection, "close");
    send(e, &response, true);
}

fn send(e: &mut DataReceived, response: &HttpResponse, close: bool) {
    e.set_content(&response.to_bytes());
    e.set_signal(if close { SIGNAL_CLOSE } else { SIGNAL_KEEP_ALIVE });
    e.set_next_operation(Operation::Write);
}

fn on_data_sent(e: &mut DataSent) {
    e.restore_primary();
    if e.signal() == SIGNAL_CLOSE {
        e.set_next_operation(Operation::Close);
    } else {
        e.set_next_operation(Operation::Read);
    }
}

/// What the request asks for, from its `Connection` header or else its version.
fn wants_keep_alive(request: &HttpRequest) -> bool {
    match request.headers().get(HeaderFieldName::Connection) {
        Some(value) if value.eq_ignore_ascii_case("keep-alive") => true,
        Some(value) if value.eq_ignore_ascii_case("close") => false,
        _ => request.version() != Version::HTTP_10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{Ipv4Addr, TcpStream};
    use std::time::Duration;

    fn start(http_config: HttpConfig, workers: usize) -> (HttpServer, SocketAddr) {
        let server_config = ServerConfig::new(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .with_worker_threads(workers)
            .with_shutdown_timeout(Duration::from_secs(1));
        let mut server = HttpServer::new(server_config, http_config);
        server
            .on_request(|e: &mut HttpRequestReceived| {
                let reply = format!("{} {} {}", e.request().method(), e.request().uri(), e.request().body().len());
                e.response_mut().add_header("Content-Type", "text/plain");
                e.response_mut().set_body(reply);
                if e.request().uri() == "/bye" {
                    e.close();
                }
            })
            .unwrap();
        let addr = server.start().unwrap();
        (server, addr)
    }

    /// Reads one response framed by `Content-Length`.
    fn read_response(stream: &mut TcpStream) -> HttpResponse {
        let mut raw = Vec::new();
        let mut byte = [0; 1];
        while !raw.ends_with(b"\r\n\r\n") {
            stream.read_exact(&mut byte).unwrap();
            raw.push(byte[0]);
        }
        let mut response = HttpResponse::parse(&raw).unwrap();
        let len: usize = response.header(HeaderFieldName::ContentLength).unwrap().parse().unwrap();
        let mut body = vec![0; len];
        stream.read_exact(&mut body).unwrap();
        response.set_body(body);
        response
    }

    fn assert_closed(stream: &mut TcpStream) {
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).unwrap();
        assert!(rest.is_empty());
    }

    #[test]
    fn test_keep_alive_http11() {
        let (_server, addr) = start(HttpConfig::default(), 2);
        let mut stream = TcpStream::connect(addr).unwrap();

        for path in ["/first", "/second"] {
            write!(stream, "GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
            let response = read_response(&mut stream);
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.body(), format!("GET {path} 0").as_bytes());
            assert_eq!(response.headers().find("Content-Type"), Some("text/plain"));
        }
    }

    #[test]
    fn test_http10_closes_by_default() {
        let (_server, addr) = start(HttpConfig::default(), 1);
        let mut stream = TcpStream::connect(addr).unwrap();

        stream.write_all(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        let response = read_response(&mut stream);
        assert_eq!(response.header(HeaderFieldName::Connection), Some("close"));
        assert_closed(&mut stream);
    }

    #[test]
    fn test_http10_keep_alive_header() {
        let (_server, addr) = start(HttpConfig::default(), 1);
        let mut stream = TcpStream::connect(addr).unwrap();

        for _ in 0..2 {
            stream.write_all(b"GET / HTTP/1.0\r\nConnection: Keep-Alive\r\n\r\n").unwrap();
            assert_eq!(read_response(&mut stream).status(), StatusCode::OK);
        }
    }

    #[test]
    fn test_connection_close_and_handler_close() {
        let (_server, addr) = start(HttpConfig::default(), 1);

        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n").unwrap();
        read_response(&mut stream);
        assert_closed(&mut stream);

        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"GET /bye HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(read_response(&mut stream).body(), b"GET /bye 0");
        assert_closed(&mut stream);
    }

    #[test]
    fn test_keep_alive_disabled() {
        let (_server, addr) = start(HttpConfig::default().with_keep_alive(false), 1);
        let mut stream = TcpStream::connect(addr).unwrap();

        stream.write_all(b"GET / HTTP/1.1\r\nConnection: keep-alive\r\n\r\n").unwrap();
        read_response(&mut stream);
        assert_closed(&mut stream);
    }

    #[test]
    fn test_body_split_across_reads() {
        let (_server, addr) = start(HttpConfig::default(), 1);
        let mut stream = TcpStream::connect(addr).unwrap();

        let body = "x".repeat(10_000);
        write!(stream, "POST /upload HTTP/1.1\r\nContent-Length: {}\r\n\r\n", body.len()).unwrap();
        stream.write_all(body.as_bytes()).unwrap();

        let response = read_response(&mut stream);
        assert_eq!(response.body(), b"POST /upload 10000");
    }

    #[test]
    fn test_response_larger_than_primary_buffer() {
        let server_config = ServerConfig::new(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)));
        let mut server = HttpServer::new(server_config, HttpConfig::default());
        server
            .on_request(|e: &mut HttpRequestReceived| {
                let fill = if e.request().uri() == "/a" { "a" } else { "b" };
                e.response_mut().set_body(fill.repeat(10_000));
            })
            .unwrap();
        let addr = server.start().unwrap();
        let mut stream = TcpStream::connect(addr).unwrap();

        for path in ["a", "b"] {
            write!(stream, "GET /{path} HTTP/1.1\r\n\r\n").unwrap();
            let response = read_response(&mut stream);
            assert_eq!(response.body(), path.repeat(10_000).as_bytes());
        }

        stream.write_all(b"GET /a HTTP/1.1\r\nConnection: close\r\n\r\n").unwrap();
        assert_eq!(read_response(&mut stream).body().len(), 10_000);
        assert_closed(&mut stream);
    }

    #[test]
    fn test_pipelined_request_closes() {
        let (_server, addr) = start(HttpConfig::default(), 1);
        let mut stream = TcpStream::connect(addr).unwrap();

        stream.write_all(b"GET /one HTTP/1.1\r\n\r\nGET /two HTTP/1.1\r\n\r\n").unwrap();
        let response = read_response(&mut stream);
        assert_eq!(response.body(), b"GET /one 0");
        assert_eq!(response.header(HeaderFieldName::Connection), Some("close"));
        assert_closed(&mut stream);
    }

    #[tokio::test]
    async fn test_drop_inside_async_context() {
        let server_config = ServerConfig::new(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)));
        let mut server = HttpServer::new(server_config, HttpConfig::default());
        server.start().unwrap();
        assert!(server.is_running());
        drop(server);
    }

    #[test]
    fn test_chunked_request() {
        let (_server, addr) = start(HttpConfig::default(), 1);
        let mut stream = TcpStream::connect(addr).unwrap();

        stream
            .write_all(b"POST /c HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n")
            .unwrap();
        assert_eq!(read_response(&mut stream).body(), b"POST /c 9");
    }

    #[test]
    fn test_head_request_has_no_body() {
        let (_server, addr) = start(HttpConfig::default(), 1);
        let mut stream = TcpStream::connect(addr).unwrap();

        stream.write_all(b"HEAD /h HTTP/1.1\r\nConnection: close\r\n\r\n").unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).unwrap();
        let response = HttpResponse::parse(&raw).unwrap();
        assert_eq!(response.header(HeaderFieldName::ContentLength), Some("9"));
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_bad_request() {
        let (_server, addr) = start(HttpConfig::default(), 1);
        let mut stream = TcpStream::connect(addr).unwrap();

        stream.write_all(b"NOT A REQUEST\r\n\r\n").unwrap();
        assert_eq!(read_response(&mut stream).status(), StatusCode::BAD_REQUEST);
        assert_closed(&mut stream);
    }

    #[test]
    fn test_request_too_large() {
        let (_server, addr) = start(HttpConfig::default().with_max_request_size(32), 1);
        let mut stream = TcpStream::connect(addr).unwrap();

        stream.write_all(b"POST / HTTP/1.1\r\nContent-Length: 4096\r\n\r\naaaa").unwrap();
        assert_eq!(read_response(&mut stream).status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_cookies_round_trip() {
        let server_config = ServerConfig::new(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)));
        let mut server = HttpServer::new(server_config, HttpConfig::default());
        server
            .on_request(|e: &mut HttpRequestReceived| {
                let seen = e.request().cookies().get("session").map(|c| c.value().to_owned()).unwrap_or_default();
                e.response_mut().cookies_mut().add(crate::protocol::Cookie::new("seen", seen).with_path("/"));
                e.close();
            })
            .unwrap();
        let addr = server.start().unwrap();

        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"GET / HTTP/1.1\r\nCookie: session=abc; theme=dark\r\n\r\n").unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).unwrap();

        let response = HttpResponse::parse(&raw).unwrap();
        let cookie = response.cookies().get("seen").unwrap();
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_register_after_start() {
        let (mut server, _addr) = start(HttpConfig::default(), 1);
        assert!(matches!(server.on_request(|_| {}), Err(ServerError::AlreadyStarted)));
        server.stop().unwrap();
    }

    #[test]
    fn test_wants_keep_alive() {
        let request = HttpRequest::parse(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        assert!(wants_keep_alive(&request));

        let request = HttpRequest::parse(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        assert!(!wants_keep_alive(&request));

        // exact-case lookup: a lowercase header name is not the well-known Connection header
        let request = HttpRequest::parse(b"GET / HTTP/1.0\r\nconnection: keep-alive\r\n\r\n").unwrap();
        assert!(!wants_keep_alive(&request));
    }
}
