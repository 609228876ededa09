//! An event driven TCP server core with a small HTTP/1.x client and server on top.
//!
//! # Architecture
//!
//! - [`event`]: type-keyed handler registry every server dispatches through
//! - [`server`]: [`TcpServer`](server::TcpServer) drives each connection as a chain of
//!   read and write operations, firing an event after each one;
//!   [`HttpServer`](server::HttpServer) turns those events into request/response exchanges
//! - [`protocol`]: request and status lines, the two-tier header map, cookies and
//!   whole-message parsing and serialization
//! - [`codec`]: streaming decoders for response heads and content-length, chunked
//!   and close-delimited bodies
//! - [`client`]: sessions with keep-alive reuse, redirect following and streamed bodies
//!
//! # Example
//!
//! ```no_run
//! use micro_net::server::{HttpConfig, HttpRequestReceived, HttpServer, ServerConfig};
//!
//! let mut server = HttpServer::new(ServerConfig::default().with_worker_threads(4), HttpConfig::default());
//! server
//!     .on_request(|e: &mut HttpRequestReceived| {
//!         let greeting = format!("hello {}\r\n", e.request().uri());
//!         e.response_mut().set_body(greeting);
//!     })
//!     .unwrap();
//! server.start().unwrap();
//! ```
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - no TLS; `https` targets need a caller-supplied [`client::Connector`]
//! - header names are classified exact-case: `content-type` is not the well-known
//!   `Content-Type` header and is kept as an unknown header

pub mod client;
pub mod codec;
pub mod event;
pub mod protocol;
pub mod server;

mod utils;
pub(crate) use utils::ensure;
