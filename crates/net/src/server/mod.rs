//! Event driven servers.
//!
//! [`TcpServer`] runs a worker pool and turns every connection into a sequence of
//! [`ConnectionAccepted`], [`DataReceived`] and [`DataSent`] events. Handlers decide
//! what happens next by setting the context's [`Operation`].
//!
//! [`HttpServer`] installs handlers for those events that assemble requests, fire
//! [`HttpRequestReceived`] and write the response back.

mod config;
mod context;
mod error;
mod events;
mod http_server;
mod tcp_server;

pub use config::{DEFAULT_BUFFER_SIZE, HttpConfig, ServerConfig};
pub use context::{BufferChoice, ConnectionContext, Operation};
pub use error::ServerError;
pub use events::{ConnectionAccepted, DataReceived, DataSent};
pub use http_server::{HttpRequestReceived, HttpServer};
pub use tcp_server::TcpServer;
