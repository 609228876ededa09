use std::io;
use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server has already been started")]
    AlreadyStarted,

    #[error("server is not running")]
    NotRunning,

    #[error("invalid server config: {reason}")]
    InvalidConfig { reason: String },

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("failed to build worker runtime: {source}")]
    Runtime { source: io::Error },

    #[error("no extended buffer has been allocated for this connection")]
    NoExtendedBuffer,

    #[error("content size {size} exceeds the buffer capacity {capacity}")]
    ContentOverflow { size: usize, capacity: usize },
}

impl ServerError {
    pub fn invalid_config<S: ToString>(reason: S) -> Self {
        Self::InvalidConfig { reason: reason.to_string() }
    }

    pub fn bind(addr: SocketAddr, source: io::Error) -> Self {
        Self::Bind { addr, source }
    }

    pub fn runtime(source: io::Error) -> Self {
        Self::Runtime { source }
    }
}
