use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::ensure;
use crate::server::ServerError;

/// Capacity of the primary buffer every connection starts with.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Settings of a [`TcpServer`](super::TcpServer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    listen_addr: SocketAddr,
    worker_threads: usize,
    buffer_size: usize,
    shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            worker_threads: 1,
            buffer_size: DEFAULT_BUFFER_SIZE,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self { listen_addr, ..Self::default() }
    }

    pub fn with_listen_addr(mut self, listen_addr: SocketAddr) -> Self {
        self.listen_addr = listen_addr;
        self
    }

    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        ensure!(self.worker_threads >= 1, ServerError::invalid_config("worker_threads must be at least 1"));
        ensure!(self.buffer_size >= 1, ServerError::invalid_config("buffer_size must be at least 1"));
        Ok(())
    }
}

/// Settings of an [`HttpServer`](super::HttpServer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    keep_alive: bool,
    max_request_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { keep_alive: true, max_request_size: 1024 * 1024 }
    }
}

impl HttpConfig {
    /// When disabled every connection is closed after its first response,
    /// whatever the request asked for.
    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Requests that grow past this many bytes are answered with `413` and the connection is closed.
    pub fn with_max_request_size(mut self, max_request_size: usize) -> Self {
        self.max_request_size = max_request_size;
        self
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn max_request_size(&self) -> usize {
        self.max_request_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.worker_threads(), 1);
        assert_eq!(config.buffer_size(), 4096);
        assert!(config.validate().is_ok());

        let http = HttpConfig::default();
        assert!(http.keep_alive());
        assert_eq!(http.max_request_size(), 1 << 20);
    }

    #[test]
    fn test_validate() {
        let config = ServerConfig::default().with_worker_threads(0);
        assert!(matches!(config.validate(), Err(ServerError::InvalidConfig { .. })));

        let config = ServerConfig::default().with_buffer_size(0);
        assert!(matches!(config.validate(), Err(ServerError::InvalidConfig { .. })));
    }
}
