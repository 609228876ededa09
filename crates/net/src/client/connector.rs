//! Where a session's connections come from.
//!
//! A [`Connector`] turns a [`Target`] into a connected byte stream. The default
//! [`TcpConnector`] speaks plain TCP only; a secure channel is provided by a
//! caller-supplied connector that wraps its stream after the handshake.

use std::net::IpAddr;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::trace;
use url::{Host, Url};

use crate::client::ClientError;
use crate::ensure;

/// An `http` or `https` URL with a host, the address a session talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    url: Url,
}

impl Target {
    pub fn parse(url: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(url).map_err(|e| ClientError::invalid_url(url, e))?;
        Self::from_url(parsed)
    }

    pub fn from_url(url: Url) -> Result<Self, ClientError> {
        ensure!(matches!(url.scheme(), "http" | "https"), ClientError::invalid_url(&url, "scheme must be http or https"));
        ensure!(url.host_str().is_some_and(|host| !host.is_empty()), ClientError::invalid_url(&url, "missing host"));
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host as written in the URL, IPv6 addresses keep their brackets.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// The host when it is an IP literal rather than a name to resolve.
    pub fn ip(&self) -> Option<IpAddr> {
        match self.url.host()? {
            Host::Ipv4(ip) => Some(IpAddr::V4(ip)),
            Host::Ipv6(ip) => Some(IpAddr::V6(ip)),
            Host::Domain(_) => None,
        }
    }

    pub fn port(&self) -> u16 {
        self.url.port_or_known_default().unwrap_or(80)
    }

    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// Path and query, the URI placed in the request line.
    pub fn request_uri(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{query}", self.url.path()),
            None => self.url.path().to_owned(),
        }
    }

    /// Value of the `Host` header, with the port only when it is not the scheme's default.
    pub fn host_header(&self) -> String {
        match self.url.port() {
            Some(port) => format!("{}:{port}", self.host()),
            None => self.host().to_owned(),
        }
    }

    /// Whether a connection to `self` can be reused for `other`.
    pub fn same_origin(&self, other: &Target) -> bool {
        self.url.scheme() == other.url.scheme() && self.host().eq_ignore_ascii_case(other.host()) && self.port() == other.port()
    }

    /// Resolves `location` against this target, as a redirect's `Location` header is.
    pub fn join(&self, location: &str) -> Result<Target, ClientError> {
        let url = self.url.join(location).map_err(|e| ClientError::invalid_url(location, e))?;
        Self::from_url(url)
    }
}

#[trait_variant::make(Connector: Send)]
pub trait LocalConnector {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    async fn connect(&self, target: &Target) -> Result<Self::Stream, ClientError>;
}

/// Plain TCP connections. `https` targets fail with [`ClientError::Unsupported`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, target: &Target) -> Result<TcpStream, ClientError> {
        ensure!(!target.is_secure(), ClientError::unsupported("https targets need a secure connector"));

        let stream = match target.ip() {
            Some(ip) => TcpStream::connect((ip, target.port())).await?,
            None => TcpStream::connect((target.host(), target.port())).await?,
        };
        stream.set_nodelay(true)?;
        trace!(host = target.host(), port = target.port(), "connected");
        Ok(stream)
    }
}
