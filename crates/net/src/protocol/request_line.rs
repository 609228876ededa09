use std::fmt;

use bytes::{BufMut, BytesMut};
use http::{Method, Version};

use crate::ensure;
use crate::protocol::ParseError;
use crate::protocol::version::{parse_version, version_str};

/// `METHOD SP URI SP HTTP/VERSION`.
///
/// [`RequestLine::default`] is the empty line of a request that has not been
/// parsed or built yet; [`RequestLine::is_empty`] tells it apart from a real one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestLine {
    method: Method,
    uri: String,
    version: Version,
    present: bool,
}

impl RequestLine {
    pub fn new<U: Into<String>>(method: Method, uri: U, version: Version) -> Self {
        Self { method, uri: uri.into(), version, present: true }
    }

    /// Parses a request line, with or without its trailing CR.
    ///
    /// The method ends at the first space and the version starts after the last one,
    /// so the URI in between may itself contain spaces.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        let (method, rest) =
            line.split_once(' ').ok_or_else(|| ParseError::invalid_request_line(format!("missing uri in {line:?}")))?;
        let (uri, version) =
            rest.rsplit_once(' ').ok_or_else(|| ParseError::invalid_request_line(format!("missing version in {line:?}")))?;
        let uri = uri.trim_matches(' ');
        ensure!(!uri.is_empty(), ParseError::invalid_request_line(format!("empty uri in {line:?}")));

        let method = Method::from_bytes(method.as_bytes()).map_err(ParseError::invalid_request_line)?;
        let version = parse_version(version)?;

        Ok(Self::new(method, uri, version))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.present
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
        self.present = true;
    }

    pub fn set_uri<U: Into<String>>(&mut self, uri: U) {
        self.uri = uri.into();
        self.present = true;
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
        self.present = true;
    }

    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.put_slice(self.method.as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(self.uri.as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(version_str(self.version).as_bytes());
        dst.put_slice(b"\r\n");
    }
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.method, self.uri, version_str(self.version))
    }
}
