use std::fmt;

use bytes::{BufMut, BytesMut};
use http::{StatusCode, Version};

use crate::protocol::ParseError;
use crate::protocol::version::{parse_version, version_str};

/// `HTTP/VERSION SP CODE SP PHRASE`.
///
/// Like [`RequestLine`](super::RequestLine), the default value is an empty
/// placeholder that [`StatusLine::is_empty`] reports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusLine {
    version: Version,
    status: StatusCode,
    reason: String,
    present: bool,
}

impl StatusLine {
    /// A status line carrying the canonical reason phrase of `status`.
    pub fn new(version: Version, status: StatusCode) -> Self {
        let reason = status.canonical_reason().unwrap_or_default();
        Self::with_reason(version, status, reason)
    }

    pub fn with_reason<R: Into<String>>(version: Version, status: StatusCode, reason: R) -> Self {
        Self { version, status, reason: reason.into(), present: true }
    }

    /// Parses a status line. The reason phrase may be empty or missing.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        let (version, rest) =
            line.split_once(' ').ok_or_else(|| ParseError::invalid_status_line(format!("missing status code in {line:?}")))?;
        let (code, reason) = rest.split_once(' ').unwrap_or((rest, ""));

        let version = parse_version(version)?;
        let status = StatusCode::from_bytes(code.as_bytes()).map_err(ParseError::invalid_status_line)?;

        Ok(Self::with_reason(version, status, reason))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.present
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Size of the serialized line, CRLF included.
    pub fn encoded_len(&self) -> usize {
        version_str(self.version).len() + self.reason.len() + 7
    }

    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.put_slice(version_str(self.version).as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(self.status.as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(self.reason.as_bytes());
        dst.put_slice(b"\r\n");
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", version_str(self.version), self.status.as_str(), self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let line = StatusLine::parse("HTTP/1.1 404 Not Found\r").unwrap();
        assert_eq!(line.version(), Version::HTTP_11);
        assert_eq!(line.status(), StatusCode::NOT_FOUND);
        assert_eq!(line.reason(), "Not Found");
    }

    #[test]
    fn test_parse_without_reason() {
        let line = StatusLine::parse("HTTP/1.0 204").unwrap();
        assert_eq!(line.status(), StatusCode::NO_CONTENT);
        assert_eq!(line.reason(), "");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(StatusLine::parse("HTTP/1.1"), Err(ParseError::InvalidStatusLine { .. })));
        assert!(matches!(StatusLine::parse("HTTP/1.1 abc OK"), Err(ParseError::InvalidStatusLine { .. })));
        assert!(matches!(StatusLine::parse("SPDY/3 200 OK"), Err(ParseError::InvalidVersion(_))));
    }

    #[test]
    fn test_default_and_write() {
        assert!(StatusLine::default().is_empty());

        let mut dst = BytesMut::new();
        StatusLine::new(Version::HTTP_11, StatusCode::OK).write_to(&mut dst);
        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\n");
        assert_eq!(dst.len(), StatusLine::new(Version::HTTP_11, StatusCode::OK).encoded_len());
    }
}
