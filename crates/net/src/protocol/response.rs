use bytes::{BufMut, BytesMut};
use http::{StatusCode, Version};

use crate::protocol::{Cookie, Cookies, Header, HeaderFieldName, Headers, ParseError, StatusLine};

/// An HTTP response: status line, headers, cookie jar and body.
///
/// `Set-Cookie` lines, matched case-insensitively, are kept in
/// [`HttpResponse::cookies`] rather than in the headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    line: StatusLine,
    headers: Headers,
    cookies: Cookies,
    body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: StatusCode) -> Self {
        Self { line: StatusLine::new(Version::HTTP_11, status), ..Self::default() }
    }

    /// Parses a complete response held in memory. Everything after the blank line
    /// ending the head is taken as the body, without looking at its framing.
    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        let mut response = HttpResponse::default();
        let mut rest = buf;
        loop {
            let end = rest
                .iter()
                .position(|&b| b == b'\n')
                .ok_or_else(|| ParseError::incomplete("response head is not terminated"))?;
            let line = rest[..end].strip_suffix(b"\r").unwrap_or(&rest[..end]);
            rest = &rest[end + 1..];

            if line.is_empty() {
                if response.line.is_empty() {
                    continue;
                }
                break;
            }
            response.apply_head_line(line)?;
        }
        response.body = rest.to_vec();
        Ok(response)
    }

    /// Applies one line of a response head: the status line first, header lines after it.
    pub(crate) fn apply_head_line(&mut self, line: &[u8]) -> Result<(), ParseError> {
        if self.line.is_empty() {
            let text = std::str::from_utf8(line).map_err(ParseError::invalid_status_line)?;
            self.line = StatusLine::parse(text)?;
            return Ok(());
        }

        let header = Header::parse(line)?;
        if header.name().eq_ignore_ascii_case("set-cookie") {
            self.cookies.add(Cookie::parse(header.value())?);
        } else {
            self.headers.insert(header);
        }
        Ok(())
    }

    /// Whether a response with this status can carry a body at all.
    /// Informational, `204 No Content` and `304 Not Modified` responses never do.
    pub fn status_allows_body(&self) -> bool {
        let status = self.status();
        !(status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED)
    }

    pub fn status_line(&self) -> &StatusLine {
        &self.line
    }

    pub fn status(&self) -> StatusCode {
        self.line.status()
    }

    pub fn version(&self) -> Version {
        self.line.version()
    }

    pub fn reason(&self) -> &str {
        self.line.reason()
    }

    /// Replaces the status, keeping the version and using the canonical reason phrase.
    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.line = StatusLine::new(self.line.version(), status);
        self
    }

    pub fn set_status_line(&mut self, line: StatusLine) -> &mut Self {
        self.line = line;
        self
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn add_header<N: AsRef<str>, V: Into<String>>(&mut self, name: N, value: V) -> &mut Self {
        self.headers.add(name, value);
        self
    }

    /// Shorthand for looking up a well-known header.
    pub fn header(&self, name: HeaderFieldName) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn cookies(&self) -> &Cookies {
        &self.cookies
    }

    pub fn cookies_mut(&mut self) -> &mut Cookies {
        &mut self.cookies
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Vec<u8> {
        &mut self.body
    }

    pub fn set_body<B: Into<Vec<u8>>>(&mut self, body: B) -> &mut Self {
        self.body = body.into();
        self
    }

    pub fn encoded_len(&self) -> usize {
        self.line.encoded_len() + self.headers.encoded_len() + self.cookies.set_cookie_lines().len() + 2 + self.body.len()
    }

    /// Serializes the response: status line, headers, one `Set-Cookie` line per cookie,
    /// a blank line, then the body as is.
    pub fn write_to(&self, dst: &mut BytesMut) {
        let cookie_lines = self.cookies.set_cookie_lines();
        dst.reserve(self.line.encoded_len() + self.headers.encoded_len() + cookie_lines.len() + 2 + self.body.len());

        self.line.write_to(dst);
        self.headers.write_to(dst);
        dst.put_slice(cookie_lines.as_bytes());
        dst.put_slice(b"\r\n");
        dst.put_slice(&self.body);
    }

    pub fn to_bytes(&self) -> BytesMut {
        let mut dst = BytesMut::new();
        self.write_to(&mut dst);
        dst
    }
}
