use bytes::{Buf, BufMut, BytesMut};
use http::{Method, Version};
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::PayloadDecoder;
use crate::ensure;
use crate::protocol::{
    Cookies, Header, HeaderFieldName, Headers, ParseError, PayloadItem, PayloadSize, RequestLine,
};

/// Maximum number of header lines in a request head.
const MAX_HEADER_NUM: usize = 64;

/// Maximum size of a request head, request line included.
const MAX_HEADER_BYTES: usize = 64 * 1024;

/// An HTTP request: request line, headers, cookie jar and body.
///
/// `Cookie` header lines never live in [`HttpRequest::headers`]; they are split
/// into [`HttpRequest::cookies`] when parsing and written back as a single
/// `Cookie:` line when serializing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    line: RequestLine,
    headers: Headers,
    cookies: Cookies,
    body: Vec<u8>,
}

impl HttpRequest {
    pub fn new<U: Into<String>>(method: Method, uri: U) -> Self {
        Self { line: RequestLine::new(method, uri, Version::HTTP_11), ..Self::default() }
    }

    /// Decodes one request from the front of `src`.
    ///
    /// Returns `Ok(None)`, leaving `src` untouched, until both the head and the body
    /// announced by `Content-Length` or `Transfer-Encoding: chunked` are buffered.
    /// A request without either has an empty body. On success the request's bytes
    /// are split off `src`.
    pub fn decode(src: &mut BytesMut) -> Result<Option<Self>, ParseError> {
        let mut raw_headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut parsed = httparse::Request::new(&mut raw_headers);

        let head_len = match parsed.parse(&src[..]) {
            Ok(Status::Complete(head_len)) => head_len,
            Ok(Status::Partial) => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
            Err(httparse::Error::TooManyHeaders) => return Err(ParseError::too_many_headers(MAX_HEADER_NUM)),
            Err(e) => return Err(ParseError::invalid_header(e)),
        };
        ensure!(head_len <= MAX_HEADER_BYTES, ParseError::too_large_header(head_len, MAX_HEADER_BYTES));

        let method = parsed.method.ok_or_else(|| ParseError::invalid_request_line("missing method"))?;
        let method = Method::from_bytes(method.as_bytes()).map_err(ParseError::invalid_request_line)?;
        let uri = parsed.path.ok_or_else(|| ParseError::invalid_request_line("missing uri"))?;
        let version = match parsed.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            other => return Err(ParseError::invalid_version(format!("{other:?}"))),
        };

        let mut request = HttpRequest { line: RequestLine::new(method, uri, version), ..Self::default() };
        for header in parsed.headers.iter() {
            let value = String::from_utf8_lossy(header.value);
            request.apply_header(Header::new(header.name, value))?;
        }

        let size = PayloadSize::from_headers(&request.headers, PayloadSize::Empty)?;
        let Some(body_len) = request.read_body(&src[head_len..], size)? else {
            trace!(head_len, buffered = src.len(), "request body incomplete");
            return Ok(None);
        };

        trace!(method = %request.method(), uri = request.uri(), head_len, body_len, "decoded request");
        src.advance(head_len + body_len);
        Ok(Some(request))
    }

    /// Parses a complete request held in memory.
    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        let mut src = BytesMut::from(buf);
        Self::decode(&mut src)?.ok_or_else(|| ParseError::incomplete("request is not complete"))
    }

    /// Copies the framed body out of `src`, returning how many wire bytes it occupied.
    fn read_body(&mut self, src: &[u8], size: PayloadSize) -> Result<Option<usize>, ParseError> {
        if size.is_empty() || size == PayloadSize::UntilClose {
            return Ok(Some(0));
        }

        let mut remaining = BytesMut::from(src);
        let mut decoder = PayloadDecoder::from(size);
        loop {
            match decoder.decode(&mut remaining)? {
                Some(PayloadItem::Chunk(bytes)) => self.body.extend_from_slice(&bytes),
                Some(PayloadItem::Eof) => return Ok(Some(src.len() - remaining.len())),
                None => return Ok(None),
            }
        }
    }

    fn apply_header(&mut self, header: Header) -> Result<(), ParseError> {
        match header {
            Header::Common { name: HeaderFieldName::Cookie, value } => self.cookies.add_request_header(&value),
            header => {
                self.headers.insert(header);
                Ok(())
            }
        }
    }

    pub fn request_line(&self) -> &RequestLine {
        &self.line
    }

    pub fn request_line_mut(&mut self) -> &mut RequestLine {
        &mut self.line
    }

    pub fn method(&self) -> &Method {
        self.line.method()
    }

    pub fn uri(&self) -> &str {
        self.line.uri()
    }

    pub fn version(&self) -> Version {
        self.line.version()
    }

    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.line.set_method(method);
        self
    }

    pub fn set_uri<U: Into<String>>(&mut self, uri: U) -> &mut Self {
        self.line.set_uri(uri);
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

    pub fn cookies(&self) -> &Cookies {
        &self.cookies
    }

    pub fn cookies_mut(&mut self) -> &mut Cookies {
        &mut self.cookies
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn set_body<B: Into<Vec<u8>>>(&mut self, body: B) -> &mut Self {
        self.body = body.into();
        self
    }

    /// Serializes the request: line, headers, the `Cookie` line, a blank line, then the body as is.
    pub fn write_to(&self, dst: &mut BytesMut) {
        let cookie_line = self.cookies.cookie_header();
        dst.reserve(self.line.uri().len() + 32 + self.headers.encoded_len() + cookie_line.len() + self.body.len());

        self.line.write_to(dst);
        self.headers.write_to(dst);
        dst.put_slice(cookie_line.as_bytes());
        dst.put_slice(b"\r\n");
        dst.put_slice(&self.body);
    }

    pub fn to_bytes(&self) -> BytesMut {
        let mut dst = BytesMut::new();
        self.write_to(&mut dst);
        dst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn crlf(text: &str) -> Vec<u8> {
        text.replace('\n', "\r\n").into_bytes()
    }

    #[test]
    fn test_decode_get() {
        let raw = crlf(indoc! {"
            GET /index.html HTTP/1.1
            Host: 127.0.0.1:8080
            User-Agent: curl/7.79.1
            Accept: */*
            x-custom: yes
            Cookie: session=abc; theme=dark

        "});

        let request = HttpRequest::parse(&raw).unwrap();
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.uri(), "/index.html");
        assert_eq!(request.version(), Version::HTTP_11);
        assert_eq!(request.headers().get(HeaderFieldName::Host), Some("127.0.0.1:8080"));
        assert_eq!(request.headers().find("x-custom"), Some("yes"));
        assert_eq!(request.headers().get(HeaderFieldName::Cookie), None);
        assert_eq!(request.cookies().get("theme").map(|c| c.value()), Some("dark"));
        assert_eq!(request.headers().len(), 4);
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_decode_waits_for_body() {
        let mut src = BytesMut::from(&crlf("POST /add HTTP/1.1\nContent-Length: 4\n\n")[..]);
        src.extend_from_slice(b"1+");
        let buffered = src.len();

        assert!(HttpRequest::decode(&mut src).unwrap().is_none());
        assert_eq!(src.len(), buffered);

        src.extend_from_slice(b"41GET");
        let request = HttpRequest::decode(&mut src).unwrap().unwrap();
        assert_eq!(request.body(), b"1+41");
        assert_eq!(&src[..], b"GET");
    }

    #[test]
    fn test_decode_chunked_body() {
        let mut src = BytesMut::from(&crlf("PUT /x HTTP/1.1\nTransfer-Encoding: chunked\n\n4\nWiki\n5\npedia\n0\n\n")[..]);
        let request = HttpRequest::decode(&mut src).unwrap().unwrap();

        assert_eq!(request.body(), b"Wikipedia");
        assert!(src.is_empty());
    }

    #[test]
    fn test_decode_partial_head() {
        let mut src = BytesMut::from(&b"GET / HTTP/1.1\r\nHost: a"[..]);
        assert!(HttpRequest::decode(&mut src).unwrap().is_none());
    }

    #[test]
    fn test_decode_errors() {
        assert!(HttpRequest::parse(b"GET / HTTP/1.1\r\nBad Header\r\n\r\n").is_err());
        assert!(matches!(
            HttpRequest::parse(b"POST / HTTP/1.1\r\nContent-Length: x\r\n\r\n"),
            Err(ParseError::InvalidContentLength { .. })
        ));
        assert!(matches!(HttpRequest::parse(b"GET / HTTP/1.1\r\n"), Err(ParseError::Incomplete { .. })));
    }

    #[test]
    fn test_serialize() {
        let mut request = HttpRequest::new(Method::POST, "/submit");
        request.add_header("Host", "example.com").add_header("Content-Length", "5").set_body("hello");
        request.cookies_mut().add_request_header("a=1").unwrap();

        let bytes = request.to_bytes();
        assert_eq!(
            &bytes[..],
            b"POST /submit HTTP/1.1\r\nContent-Length: 5\r\nHost: example.com\r\nCookie: a=1\r\n\r\nhello"
        );
        assert_eq!(HttpRequest::parse(&bytes).unwrap(), request);
    }
}
