//! Streaming decoder for HTTP responses.
//!
//! The head is read line by line: the first line is the status line, every following
//! non-empty line is a header (with `Set-Cookie` diverted into the cookie jar), and an
//! empty line ends the head. The body framing is then chosen from the head:
//!
//! 1. no body for `1xx`, `204`, `304` and replies to `HEAD`
//! 2. `Transfer-Encoding` containing `chunked`
//! 3. `Content-Length`
//! 4. otherwise everything until the peer closes the connection
//!
//! After the body's [`PayloadItem::Eof`] the decoder is ready for the next response
//! on the same connection.

use std::mem;

use bytes::BytesMut;
use http::Method;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::PayloadDecoder;
use crate::ensure;
use crate::protocol::{HttpResponse, Message, ParseError, PayloadItem, PayloadSize};

/// Maximum size of a response head, status line included.
const MAX_HEAD_BYTES: usize = 64 * 1024;

#[derive(Debug)]
pub struct ResponseDecoder {
    state: State,
    head_request: bool,
}

#[derive(Debug)]
enum State {
    Head { response: HttpResponse, head_len: usize },
    Payload(PayloadDecoder),
}

impl State {
    fn head() -> Self {
        State::Head { response: HttpResponse::default(), head_len: 0 }
    }
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self { state: State::head(), head_request: false }
    }

    /// A decoder for the reply to a request sent with `method`. Replies to `HEAD`
    /// never carry a body, whatever their headers announce.
    pub fn for_method(method: &Method) -> Self {
        Self { state: State::head(), head_request: method == Method::HEAD }
    }

    /// Whether the decoder is between messages, with no partial head buffered.
    pub fn is_idle(&self) -> bool {
        matches!(&self.state, State::Head { head_len: 0, response } if response.status_line().is_empty())
    }

    fn payload_size(&self, response: &HttpResponse) -> Result<PayloadSize, ParseError> {
        if self.head_request || !response.status_allows_body() {
            return Ok(PayloadSize::Empty);
        }
        PayloadSize::from_headers(response.headers(), PayloadSize::UntilClose)
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<HttpResponse>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match &mut self.state {
                State::Payload(decoder) => {
                    let item = decoder.decode(src)?;
                    if matches!(item, Some(PayloadItem::Eof)) {
                        self.state = State::head();
                    }
                    return Ok(item.map(Message::Payload));
                }

                State::Head { response, head_len } => {
                    let Some(end) = src.iter().position(|&b| b == b'\n') else {
                        let pending = *head_len + src.len();
                        ensure!(pending <= MAX_HEAD_BYTES, ParseError::too_large_header(pending, MAX_HEAD_BYTES));
                        return Ok(None);
                    };

                    let raw = src.split_to(end + 1);
                    *head_len += raw.len();
                    ensure!(*head_len <= MAX_HEAD_BYTES, ParseError::too_large_header(*head_len, MAX_HEAD_BYTES));

                    let line = raw[..end].strip_suffix(b"\r").unwrap_or(&raw[..end]);
                    if !line.is_empty() {
                        response.apply_head_line(line)?;
                        continue;
                    }
                    if response.status_line().is_empty() {
                        // stray CRLF between messages
                        *head_len = 0;
                        continue;
                    }

                    let response = mem::take(response);
                    let size = self.payload_size(&response)?;
                    trace!(status = %response.status(), ?size, "decoded response head");
                    self.state = State::Payload(PayloadDecoder::from(size));
                    return Ok(Some(Message::Head(response)));
                }
            }
        }
    }

    /// At end of stream a partial head is an error and a partial body is decided by its framing,
    /// see [`PayloadDecoder`].
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }

        let idle = self.is_idle();
        match &mut self.state {
            State::Payload(decoder) => {
                let item = decoder.decode_eof(src)?;
                if matches!(item, Some(PayloadItem::Eof)) {
                    self.state = State::head();
                }
                Ok(item.map(Message::Payload))
            }
            State::Head { .. } if idle && src.is_empty() => Ok(None),
            State::Head { .. } => Err(ParseError::incomplete("connection closed before the response head was complete")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use indoc::indoc;

    fn crlf(text: &str) -> BytesMut {
        BytesMut::from(text.replace('\n', "\r\n").as_bytes())
    }

    fn collect_body(decoder: &mut ResponseDecoder, src: &mut BytesMut) -> Vec<u8> {
        let mut body = Vec::new();
        while let Some(message) = decoder.decode(src).unwrap() {
            match message.into_payload_item() {
                Some(PayloadItem::Chunk(bytes)) => body.extend_from_slice(&bytes),
                Some(PayloadItem::Eof) => break,
                None => panic!("unexpected second head"),
            }
        }
        body
    }

    #[test]
    fn test_content_length() {
        let mut src = crlf(indoc! {"
            HTTP/1.1 200 OK
            Content-Length: 5
            Content-Type: text/plain

        "});
        src.extend_from_slice(b"abcdeXXXXX");

        let mut decoder = ResponseDecoder::new();
        let Some(Message::Head(response)) = decoder.decode(&mut src).unwrap() else {
            panic!("expected a head");
        };
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().find("Content-Type"), Some("text/plain"));

        assert_eq!(collect_body(&mut decoder, &mut src), b"abcde");
        assert_eq!(&src[..], b"XXXXX");
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_chunked() {
        let mut src = crlf("HTTP/1.1 200 OK\nTransfer-Encoding: chunked\n\n4\nWiki\n5\npedia\n0\n\n");
        let mut decoder = ResponseDecoder::new();

        assert!(decoder.decode(&mut src).unwrap().unwrap().is_head());
        assert_eq!(collect_body(&mut decoder, &mut src), b"Wikipedia");
        assert!(src.is_empty());
    }

    #[test]
    fn test_head_split_across_reads() {
        let mut decoder = ResponseDecoder::new();
        let mut src = BytesMut::from(&b"HTTP/1.1 404 Not Fo"[..]);
        assert!(decoder.decode(&mut src).unwrap().is_none());

        src.extend_from_slice(b"und\r\nSet-Cookie: a=1\r\nContent-Length: 0\r");
        assert!(decoder.decode(&mut src).unwrap().is_none());
        assert!(!decoder.is_idle());

        src.extend_from_slice(b"\n\r\n");
        let Some(Message::Head(response)) = decoder.decode(&mut src).unwrap() else {
            panic!("expected a head");
        };
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.cookies().len(), 1);
        assert!(decoder.decode(&mut src).unwrap().unwrap().into_payload_item().unwrap().is_eof());
    }

    #[test]
    fn test_until_close() {
        let mut src = crlf("HTTP/1.0 200 OK\nServer: old\n\nsome");
        let mut decoder = ResponseDecoder::new();

        assert!(decoder.decode(&mut src).unwrap().unwrap().is_head());
        let chunk = decoder.decode(&mut src).unwrap().unwrap().into_payload_item().unwrap();
        assert_eq!(chunk.into_bytes().unwrap().as_ref(), b"some");

        src.extend_from_slice(b" more");
        let chunk = decoder.decode_eof(&mut src).unwrap().unwrap().into_payload_item().unwrap();
        assert_eq!(chunk.into_bytes().unwrap().as_ref(), b" more");
        assert!(decoder.decode_eof(&mut src).unwrap().unwrap().into_payload_item().unwrap().is_eof());
        assert!(decoder.decode_eof(&mut src).unwrap().is_none());
    }

    #[test]
    fn test_no_body_statuses() {
        let mut src = crlf("HTTP/1.1 304 Not Modified\nContent-Length: 10\n\nHTTP/1.1 204 No Content\n\n");
        let mut decoder = ResponseDecoder::new();

        for expected in [StatusCode::NOT_MODIFIED, StatusCode::NO_CONTENT] {
            let Some(Message::Head(response)) = decoder.decode(&mut src).unwrap() else {
                panic!("expected a head");
            };
            assert_eq!(response.status(), expected);
            assert!(decoder.decode(&mut src).unwrap().unwrap().into_payload_item().unwrap().is_eof());
        }
    }

    #[test]
    fn test_reply_to_head_request() {
        let mut src = crlf("HTTP/1.1 200 OK\nContent-Length: 1024\n\n");
        let mut decoder = ResponseDecoder::for_method(&Method::HEAD);

        assert!(decoder.decode(&mut src).unwrap().unwrap().is_head());
        assert!(decoder.decode(&mut src).unwrap().unwrap().into_payload_item().unwrap().is_eof());
    }

    #[test]
    fn test_eof_inside_head() {
        let mut src = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-"[..]);
        let mut decoder = ResponseDecoder::new();

        assert!(matches!(decoder.decode_eof(&mut src), Err(ParseError::Incomplete { .. })));
    }

    #[test]
    fn test_invalid_status_line() {
        let mut src = BytesMut::from(&b"HTTP/1.1 OK\r\n\r\n"[..]);
        assert!(ResponseDecoder::new().decode(&mut src).is_err());
    }
}
