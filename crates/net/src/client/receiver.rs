//! Streams one response at a time off a connection.
//!
//! [`ResponseReceiver`] drives a [`ResponseDecoder`] against any `AsyncRead`. The head
//! is returned as an [`HttpResponse`] and the body is pushed into a [`BodySink`] as it
//! arrives. Bytes read past the end of a response stay buffered for the next one.

use bytes::BytesMut;
use http::Method;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::Decoder;
use tracing::{debug, trace, warn};

use crate::client::ClientError;
use crate::codec::ResponseDecoder;
use crate::protocol::{HttpResponse, Message, PayloadItem};

/// Bytes requested from the connection per read.
const READ_AHEAD: usize = 4096;

/// Receives body bytes as they are decoded, returning how many it accepted.
///
/// Bytes that are not accepted are dropped; the receiver never offers them again.
pub trait BodySink: Send {
    fn accept(&mut self, bytes: &[u8]) -> usize;
}

impl<F> BodySink for F
where
    F: FnMut(&[u8]) -> usize + Send,
{
    fn accept(&mut self, bytes: &[u8]) -> usize {
        self(bytes)
    }
}

impl BodySink for Vec<u8> {
    fn accept(&mut self, bytes: &[u8]) -> usize {
        self.extend_from_slice(bytes);
        bytes.len()
    }
}

/// Outcome of receiving one response.
#[derive(Debug)]
pub struct Received {
    response: HttpResponse,
    body_len: u64,
    truncated: bool,
    eof: bool,
}

impl Received {
    /// The response head. Its body is empty, the body went to the sink.
    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn into_response(self) -> HttpResponse {
        self.response
    }

    /// Body bytes offered to the sink.
    pub fn body_len(&self) -> u64 {
        self.body_len
    }

    /// Whether the connection failed or closed before the body was complete.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Whether the peer closed the connection, so it cannot carry another exchange.
    pub fn is_eof(&self) -> bool {
        self.eof
    }
}

#[derive(Debug, Default)]
pub struct ResponseReceiver {
    buf: BytesMut,
}

impl ResponseReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops buffered bytes, for when the connection they came from is gone.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Bytes read from the connection but not yet part of a response.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Reads the reply to a request sent with `method`.
    ///
    /// Interim `1xx` responses are skipped.
    ///
    /// # Errors
    ///
    /// [`ClientError::ConnectionClosed`] when the connection ends before a head is
    /// complete, [`ClientError::Parse`] for malformed responses and [`ClientError::Io`]
    /// when reading the head fails. Failing or ending while reading the body is not an
    /// error: the bytes already delivered stay delivered and the result is marked truncated.
    pub async fn receive<R, S>(&mut self, reader: &mut R, method: &Method, sink: &mut S) -> Result<Received, ClientError>
    where
        R: AsyncRead + Unpin + ?Sized,
        S: BodySink + ?Sized,
    {
        let mut decoder = ResponseDecoder::for_method(method);

        let response = loop {
            match decoder.decode(&mut self.buf)? {
                Some(Message::Head(head)) if head.status().is_informational() => {
                    trace!(status = %head.status(), "skipping interim response");
                    decoder = ResponseDecoder::for_method(method);
                }
                Some(Message::Head(head)) => break head,
                Some(Message::Payload(_)) => {}
                None => {
                    if self.fill(reader).await? == 0 {
                        debug!(buffered = self.buf.len(), "connection closed while reading response head");
                        return Err(ClientError::ConnectionClosed);
                    }
                }
            }
        };

        let mut received = Received { response, body_len: 0, truncated: false, eof: false };
        loop {
            let item = if received.eof { decoder.decode_eof(&mut self.buf) } else { decoder.decode(&mut self.buf) };
            match item {
                Ok(Some(Message::Payload(PayloadItem::Chunk(bytes)))) => {
                    received.body_len += bytes.len() as u64;
                    let accepted = sink.accept(&bytes);
                    if accepted < bytes.len() {
                        warn!(offered = bytes.len(), accepted, "body sink accepted fewer bytes than offered");
                    }
                }
                Ok(Some(Message::Payload(PayloadItem::Eof) | Message::Head(_))) => break,
                Ok(None) if received.eof => {
                    received.truncated = true;
                    break;
                }
                Ok(None) => match self.fill(reader).await {
                    Ok(0) => received.eof = true,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(cause = %e, "reading response body failed");
                        received.truncated = true;
                        received.eof = true;
                        break;
                    }
                },
                Err(e) if received.eof => {
                    debug!(cause = %e, body_len = received.body_len, "connection closed inside response body");
                    received.truncated = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        trace!(status = %received.response.status(), body_len = received.body_len, truncated = received.truncated, "response received");
        Ok(received)
    }

    async fn fill<R: AsyncRead + Unpin + ?Sized>(&mut self, reader: &mut R) -> std::io::Result<usize> {
        self.buf.reserve(READ_AHEAD);
        reader.read_buf(&mut self.buf).await
    }
}
