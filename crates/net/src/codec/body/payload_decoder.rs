//! One decoder over every body framing a message head can announce.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::protocol::{ParseError, PayloadItem, PayloadSize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    /// Everything until the peer closes the connection.
    UntilClose { finished: bool },
    NoBody,
}

impl PayloadDecoder {
    /// For messages that carry no body, such as replies to `HEAD` or `204 No Content`.
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new()) }
    }

    /// For a body of exactly `size` bytes.
    ///
    /// # Arguments
    /// * `size` - the value of the message's `Content-Length` header
    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    /// For a body that ends when the peer closes the connection.
    pub fn until_close() -> Self {
        Self { kind: Kind::UntilClose { finished: false } }
    }
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(size: PayloadSize) -> Self {
        match size {
            PayloadSize::Length(length) => Self::fix_length(length),
            PayloadSize::Chunked => Self::chunked(),
            PayloadSize::UntilClose => Self::until_close(),
            PayloadSize::Empty => Self::empty(),
        }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// Forwards to the decoder of the selected framing.
    ///
    /// # Returns
    /// * `Ok(Some(PayloadItem::Chunk(bytes)))` for the next piece of the body
    /// * `Ok(Some(PayloadItem::Eof))` once the body is complete, and on every call after
    /// * `Ok(None)` while more input is needed
    /// * `Err(ParseError)` when a chunked body is malformed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(decoder) => decoder.decode(src),
            Kind::Chunked(decoder) => decoder.decode(src),
            Kind::UntilClose { finished: true } | Kind::NoBody => Ok(Some(PayloadItem::Eof)),
            Kind::UntilClose { finished: false } if src.is_empty() => Ok(None),
            Kind::UntilClose { finished: false } => Ok(Some(PayloadItem::Chunk(src.split().freeze()))),
        }
    }

    /// At end of stream a close-delimited body is complete. A chunked body is complete
    /// once its last chunk was read, even if the final CRLF never arrived. Any other
    /// body cut short is reported as [`ParseError::Incomplete`].
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Kind::UntilClose { finished } = &mut self.kind {
            if !src.is_empty() {
                return Ok(Some(PayloadItem::Chunk(src.split().freeze())));
            }
            *finished = true;
            return Ok(Some(PayloadItem::Eof));
        }

        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => match &self.kind {
                Kind::Chunked(decoder) if decoder.is_last_chunk_seen() => Ok(Some(PayloadItem::Eof)),
                _ => Err(ParseError::incomplete("connection closed before the body was complete")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_until_close_drains_on_eof() {
        let mut decoder = PayloadDecoder::from(PayloadSize::UntilClose);
        let mut buffer = BytesMut::from(&b"part one"[..]);

        assert_eq!(decoder.decode(&mut buffer).unwrap().unwrap().into_bytes().unwrap().as_ref(), b"part one");
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b" and two");
        assert_eq!(decoder.decode_eof(&mut buffer).unwrap().unwrap().into_bytes().unwrap().as_ref(), b" and two");
        assert!(decoder.decode_eof(&mut buffer).unwrap().unwrap().is_eof());
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn test_truncated_length_body() {
        let mut decoder = PayloadDecoder::fix_length(10);
        let mut buffer = BytesMut::from(&b"abc"[..]);

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_chunk());
        assert!(matches!(decoder.decode_eof(&mut buffer), Err(ParseError::Incomplete { .. })));
    }

    #[test]
    fn test_chunked_without_final_crlf() {
        let mut decoder = PayloadDecoder::chunked();
        let mut buffer = BytesMut::from(&b"2\r\nok\r\n0\r\n"[..]);

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_chunk());
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
        assert!(decoder.decode_eof(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn test_no_body() {
        let mut buffer = BytesMut::from(&b"ignored"[..]);
        assert!(PayloadDecoder::empty().decode(&mut buffer).unwrap().unwrap().is_eof());
        assert_eq!(buffer.len(), 7);
    }
}
