//! Decoder for bodies framed by `Content-Length`.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::protocol::{ParseError, PayloadItem};

/// Hands out at most `remaining` bytes, then reports [`PayloadItem::Eof`].
/// Bytes past the announced length stay in the source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    remaining: u64,
}

impl LengthDecoder {
    /// # Arguments
    /// * `length` - body size announced by `Content-Length`
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }

    /// Body bytes not handed out yet.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// Takes the next part of the body from `src`.
    ///
    /// # Arguments
    /// * `src` - bytes read from the connection; only body bytes are consumed
    ///
    /// # Returns
    /// * `Ok(Some(PayloadItem::Chunk(bytes)))` with up to `remaining` bytes
    /// * `Ok(Some(PayloadItem::Eof))` once the announced length has been handed out
    /// * `Ok(None)` when `src` is empty and body bytes are still due
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining == 0 {
            return Ok(Some(PayloadItem::Eof));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let len = usize::try_from(self.remaining).unwrap_or(usize::MAX).min(src.len());
        self.remaining -= len as u64;
        Ok(Some(PayloadItem::Chunk(src.split_to(len).freeze())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignores_trailing_bytes() {
        let mut buffer = BytesMut::from(&b"abcdeXXXXX"[..]);
        let mut decoder = LengthDecoder::new(5);

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap().as_ref(), b"abcde");
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
        assert_eq!(&buffer[..], b"XXXXX");
    }

    #[test]
    fn test_partial_then_rest() {
        let mut decoder = LengthDecoder::new(6);
        let mut buffer = BytesMut::from(&b"abc"[..]);

        assert_eq!(decoder.decode(&mut buffer).unwrap().unwrap().into_bytes().unwrap().as_ref(), b"abc");
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
        assert_eq!(decoder.remaining(), 3);

        buffer.extend_from_slice(b"def");
        assert_eq!(decoder.decode(&mut buffer).unwrap().unwrap().into_bytes().unwrap().as_ref(), b"def");
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn test_zero_length() {
        let mut buffer = BytesMut::from(&b"next"[..]);
        assert!(LengthDecoder::new(0).decode(&mut buffer).unwrap().unwrap().is_eof());
        assert_eq!(buffer.len(), 4);
    }
}
