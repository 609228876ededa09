//! Decoder for `Transfer-Encoding: chunked` bodies.
//!
//! Each chunk is `<hex-size>[ ...][;ext]CRLF <size bytes> CRLF`; a zero-size chunk
//! ends the body, optionally followed by trailer lines and a final CRLF. Spaces
//! after the size and chunk extensions are skipped. Trailers are read and dropped.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::protocol::{ParseError, PayloadItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: State,
    remaining: u64,
    digits: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Size,
    SizeSpace,
    Extension,
    SizeLf,
    Data,
    DataCr,
    DataLf,
    TrailerStart,
    Trailer,
    TrailerLf,
    EndLf,
    Done,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: State::Size, remaining: 0, digits: 0 }
    }

    /// Whether the zero-size chunk has been read. Only trailers may follow.
    pub fn is_last_chunk_seen(&self) -> bool {
        matches!(self.state, State::TrailerStart | State::Trailer | State::TrailerLf | State::EndLf | State::Done)
    }

    fn push_digit(&mut self, byte: u8) -> Result<(), ParseError> {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            _ => byte - b'A' + 10,
        };
        self.remaining = self
            .remaining
            .checked_mul(16)
            .and_then(|size| size.checked_add(u64::from(digit)))
            .ok_or_else(|| ParseError::invalid_chunk("chunk size overflow"))?;
        self.digits += 1;
        Ok(())
    }

    fn step(&mut self, byte: u8) -> Result<State, ParseError> {
        use State::*;

        let next = match (self.state, byte) {
            (Size, b) if b.is_ascii_hexdigit() => {
                self.push_digit(b)?;
                Size
            }
            (Size, _) if self.digits == 0 => {
                return Err(ParseError::invalid_chunk(format!("chunk size expected, found byte {byte:#04x}")));
            }
            (Size | SizeSpace, b' ' | b'\t') => SizeSpace,
            (Size | SizeSpace, b';') => Extension,
            (Size | SizeSpace | Extension, b'\r') => SizeLf,
            (Extension, b'\n') => return Err(ParseError::invalid_chunk("bare LF inside chunk extension")),
            (Extension, _) => Extension,
            (SizeLf, b'\n') if self.remaining == 0 => TrailerStart,
            (SizeLf, b'\n') => Data,
            (DataCr, b'\r') => DataLf,
            (DataLf, b'\n') => {
                self.digits = 0;
                Size
            }
            (TrailerStart, b'\r') => EndLf,
            (TrailerStart | Trailer, b'\r') => TrailerLf,
            (TrailerStart | Trailer, _) => Trailer,
            (TrailerLf, b'\n') => TrailerStart,
            (EndLf, b'\n') => Done,
            (state, byte) => {
                return Err(ParseError::invalid_chunk(format!("unexpected byte {byte:#04x} in state {state:?}")));
            }
        };
        Ok(next)
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// Runs the framing state machine over `src` until chunk data is available.
    ///
    /// # Arguments
    /// * `src` - bytes read from the connection; framing bytes are consumed as they are parsed
    ///
    /// # Returns
    /// * `Ok(Some(PayloadItem::Chunk(bytes)))` with data from the current chunk
    /// * `Ok(Some(PayloadItem::Eof))` after the zero-size chunk and the final CRLF
    /// * `Ok(None)` when `src` runs out mid-frame
    /// * `Err(ParseError::InvalidChunk)` for a malformed size line or missing CRLF
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                State::Done => {
                    trace!("finished reading chunked body");
                    return Ok(Some(PayloadItem::Eof));
                }
                State::Data => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let len = usize::try_from(self.remaining).unwrap_or(usize::MAX).min(src.len());
                    let bytes = src.split_to(len).freeze();
                    self.remaining -= len as u64;
                    if self.remaining == 0 {
                        self.state = State::DataCr;
                    }
                    trace!(len, remaining = self.remaining, "read chunk data");
                    return Ok(Some(PayloadItem::Chunk(bytes)));
                }
                _ => {
                    let Some(&byte) = src.first() else {
                        return Ok(None);
                    };
                    src.advance(1);
                    self.state = self.step(byte)?;
                }
            }
        }
    }
}
