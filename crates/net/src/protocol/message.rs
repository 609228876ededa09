use bytes::Bytes;

use crate::protocol::{HeaderFieldName, Headers, ParseError};

/// One unit produced by a streaming message decoder: the parsed head first,
/// then any number of payload items ending with [`PayloadItem::Eof`].
#[derive(Debug)]
pub enum Message<T> {
    Head(T),
    Payload(PayloadItem),
}

impl<T> Message<T> {
    #[inline]
    pub fn is_head(&self) -> bool {
        matches!(self, Message::Head(_))
    }

    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    pub fn into_payload_item(self) -> Option<PayloadItem> {
        match self {
            Message::Head(_) => None,
            Message::Payload(item) => Some(item),
        }
    }
}

/// A slice of body bytes, or the end-of-body marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    Chunk(Bytes),
    Eof,
}

impl PayloadItem {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }

    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}

/// How the body of a message is delimited on the wire.
///
/// Selection order when reading a head: a `Transfer-Encoding` containing `chunked`
/// wins, then `Content-Length`, otherwise the body runs until the peer closes
/// (responses) or is empty (requests).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    Length(u64),
    Chunked,
    UntilClose,
    Empty,
}

impl PayloadSize {
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty | PayloadSize::Length(0))
    }

    /// Picks the framing announced by `headers`, or `fallback` when neither
    /// `Transfer-Encoding: chunked` nor `Content-Length` is present.
    pub fn from_headers(headers: &Headers, fallback: PayloadSize) -> Result<Self, ParseError> {
        if let Some(encoding) = headers.get_any_case(HeaderFieldName::TransferEncoding) {
            if encoding.to_ascii_lowercase().contains("chunked") {
                return Ok(PayloadSize::Chunked);
            }
        }

        match headers.get_any_case(HeaderFieldName::ContentLength) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(PayloadSize::Length)
                .map_err(|e| ParseError::invalid_content_length(format!("{value:?}: {e}"))),
            None => Ok(fallback),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunked_wins() {
        let mut headers = Headers::new();
        headers.add("Transfer-Encoding", "gzip, chunked").add("Content-Length", "10");
        assert_eq!(PayloadSize::from_headers(&headers, PayloadSize::Empty).unwrap(), PayloadSize::Chunked);
    }

    #[test]
    fn test_content_length() {
        let mut headers = Headers::new();
        headers.add("Content-Length", " 5 ");
        assert_eq!(PayloadSize::from_headers(&headers, PayloadSize::UntilClose).unwrap(), PayloadSize::Length(5));

        headers.add("Content-Length", "five");
        assert!(matches!(
            PayloadSize::from_headers(&headers, PayloadSize::UntilClose),
            Err(ParseError::InvalidContentLength { .. })
        ));
    }

    #[test]
    fn test_fallback() {
        let headers = Headers::new();
        assert_eq!(PayloadSize::from_headers(&headers, PayloadSize::UntilClose).unwrap(), PayloadSize::UntilClose);
        assert!(PayloadSize::from_headers(&headers, PayloadSize::Empty).unwrap().is_empty());
    }
}
