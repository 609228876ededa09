//! Streaming decoders for HTTP message bodies and responses.
//!
//! Every decoder implements [`tokio_util::codec::Decoder`] and works on a shared
//! `BytesMut`: it consumes exactly the bytes of the message it is decoding and leaves
//! anything after it in place for the next message on the connection.
//!
//! - [`ResponseDecoder`]: status line and headers line by line, then the body, as
//!   [`Message::Head`](crate::protocol::Message::Head) followed by
//!   [`Message::Payload`](crate::protocol::Message::Payload) items
//! - [`PayloadDecoder`]: content-length, chunked, close-delimited or empty bodies
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use micro_net::codec::ResponseDecoder;
//! use micro_net::protocol::{Message, PayloadItem};
//! use tokio_util::codec::Decoder;
//!
//! let mut src = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello"[..]);
//! let mut decoder = ResponseDecoder::new();
//!
//! let Some(Message::Head(response)) = decoder.decode(&mut src).unwrap() else { unreachable!() };
//! assert_eq!(response.status(), 200);
//!
//! let Some(Message::Payload(PayloadItem::Chunk(body))) = decoder.decode(&mut src).unwrap() else { unreachable!() };
//! assert_eq!(&body[..], b"hello");
//! ```

mod body;
mod response_decoder;

pub use body::{ChunkedDecoder, LengthDecoder, PayloadDecoder};
pub use response_decoder::ResponseDecoder;
