//! Body decoders.
//!
//! - [`ChunkedDecoder`]: `Transfer-Encoding: chunked`
//! - [`LengthDecoder`]: `Content-Length`
//! - [`PayloadDecoder`]: picks one of the above, a close-delimited reader, or no body,
//!   from a [`PayloadSize`](crate::protocol::PayloadSize)
//!
//! All of them implement [`tokio_util::codec::Decoder`] over a shared `BytesMut`
//! and leave bytes that belong to the next message in place.

mod chunked_decoder;
mod length_decoder;
mod payload_decoder;

pub use chunked_decoder::ChunkedDecoder;
pub use length_decoder::LengthDecoder;
pub use payload_decoder::PayloadDecoder;
