//! HTTP/1.x client.
//!
//! An [`HttpSession`] holds one pending request, the last response and, while the
//! server allows it, an open connection that later requests reuse. Connections come
//! from a [`Connector`]; [`TcpConnector`] is the plain TCP default. Responses are read
//! by a [`ResponseReceiver`], which streams bodies into a [`BodySink`].

mod connector;
mod error;
mod receiver;
mod session;

pub use connector::{Connector, LocalConnector, Target, TcpConnector};
pub use error::ClientError;
pub use receiver::{BodySink, Received, ResponseReceiver};
pub use session::{HttpClient, HttpSession, SessionOptions};
