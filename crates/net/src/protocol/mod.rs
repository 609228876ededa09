//! The HTTP/1.x message model.
//!
//! - **Lines** ([`RequestLine`], [`StatusLine`]): parse and serialize the first line of a
//!   message; their `Default` value is an empty placeholder reported by `is_empty()`
//! - **Headers** ([`Headers`], [`Header`], [`HeaderFieldName`]): two-tier storage, well-known
//!   names under an enum key and everything else under its text, one value per name
//! - **Cookies** ([`Cookie`], [`Cookies`], [`SameSite`]): the `Set-Cookie` attribute grammar
//!   and a last-write-wins jar
//! - **Messages** ([`HttpRequest`], [`HttpResponse`]): line, headers, cookies and body
//! - **Framing** ([`PayloadSize`], [`PayloadItem`], [`Message`]): what the streaming
//!   decoders in [`crate::codec`] produce
//! - **Errors** ([`ParseError`], [`HttpError`])
//!
//! Header names are classified with an exact-case comparison against the canonical
//! spelling. A peer sending `connection: close` therefore stores it as an unknown
//! header and [`Headers::get`] with [`HeaderFieldName::Connection`] will not see it.
//! Body framing is the one place that also accepts other spellings, through
//! [`Headers::get_any_case`].

mod cookie;
mod error;
mod header;
mod message;
mod request;
mod request_line;
mod response;
mod status_line;
mod version;

pub use cookie::{Cookie, Cookies, SameSite};
pub use error::{HttpError, ParseError};
pub use header::{Header, HeaderFieldName, Headers};
pub use message::{Message, PayloadItem, PayloadSize};
pub use request::HttpRequest;
pub use request_line::RequestLine;
pub use response::HttpResponse;
pub use status_line::StatusLine;
