use std::io;

use thiserror::Error;

use crate::protocol::ParseError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect after {attempts} attempts: {source}")]
    Connect { attempts: usize, source: io::Error },

    #[error("short write: sent {sent} of {expected} bytes")]
    ShortWrite { sent: usize, expected: usize },

    #[error("connection closed before the response head was complete")]
    ConnectionClosed,

    #[error("too many redirects, stopped after {max}")]
    TooManyRedirects { max: usize },

    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported: {reason}")]
    Unsupported { reason: String },

    #[error("parse error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ClientError {
    pub fn invalid_url<U: ToString, R: ToString>(url: U, reason: R) -> Self {
        Self::InvalidUrl { url: url.to_string(), reason: reason.to_string() }
    }

    pub fn unsupported<S: ToString>(reason: S) -> Self {
        Self::Unsupported { reason: reason.to_string() }
    }
}
