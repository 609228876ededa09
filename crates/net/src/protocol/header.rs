//! Two-tier HTTP header storage.
//!
//! Header names that appear in the well-known table are stored under a compact
//! [`HeaderFieldName`] key, everything else falls back to a string key. Both tiers
//! behave the same way from the caller's point of view: one value per name, and
//! adding a name that already exists overwrites the previous value.
//!
//! Name classification is exact-case: `Content-Type` is well-known while
//! `content-type` is filed under the string tier. Lookups go through the same
//! classification, so a header is always found by the spelling it was added with.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, BytesMut};

use crate::ensure;
use crate::protocol::ParseError;

macro_rules! well_known_headers {
    ($(($variant:ident, $canonical:literal);)+) => {
        /// The closed set of header names stored under an enum key.
        ///
        /// The declaration order is the serialization order of [`Headers`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum HeaderFieldName {
            $($variant,)+
        }

        impl HeaderFieldName {
            pub const ALL: &'static [HeaderFieldName] = &[$(HeaderFieldName::$variant,)+];

            /// Returns the canonical spelling of this header name.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(HeaderFieldName::$variant => $canonical,)+
                }
            }

            /// Looks a name up in the well-known table, comparing case-sensitively
            /// against the canonical spelling.
            pub fn from_canonical(name: &str) -> Option<Self> {
                match name {
                    $($canonical => Some(HeaderFieldName::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

well_known_headers! {
    (Accept, "Accept");
    (AcceptCh, "Accept-CH");
    (AcceptCharset, "Accept-Charset");
    (AcceptFeatures, "Accept-Features");
    (AcceptEncoding, "Accept-Encoding");
    (AcceptLanguage, "Accept-Language");
    (AcceptRanges, "Accept-Ranges");
    (AccessControlAllowCredentials, "Access-Control-Allow-Credentials");
    (AccessControlAllowOrigin, "Access-Control-Allow-Origin");
    (AccessControlAllowMethods, "Access-Control-Allow-Methods");
    (AccessControlAllowHeaders, "Access-Control-Allow-Headers");
    (AccessControlExposeHeaders, "Access-Control-Expose-Headers");
    (AccessControlMaxAge, "Access-Control-Max-Age");
    (AccessControlRequestMethod, "Access-Control-Request-Method");
    (AccessControlRequestHeaders, "Access-Control-Request-Headers");
    (Age, "Age");
    (Allow, "Allow");
    (AlsoControl, "Also-Control");
    (AlternateRecipient, "Alternate-Recipient");
    (Approved, "Approved");
    (Archive, "Archive");
    (ArchivedAt, "Archived-At");
    (Authorization, "Authorization");
    (Base, "Base");
    (Bcc, "Bcc");
    (Body, "Body");
    (CacheControl, "Cache-Control");
    (CancelKey, "Cancel-Key");
    (CancelLock, "Cancel-Lock");
    (Cc, "Cc");
    (Comments, "Comments");
    (Connection, "Connection");
    (ContentAlternative, "Content-Alternative");
    (ContentBase, "Content-Base");
    (ContentDescription, "Content-Description");
    (ContentDisposition, "Content-Disposition");
    (ContentDuration, "Content-Duration");
    (ContentEncoding, "Content-Encoding");
    (ContentLanguage, "Content-Language");
    (ContentLength, "Content-Length");
    (ContentLocation, "Content-Location");
    (ContentRange, "Content-Range");
    (ContentSecurityPolicy, "Content-Security-Policy");
    (ContentType, "Content-Type");
    (Cookie, "Cookie");
    (Date, "Date");
    (ETag, "ETag");
    (Expect, "Expect");
    (Expires, "Expires");
    (From, "From");
    (Host, "Host");
    (IfMatch, "If-Match");
    (IfModifiedSince, "If-Modified-Since");
    (IfNoneMatch, "If-None-Match");
    (IfRange, "If-Range");
    (IfUnmodifiedSince, "If-Unmodified-Since");
    (LastModified, "Last-Modified");
    (Link, "Link");
    (Location, "Location");
    (MaxForwards, "Max-Forwards");
    (Negotiate, "Negotiate");
    (Origin, "Origin");
    (Pragma, "Pragma");
    (ProxyAuthenticate, "Proxy-Authenticate");
    (ProxyAuthorization, "Proxy-Authorization");
    (Range, "Range");
    (Referer, "Referer");
    (SecWebsocketExtensions, "Sec-Websocket-Extensions");
    (SecWebsocketKey, "Sec-Websocket-Key");
    (SecWebsocketOrigin, "Sec-Websocket-Origin");
    (SecWebsocketProtocol, "Sec-Websocket-Protocol");
    (SecWebsocketVersion, "Sec-Websocket-Version");
    (Server, "Server");
    (SetCookie, "Set-Cookie");
    (SetCookie2, "Set-Cookie2");
    (StrictTransportSecurity, "Strict-Transport-Security");
    (Tcn, "TCN");
    (Te, "TE");
    (Trailer, "Trailer");
    (TransferEncoding, "Transfer-Encoding");
    (Upgrade, "Upgrade");
    (UserAgent, "User-Agent");
    (VariantVary, "Variant-Vary");
    (Vary, "Vary");
    (Via, "Via");
    (Warning, "Warning");
    (WwwAuthenticate, "WWW-Authenticate");
}

impl fmt::Display for HeaderFieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single header line, keyed either by a well-known name or by its raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    Common { name: HeaderFieldName, value: String },
    Unknown { name: String, value: String },
}

impl Header {
    /// Builds a header, filing `name` under the well-known tier when it matches
    /// a canonical spelling exactly.
    pub fn new<N: AsRef<str>, V: Into<String>>(name: N, value: V) -> Self {
        let name = name.as_ref();
        match HeaderFieldName::from_canonical(name) {
            Some(name) => Header::Common { name, value: value.into() },
            None => Header::Unknown { name: name.to_owned(), value: value.into() },
        }
    }

    pub fn common<V: Into<String>>(name: HeaderFieldName, value: V) -> Self {
        Header::Common { name, value: value.into() }
    }

    /// Parses one header line such as `Content-Type: text/html`.
    ///
    /// The name is everything before the first `:`. The value is everything after
    /// it with leading spaces and a trailing CR removed.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidHeader`] when the line has no `:` or the name
    /// before it is empty.
    pub fn parse(line: &[u8]) -> Result<Self, ParseError> {
        let colon = line
            .iter()
            .position(|&b| b == b':')
            .ok_or_else(|| ParseError::invalid_header(format!("missing ':' in {:?}", String::from_utf8_lossy(line))))?;

        let name = std::str::from_utf8(&line[..colon]).map_err(ParseError::invalid_header)?;
        ensure!(!name.is_empty(), ParseError::invalid_header("empty header name"));

        let mut value = &line[colon + 1..];
        while let [b' ', rest @ ..] = value {
            value = rest;
        }
        if let [rest @ .., b'\r'] = value {
            value = rest;
        }

        Ok(Header::new(name, String::from_utf8_lossy(value)))
    }

    pub fn name(&self) -> &str {
        match self {
            Header::Common { name, .. } => name.as_str(),
            Header::Unknown { name, .. } => name,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Header::Common { value, .. } | Header::Unknown { value, .. } => value,
        }
    }

    pub fn set_value<V: Into<String>>(&mut self, new_value: V) {
        match self {
            Header::Common { value, .. } | Header::Unknown { value, .. } => *value = new_value.into(),
        }
    }

    #[inline]
    pub fn is_common(&self) -> bool {
        matches!(self, Header::Common { .. })
    }

    /// Size of the serialized line, `": "` and CRLF included.
    pub fn encoded_len(&self) -> usize {
        self.name().len() + self.value().len() + 4
    }
}

impl FromStr for Header {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Header::parse(s.as_bytes())
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.value())
    }
}

/// A set of headers backed by one map per tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    common: BTreeMap<HeaderFieldName, String>,
    unknown: BTreeMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header by name, overwriting any previous value stored under the same name.
    /// An empty name is ignored.
    pub fn add<N: AsRef<str>, V: Into<String>>(&mut self, name: N, value: V) -> &mut Self {
        let name = name.as_ref();
        if name.is_empty() {
            return self;
        }
        self.insert(Header::new(name, value))
    }

    pub fn add_common<V: Into<String>>(&mut self, name: HeaderFieldName, value: V) -> &mut Self {
        self.common.insert(name, value.into());
        self
    }

    pub fn insert(&mut self, header: Header) -> &mut Self {
        match header {
            Header::Common { name, value } => {
                self.common.insert(name, value);
            }
            Header::Unknown { name, value } => {
                if !name.is_empty() {
                    self.unknown.insert(name, value);
                }
            }
        }
        self
    }

    /// Finds the value stored under `name`, classifying the name the same way [`Headers::add`] does.
    pub fn find(&self, name: &str) -> Option<&str> {
        match HeaderFieldName::from_canonical(name) {
            Some(name) => self.get(name),
            None => self.unknown.get(name).map(String::as_str),
        }
    }

    pub fn get(&self, name: HeaderFieldName) -> Option<&str> {
        self.common.get(&name).map(String::as_str)
    }

    /// Like [`Headers::get`], but also accepts an unknown-tier entry whose name matches
    /// case-insensitively. Only body framing uses this.
    pub fn get_any_case(&self, name: HeaderFieldName) -> Option<&str> {
        self.get(name).or_else(|| {
            self.unknown
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name.as_str()))
                .map(|(_, value)| value.as_str())
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        match HeaderFieldName::from_canonical(name) {
            Some(name) => self.remove_common(name),
            None => self.unknown.remove(name),
        }
    }

    pub fn remove_common(&mut self, name: HeaderFieldName) -> Option<String> {
        self.common.remove(&name)
    }

    /// Number of distinct header names across both tiers.
    pub fn len(&self) -> usize {
        self.common.len() + self.unknown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.common.is_empty() && self.unknown.is_empty()
    }

    /// Iterates well-known headers in table order, then the others in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.common
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .chain(self.unknown.iter().map(|(name, value)| (name.as_str(), value.as_str())))
    }

    pub fn encoded_len(&self) -> usize {
        self.iter().map(|(name, value)| name.len() + value.len() + 4).sum()
    }

    /// Writes every header as `Name: value\r\n`. The terminating blank line is left to the caller.
    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        for (name, value) in self.iter() {
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
    }
}

impl Extend<Header> for Headers {
    fn extend<T: IntoIterator<Item = Header>>(&mut self, iter: T) {
        for header in iter {
            self.insert(header);
        }
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<T: IntoIterator<Item = Header>>(iter: T) -> Self {
        let mut headers = Headers::new();
        headers.extend(iter);
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_overwrites() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "a");
        headers.add("Content-Type", "b");

        assert_eq!(headers.find("Content-Type"), Some("b"));
        assert_eq!(headers.get(HeaderFieldName::ContentType), Some("b"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_unknown_overwrites() {
        let mut headers = Headers::new();
        headers.add("X-Trace", "1").add("X-Trace", "2");

        assert_eq!(headers.find("X-Trace"), Some("2"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_empty_name_ignored() {
        let mut headers = Headers::new();
        headers.add("", "value");
        assert!(headers.is_empty());
    }

    #[test]
    fn test_parse_common() {
        let header = Header::parse(b"Content-Length:   42\r").unwrap();
        assert_eq!(header, Header::common(HeaderFieldName::ContentLength, "42"));
    }

    #[test]
    fn test_parse_splits_at_first_colon() {
        let header: Header = "Location: http://example.com:8080/x".parse().unwrap();
        assert!(header.is_common());
        assert_eq!(header.value(), "http://example.com:8080/x");
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        let header = Header::parse(b"content-type: text/plain").unwrap();
        assert!(!header.is_common());
        assert_eq!(header.name(), "content-type");

        let mut headers = Headers::new();
        headers.insert(header);
        assert_eq!(headers.get(HeaderFieldName::ContentType), None);
        assert_eq!(headers.find("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_get_any_case() {
        let mut headers = Headers::new();
        headers.add("content-length", "7");

        assert_eq!(headers.get(HeaderFieldName::ContentLength), None);
        assert_eq!(headers.get_any_case(HeaderFieldName::ContentLength), Some("7"));
    }

    #[test]
    fn test_parse_rejects_missing_colon() {
        assert!(matches!(Header::parse(b"no colon here"), Err(ParseError::InvalidHeader { .. })));
        assert!(matches!(Header::parse(b": value"), Err(ParseError::InvalidHeader { .. })));
    }

    #[test]
    fn test_parse_empty_value() {
        let header = Header::parse(b"X-Empty:").unwrap();
        assert_eq!(header.value(), "");
    }

    #[test]
    fn test_remove() {
        let mut headers = Headers::new();
        headers.add("Host", "example.com").add("X-A", "1");

        assert_eq!(headers.remove("Host"), Some("example.com".to_string()));
        assert_eq!(headers.remove("Host"), None);
        assert_eq!(headers.remove("X-A"), Some("1".to_string()));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_write_order() {
        let mut headers = Headers::new();
        headers.add("X-B", "2").add("Host", "h").add("X-A", "1").add("Accept", "*/*");

        let mut dst = BytesMut::new();
        headers.write_to(&mut dst);
        assert_eq!(&dst[..], b"Accept: */*\r\nHost: h\r\nX-A: 1\r\nX-B: 2\r\n");
        assert_eq!(dst.len(), headers.encoded_len());
    }

    #[test]
    fn test_table_round_trip() {
        for name in HeaderFieldName::ALL {
            assert_eq!(HeaderFieldName::from_canonical(name.as_str()), Some(*name));
        }
    }
}
