//! Cookie values and the cookie jar carried by requests and responses.
//!
//! [`Cookie::parse`] reads the text after `Set-Cookie: `. Attributes are recognised
//! by their first character only (`e` Expires, `sa` SameSite, `se` Secure, `d` Domain,
//! `p` Path, `h` HttpOnly, `m` Max-Age), so a custom attribute such as `Expiry=x` is
//! read as `Expires`. Anything starting with another letter is kept verbatim in an
//! unknown-attribute map. `HttpOnly` is recognised and dropped.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::ensure;
use crate::protocol::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }

    /// Only the first letter decides: `S` is strict, `L` is lax, anything else is none.
    fn from_first_letter(value: &str) -> Self {
        match value.as_bytes().first() {
            Some(b'S') => SameSite::Strict,
            Some(b'L') => SameSite::Lax,
            _ => SameSite::None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    domain: Option<String>,
    path: Option<String>,
    expires: Option<String>,
    max_age: Option<String>,
    same_site: Option<SameSite>,
    secure: bool,
    unknown: BTreeMap<String, String>,
}

impl Cookie {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self { name: name.into(), value: value.into(), ..Self::default() }
    }

    /// Parses `name=value (; attr[=value])*`.
    ///
    /// # Errors
    ///
    /// [`ParseError::MalformedCookie`] when the name is empty, when no `=` follows
    /// the name, when `Expires`, `Domain`, `Path`, `Max-Age` or `SameSite` has an
    /// empty value, or when an `s` attribute is neither `SameSite` nor `Secure`.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let malformed = || ParseError::malformed_cookie(raw);

        let input = raw.trim_start_matches(' ');
        let eq = input.find('=').ok_or_else(malformed)?;
        let name = &input[..eq];
        ensure!(!name.is_empty(), malformed());

        let mut segments = input[eq + 1..].split(';');
        let value = segments.next().unwrap_or_default();
        let mut cookie = Cookie::new(name, value);

        for segment in segments {
            let attr = segment.trim_start_matches(' ');
            let Some(&first) = attr.as_bytes().first() else {
                continue;
            };

            match first {
                b'e' | b'E' => cookie.expires = Some(required_value(attr).ok_or_else(malformed)?),
                b's' | b'S' => match attr.as_bytes().get(1) {
                    Some(b'a') => {
                        let value = required_value(attr).ok_or_else(malformed)?;
                        cookie.same_site = Some(SameSite::from_first_letter(&value));
                    }
                    Some(b'e') => cookie.secure = true,
                    _ => return Err(malformed()),
                },
                b'd' | b'D' => cookie.domain = Some(required_value(attr).ok_or_else(malformed)?),
                b'p' | b'P' => cookie.path = Some(required_value(attr).ok_or_else(malformed)?),
                b'h' | b'H' => {}
                b'm' | b'M' => cookie.max_age = Some(required_value(attr).ok_or_else(malformed)?),
                _ => {
                    let (key, value) = attr.split_once('=').unwrap_or((attr, ""));
                    cookie.unknown.insert(key.to_owned(), value.to_owned());
                }
            }
        }

        Ok(cookie)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn expires(&self) -> Option<&str> {
        self.expires.as_deref()
    }

    pub fn max_age(&self) -> Option<&str> {
        self.max_age.as_deref()
    }

    pub fn same_site(&self) -> Option<SameSite> {
        self.same_site
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn unknown_attribute(&self, key: &str) -> Option<&str> {
        self.unknown.get(key).map(String::as_str)
    }

    pub fn set_value<V: Into<String>>(&mut self, value: V) -> &mut Self {
        self.value = value.into();
        self
    }

    pub fn with_domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_expires<S: Into<String>>(mut self, expires: S) -> Self {
        self.expires = Some(expires.into());
        self
    }

    pub fn with_max_age<S: Into<String>>(mut self, max_age: S) -> Self {
        self.max_age = Some(max_age.into());
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }
}

/// The text after the first `=` of an attribute, if there is any.
fn required_value(attr: &str) -> Option<String> {
    match attr.split_once('=') {
        Some((_, value)) if !value.is_empty() => Some(value.to_owned()),
        _ => None,
    }
}

impl FromStr for Cookie {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cookie::parse(s)
    }
}

/// Writes the `Set-Cookie` form: `name=value; Domain=..; Path=..; Expires=..; Max-Age=..; SameSite=..; Secure`
/// followed by unknown attributes.
impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={domain}")?;
        }
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(expires) = &self.expires {
            write!(f, "; Expires={expires}")?;
        }
        if let Some(max_age) = &self.max_age {
            write!(f, "; Max-Age={max_age}")?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site.as_str())?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        for (key, value) in &self.unknown {
            write!(f, "; {key}={value}")?;
        }
        Ok(())
    }
}

/// A jar of cookies keyed by name. Adding a cookie whose name is already present replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookies {
    jar: BTreeMap<String, Cookie>,
}

impl Cookies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, cookie: Cookie) -> &mut Self {
        self.jar.insert(cookie.name.clone(), cookie);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.jar.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Cookie> {
        self.jar.remove(name)
    }

    /// Copies every cookie of `other` into this jar, replacing same-named entries.
    pub fn merge(&mut self, other: &Cookies) -> &mut Self {
        for cookie in other.jar.values() {
            self.add(cookie.clone());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.jar.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jar.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.jar.values()
    }

    /// Splits the value of a request `Cookie` header (`a=1; b=2`) into the jar.
    pub fn add_request_header(&mut self, value: &str) -> Result<(), ParseError> {
        for pair in value.split(';').map(|pair| pair.trim_start_matches(' ')) {
            if pair.is_empty() {
                continue;
            }
            let (name, value) = pair.split_once('=').ok_or_else(|| ParseError::malformed_cookie(pair))?;
            ensure!(!name.is_empty(), ParseError::malformed_cookie(pair));
            self.add(Cookie::new(name, value));
        }
        Ok(())
    }

    /// One `Set-Cookie: ...\r\n` line per cookie.
    pub fn set_cookie_lines(&self) -> String {
        let mut lines = String::new();
        for cookie in self.jar.values() {
            lines.push_str("Set-Cookie: ");
            lines.push_str(&cookie.to_string());
            lines.push_str("\r\n");
        }
        lines
    }

    /// The request header line `Cookie: a=1; b=2\r\n`, or an empty string for an empty jar.
    pub fn cookie_header(&self) -> String {
        if self.jar.is_empty() {
            return String::new();
        }
        let pairs: Vec<String> = self.jar.values().map(|c| format!("{}={}", c.name, c.value)).collect();
        format!("Cookie: {}\r\n", pairs.join("; "))
    }
}

impl Extend<Cookie> for Cookies {
    fn extend<T: IntoIterator<Item = Cookie>>(&mut self, iter: T) {
        for cookie in iter {
            self.add(cookie);
        }
    }
}

impl FromIterator<Cookie> for Cookies {
    fn from_iter<T: IntoIterator<Item = Cookie>>(iter: T) -> Self {
        let mut cookies = Cookies::new();
        cookies.extend(iter);
        cookies
    }
}
