use http::Version;

use crate::protocol::ParseError;

/// Parses the `HTTP/x.y` token of a request or status line.
pub(crate) fn parse_version(token: &str) -> Result<Version, ParseError> {
    match token {
        "HTTP/1.1" => Ok(Version::HTTP_11),
        "HTTP/1.0" => Ok(Version::HTTP_10),
        "HTTP/0.9" => Ok(Version::HTTP_09),
        _ => Err(ParseError::invalid_version(token)),
    }
}

pub(crate) fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("HTTP/1.0").unwrap(), Version::HTTP_10);
        assert_eq!(version_str(parse_version("HTTP/1.1").unwrap()), "HTTP/1.1");
        assert!(matches!(parse_version("HTTP/2"), Err(ParseError::InvalidVersion(_))));
        assert!(parse_version("http/1.1").is_err());
    }
}
