//! Bearer token extraction (RFC 6750 header form).
//!
//! Both gates parse the `Authorization` header through [`extract_bearer_token`]
//! so they share one grammar and one failure class. Accepted form is
//! exactly `Bearer <token>`: the scheme, a single space, then a non-empty
//! token without whitespace.

use axum::http::{HeaderMap, header};

use super::error::AuthError;

const BEARER_PREFIX: &str = "Bearer ";

/// Parse a raw `Authorization` header value.
pub fn parse_bearer(value: &str) -> Result<&str, AuthError> {
    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::MalformedCredential("missing Bearer scheme"))?;

    if token.is_empty() {
        return Err(AuthError::MalformedCredential("empty bearer token"));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(AuthError::MalformedCredential(
            "unexpected whitespace in bearer token",
        ));
    }
    Ok(token)
}

/// Pull the bearer token out of request headers.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MalformedCredential("missing Authorization header"))?
        .to_str()
        .map_err(|_| AuthError::MalformedCredential("non-ASCII Authorization header"))?;
    parse_bearer(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_valid_bearer() {
        assert_eq!(parse_bearer("Bearer abc123").unwrap(), "abc123");
    }

    #[test]
    fn test_base64_token_with_padding() {
        let token = "q83vEjRWeJq83vEjRWeJq83vEjRWeJq83vEjRWeJ-_0=";
        assert_eq!(parse_bearer(&format!("Bearer {}", token)).unwrap(), token);
    }

    #[test]
    fn test_no_scheme_is_malformed() {
        assert!(matches!(
            parse_bearer("abc123"),
            Err(AuthError::MalformedCredential(_))
        ));
    }

    #[test]
    fn test_double_space_is_malformed() {
        assert!(matches!(
            parse_bearer("Bearer  abc123"),
            Err(AuthError::MalformedCredential(_))
        ));
    }

    #[test]
    fn test_other_whitespace_is_malformed() {
        for value in [
            "Bearer\tabc123",
            "Bearer abc 123",
            "Bearer abc123 ",
            " Bearer abc123",
            "Bearer",
            "Bearer ",
            "bearer abc123",
            "Basic abc123",
        ] {
            assert!(
                matches!(parse_bearer(value), Err(AuthError::MalformedCredential(_))),
                "{:?} should be malformed",
                value
            );
        }
    }

    #[test]
    fn test_missing_header_is_malformed() {
        let headers = HeaderMap::new();
        assert!(matches!(
            extract_bearer_token(&headers),
            Err(AuthError::MalformedCredential(_))
        ));
    }

    #[test]
    fn test_empty_header_is_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(""));
        assert!(matches!(
            extract_bearer_token(&headers),
            Err(AuthError::MalformedCredential(_))
        ));
    }

    #[test]
    fn test_extract_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer tok_123"),
        );
        assert_eq!(extract_bearer_token(&headers).unwrap(), "tok_123");
    }
}
