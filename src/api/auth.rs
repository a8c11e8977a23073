//! Bearer-token check for the attendance trigger endpoints.

use crate::errors::{Error, Result};
use axum::http::{HeaderMap, header::AUTHORIZATION};

/// Checks `Authorization: Bearer <token>` against the configured token.
///
/// A missing configuration is a server fault ([`Error::MissingApiToken`]),
/// reported before the request's credentials are looked at.
pub fn authorize(headers: &HeaderMap, expected: Option<&str>) -> Result<()> {
    let expected = expected
        .filter(|t| !t.is_empty())
        .ok_or(Error::MissingApiToken)?;

    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => Ok(()),
        _ => Err(Error::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_missing_configuration_wins() {
        let result = authorize(&headers("Bearer secret"), None);
        assert!(matches!(result, Err(Error::MissingApiToken)));
        let result = authorize(&headers("Bearer "), Some(""));
        assert!(matches!(result, Err(Error::MissingApiToken)));
    }

    #[test]
    fn test_bearer_token() {
        assert!(authorize(&headers("Bearer secret"), Some("secret")).is_ok());
        assert!(matches!(
            authorize(&headers("Bearer wrong"), Some("secret")),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            authorize(&headers("secret"), Some("secret")),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            authorize(&headers("bearer secret"), Some("secret")),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            authorize(&HeaderMap::new(), Some("secret")),
            Err(Error::Unauthorized)
        ));
    }
}
