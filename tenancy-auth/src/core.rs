// Authentication core.

use http::header::AUTHORIZATION;
use http::HeaderMap;
use tenancy_core::ServiceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret is not configured")]
    MissingSecret,

    #[error("invalid auth configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("JWT support is disabled (enable one of: jwt-aws-lc-rs, jwt-rust-crypto)")]
    Disabled,
}

impl AuthError {
    /// Token problems are the caller's; everything else is ours.
    pub fn into_service_error(self) -> ServiceError {
        match self {
            AuthError::InvalidToken(_) => ServiceError::not_authenticated(self.to_string()),
            other => ServiceError::general_error(other.to_string()),
        }
    }
}

/// Accepted `Authorization` schemes.
const SCHEMES: [&str; 2] = ["Bearer", "JWT"];

/// Token from `Authorization: Bearer <token>` (or `JWT <token>`).
///
/// `None` when the header is absent; `Some(Err)` when it is present but
/// unusable, so callers can tell an anonymous request from a broken one.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<Result<&str, AuthError>> {
    let raw = headers.get(AUTHORIZATION)?;
    let value = match raw.to_str() {
        Ok(v) => v.trim(),
        Err(_) => {
            return Some(Err(AuthError::InvalidToken(
                "authorization header is not valid ASCII".into(),
            )))
        }
    };

    let Some((scheme, token)) = value.split_once(' ') else {
        return Some(Err(AuthError::InvalidToken(
            "authorization header has no scheme".into(),
        )));
    };

    let token = token.trim();
    if !SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme.trim())) {
        return Some(Err(AuthError::InvalidToken(format!(
            "unsupported authorization scheme '{}'",
            scheme.trim()
        ))));
    }
    if token.is_empty() {
        return Some(Err(AuthError::InvalidToken("empty bearer token".into())));
    }
    Some(Ok(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn absent_header_is_anonymous() {
        assert!(extract_bearer_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn bearer_and_jwt_schemes() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc")).unwrap().unwrap(), "abc");
        assert_eq!(extract_bearer_token(&headers("jwt  abc ")).unwrap().unwrap(), "abc");
    }

    #[test]
    fn broken_headers_are_errors() {
        for value in ["Basic abc", "abc", "Bearer  "] {
            let map = headers(value);
            let res = extract_bearer_token(&map).unwrap();
            assert!(matches!(res, Err(AuthError::InvalidToken(_))), "{value}");
        }
    }

    #[test]
    fn token_errors_map_to_401() {
        assert_eq!(
            AuthError::InvalidToken("x".into()).into_service_error().code(),
            401
        );
        assert_eq!(AuthError::MissingSecret.into_service_error().code(), 500);
    }
}
