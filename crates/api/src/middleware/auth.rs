//! `AuthUser` extractor.
//!
//! Every video, annotation and inference route takes an [`AuthUser`]. A
//! request without a valid access token is turned away with 401 before the
//! handler body runs.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use dashlabel_core::error::CoreError;
use dashlabel_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// The caller, as identified by the `sub` claim of their access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: DbId,
}

/// Pull the token out of `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, CoreError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| CoreError::Unauthorized("Missing Authorization header".into()))?
        .to_str()
        .map_err(|_| CoreError::Unauthorized("Authorization header is not valid text".into()))?;

    match value.strip_prefix(BEARER_PREFIX).map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(CoreError::Unauthorized(
            "Expected 'Authorization: Bearer <token>'".into(),
        )),
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;

        let claims = validate_token(token, &state.config.jwt).map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            CoreError::Unauthorized("Invalid or expired token".into())
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn missing_header_is_unauthorized() {
        assert_matches!(
            bearer_token(&HeaderMap::new()),
            Err(CoreError::Unauthorized(_))
        );
    }

    #[test]
    fn wrong_scheme_or_empty_token_is_unauthorized() {
        assert_matches!(
            bearer_token(&headers("Basic dXNlcjpwdw==")),
            Err(CoreError::Unauthorized(_))
        );
        assert_matches!(bearer_token(&headers("Bearer ")), Err(CoreError::Unauthorized(_)));
    }
}
