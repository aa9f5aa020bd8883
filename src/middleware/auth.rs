use axum::extract::{FromRef, FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{DecodingKey, Validation};

use crate::error::AppError;
use crate::services::auth_service::SessionClaims;

/// Name of the session cookie set by /auth/callback.
pub const SESSION_COOKIE: &str = "session";

/// Authenticated user info resolved by the authorization gate. This is the
/// only identity the stores and workflows ever see; credential verification
/// happens here and nowhere else.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub uid: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

#[derive(Clone)]
pub struct AuthState {
    pub session_secret: String,
}

/// Extractor guarding the authenticated routes. Accepts the session token
/// from an `Authorization: Bearer` header or the `session` cookie; a
/// missing or invalid token rejects the request with 401 before any
/// handler logic runs.
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthState::from_ref(state);

        let token = bearer_token(&parts.headers)
            .or_else(|| cookie_value(&parts.headers, SESSION_COOKIE))
            .ok_or_else(|| AppError::Unauthorized("Please login.".to_string()))?;

        let claims = decode_session(&token, &auth.session_secret)
            .ok_or_else(|| AppError::Unauthorized("Please login.".to_string()))?;

        Ok(AuthenticatedUser {
            uid: claims.sub,
            email: claims.email,
            name: claims.name,
            picture: claims.picture,
        })
    }
}

/// Optional form for routes that serve both anonymous and logged-in
/// callers. A missing or invalid token yields `None` instead of a 401.
impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(
            <AuthenticatedUser as FromRequestParts<S>>::from_request_parts(parts, state)
                .await
                .ok(),
        )
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get("cookie")?.to_str().ok()?;
    parse_cookie(header, name)
}

pub fn decode_session(token: &str, secret: &str) -> Option<SessionClaims> {
    jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

fn parse_cookie(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::issue_session_token;

    #[test]
    fn cookie_parsing_picks_the_named_cookie() {
        let header = "theme=dark; session=abc.def.ghi; lang=ja";
        assert_eq!(
            parse_cookie(header, "session").as_deref(),
            Some("abc.def.ghi")
        );
        assert_eq!(parse_cookie(header, "missing"), None);
    }

    #[test]
    fn session_token_round_trips() {
        let token = issue_session_token(
            "google-sub-1",
            "alice@example.com",
            "Alice",
            Some("https://img/a.png"),
            "test-secret",
        )
        .unwrap();
        let claims = decode_session(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, "google-sub-1");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.name, "Alice");
        assert_eq!(claims.picture.as_deref(), Some("https://img/a.png"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_session_token("u", "u@example.com", "U", None, "secret-a").unwrap();
        assert!(decode_session(&token, "secret-b").is_none());
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer header-token".parse().unwrap());
        headers.insert("cookie", "session=cookie-token".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("header-token"));
        assert_eq!(
            cookie_value(&headers, SESSION_COOKIE).as_deref(),
            Some("cookie-token")
        );
    }
}
