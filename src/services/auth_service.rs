use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::google_auth::{GoogleClaims, GoogleOAuthClient};

/// Claims carried by the session token issued after a successful OAuth login.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Session tokens expire after 24 hours; the SPA re-runs the OAuth flow.
pub fn issue_session_token(
    uid: &str,
    email: &str,
    name: &str,
    picture: Option<&str>,
    secret: &str,
) -> AppResult<String> {
    let now = Utc::now();
    let exp = now + chrono::Duration::hours(24);
    let claims = SessionClaims {
        sub: uid.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        picture: picture.map(|s| s.to_string()),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("JWT error: {}", e)))
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    oauth: Option<GoogleOAuthClient>,
    session_secret: String,
}

impl AuthService {
    pub fn new(pool: PgPool, oauth: Option<GoogleOAuthClient>, session_secret: String) -> Self {
        Self {
            pool,
            oauth,
            session_secret,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.oauth.is_some()
    }

    fn oauth(&self) -> AppResult<&GoogleOAuthClient> {
        self.oauth.as_ref().ok_or_else(|| {
            AppError::Internal(
                "Google authentication not configured (GOOGLE_CLIENT_ID not set)".to_string(),
            )
        })
    }

    pub fn authorize_url(&self) -> AppResult<String> {
        Ok(self.oauth()?.authorize_url())
    }

    /// Complete the OAuth callback: exchange the code, make sure a user row
    /// exists, and issue a session token. The user row is created once and
    /// never overwritten by later logins.
    pub async fn login_with_code(&self, code: &str) -> AppResult<(GoogleClaims, String)> {
        let claims = self
            .oauth()?
            .exchange_code(code)
            .await
            .map_err(AppError::Unauthorized)?;

        let inserted = sqlx::query(
            "INSERT INTO users (id, email, name, picture) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&claims.sub)
        .bind(&claims.email)
        .bind(claims.name.as_deref().unwrap_or("No Name"))
        .bind(claims.picture.as_deref())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            tracing::info!("New user created: {}", claims.email);
        }

        let token = issue_session_token(
            &claims.sub,
            &claims.email,
            claims.name.as_deref().unwrap_or("No Name"),
            claims.picture.as_deref(),
            &self.session_secret,
        )?;

        Ok((claims, token))
    }
}
