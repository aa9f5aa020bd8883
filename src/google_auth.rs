use std::collections::HashMap;
use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Google JWKS endpoint
const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Google OAuth endpoints for the server-side code flow
const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Allowed issuers for Google ID tokens
const ALLOWED_ISSUERS: &[&str] = &["accounts.google.com", "https://accounts.google.com"];

/// Cache TTL in seconds (1 hour)
const JWKS_CACHE_TTL_SECS: u64 = 3600;

/// Claims extracted from a verified Google ID token
#[derive(Debug, Clone)]
pub struct GoogleClaims {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GoogleIdTokenClaims {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
    aud: String,
    iss: String,
    exp: u64,
    iat: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: Option<String>,
}

/// JWKS key from Google
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct JwkKey {
    kid: String,
    n: String,
    e: String,
    kty: String,
    alg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JwkKey>,
}

struct JwksCache {
    keys: HashMap<String, JwkKey>,
    fetched_at: std::time::Instant,
}

/// Server-side Google OAuth client: builds the authorize URL, exchanges the
/// callback code for tokens, and verifies ID tokens against cached JWKS.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    cache: Arc<RwLock<Option<JwksCache>>>,
}

impl GoogleOAuthClient {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client: Client::new(),
            client_id: client_id.trim().to_string(),
            client_secret: client_secret.trim().to_string(),
            redirect_uri: redirect_uri.trim().to_string(),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// URL of Google's consent page for this client.
    pub fn authorize_url(&self) -> String {
        build_authorize_url(GOOGLE_AUTHORIZE_URL, &self.client_id, &self.redirect_uri)
    }

    /// Exchange an authorization code for a verified identity.
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleClaims, String> {
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| format!("Token exchange request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Token exchange failed: {} {}", status, body));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| format!("Token exchange response parse failed: {}", e))?;

        let id_token = tokens
            .id_token
            .ok_or("No ID token received from Google")?;

        self.verify(&id_token).await
    }

    /// Verify a Google ID token and return the claims
    pub async fn verify(&self, id_token: &str) -> Result<GoogleClaims, String> {
        // Decode header to get kid
        let header = decode_header(id_token).map_err(|e| format!("Invalid token header: {}", e))?;
        let kid = header.kid.ok_or("Token missing kid header")?;

        // Get the matching key from JWKS
        let decoding_key = self.get_decoding_key(&kid).await?;

        // Validate the token
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.client_id]);
        validation.set_issuer(ALLOWED_ISSUERS);

        let token_data = decode::<GoogleIdTokenClaims>(id_token, &decoding_key, &validation)
            .map_err(|e| format!("Token validation failed: {}", e))?;

        let claims = token_data.claims;

        // Ensure email is present and verified
        let email = claims.email.ok_or("Token missing email claim")?;
        if claims.email_verified != Some(true) {
            return Err("Email not verified".to_string());
        }

        Ok(GoogleClaims {
            sub: claims.sub,
            email,
            name: claims.name,
            picture: claims.picture,
        })
    }

    async fn get_decoding_key(&self, kid: &str) -> Result<DecodingKey, String> {
        // Check cache first
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.fetched_at.elapsed().as_secs() < JWKS_CACHE_TTL_SECS {
                    if let Some(key) = cached.keys.get(kid) {
                        return Self::jwk_to_decoding_key(key);
                    }
                }
            }
        }

        // Fetch fresh JWKS
        let response = self
            .client
            .get(GOOGLE_JWKS_URL)
            .send()
            .await
            .map_err(|e| format!("Failed to fetch JWKS: {}", e))?;

        let jwks: JwksResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse JWKS: {}", e))?;

        let mut keys = HashMap::new();
        for key in jwks.keys {
            keys.insert(key.kid.clone(), key);
        }

        let decoding_key = keys
            .get(kid)
            .ok_or_else(|| format!("Key with kid '{}' not found in JWKS", kid))
            .and_then(Self::jwk_to_decoding_key)?;

        // Update cache
        {
            let mut cache = self.cache.write().await;
            *cache = Some(JwksCache {
                keys,
                fetched_at: std::time::Instant::now(),
            });
        }

        Ok(decoding_key)
    }

    fn jwk_to_decoding_key(key: &JwkKey) -> Result<DecodingKey, String> {
        if key.kty != "RSA" {
            return Err(format!("Unsupported key type: {}", key.kty));
        }
        DecodingKey::from_rsa_components(&key.n, &key.e)
            .map_err(|e| format!("Failed to create decoding key: {}", e))
    }
}

fn build_authorize_url(base: &str, client_id: &str, redirect_uri: &str) -> String {
    let scope = "https://www.googleapis.com/auth/userinfo.profile \
                 https://www.googleapis.com/auth/userinfo.email";
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&access_type=offline&prompt={}",
        base,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(scope),
        urlencoding::encode("consent select_account"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_client_redirect_and_scopes() {
        let url = build_authorize_url(
            GOOGLE_AUTHORIZE_URL,
            "client-1",
            "http://localhost:8080/auth/callback",
        );
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fauth%2Fcallback"));
        assert!(url.contains("userinfo.email"));
        assert!(url.contains("prompt=consent%20select_account"));
    }
}
