use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse, Redirect};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::error::AppResult;
use crate::middleware::{AuthenticatedUser, SESSION_COOKIE};

use super::AppState;

/// Kicks off the Google OAuth code flow. Without OAuth credentials the
/// frontend gets a `config_error` status instead of a server error.
pub async fn google_login(State(state): State<AppState>) -> AppResult<Redirect> {
    if !state.auth.is_configured() {
        return Ok(Redirect::temporary(&format!(
            "{}/?auth=config_error",
            state.frontend_origin
        )));
    }
    let url = state.auth.authorize_url()?;
    Ok(Redirect::temporary(&url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Lands here after the Google consent screen. On success sets the session
/// cookie and bounces back to the frontend; every failure mode also bounces
/// back, with a status the frontend can show.
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> impl IntoResponse {
    let origin = state.frontend_origin.clone();

    if !state.auth.is_configured() {
        return Redirect::temporary(&format!("{origin}/?auth=config_error")).into_response();
    }
    if query.error.is_some() {
        return Redirect::temporary(&format!("{origin}/?auth=cancelled")).into_response();
    }
    let Some(code) = query.code else {
        return Redirect::temporary(&format!("{origin}/?auth=error")).into_response();
    };

    match state.auth.login_with_code(&code).await {
        Ok((claims, token)) => {
            let cookie = format!(
                "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age=86400"
            );
            tracing::info!(user = %claims.sub, "login succeeded");
            (
                AppendHeaders([(SET_COOKIE, cookie)]),
                Redirect::temporary(&format!("{origin}/?auth=success")),
            )
                .into_response()
        }
        Err(err) => {
            tracing::warn!(error = %err, "login failed");
            Redirect::temporary(&format!("{origin}/?auth=error")).into_response()
        }
    }
}

/// Clears the session cookie.
pub async fn logout() -> impl IntoResponse {
    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(json!({ "success": true })),
    )
}

/// Returns the identity behind the current session.
pub async fn me(user: AuthenticatedUser) -> Json<serde_json::Value> {
    Json(json!({
        "uid": user.uid,
        "email": user.email,
        "name": user.name,
        "picture": user.picture,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::AuthState;
    use crate::services::{
        AiService, ApplicationWorkflow, AuthService, ItemStore, MessageService, Notifier,
        ProfileService,
    };
    use axum::http::StatusCode;
    use sqlx::postgres::PgPoolOptions;

    fn state_without_oauth() -> AppState {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let notifier = Notifier::new(None, "admin@example.com".to_string());
        AppState {
            items: ItemStore::new(pool.clone()),
            applications: ApplicationWorkflow::new(pool.clone()),
            messages: MessageService::new(
                pool.clone(),
                notifier.clone(),
                "admin@example.com".to_string(),
            ),
            profiles: ProfileService::new(pool.clone()),
            ai: AiService::new(pool.clone(), None),
            auth: AuthService::new(pool, None, "secret".to_string()),
            auth_state: AuthState {
                session_secret: "secret".to_string(),
            },
            notifier,
            storage: None,
            frontend_origin: "http://localhost:3000".to_string(),
        }
    }

    #[tokio::test]
    async fn login_redirects_to_config_error_without_oauth() {
        let response = google_login(State(state_without_oauth()))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = response.headers().get("location").unwrap().to_str().unwrap();
        assert_eq!(location, "http://localhost:3000/?auth=config_error");
    }

    #[tokio::test]
    async fn callback_redirects_to_config_error_without_oauth() {
        let query = CallbackQuery {
            code: Some("unused".to_string()),
            error: None,
        };
        let response = google_callback(State(state_without_oauth()), Query(query))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = response.headers().get("location").unwrap().to_str().unwrap();
        assert_eq!(location, "http://localhost:3000/?auth=config_error");
    }
}
