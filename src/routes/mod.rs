pub mod ai;
pub mod auth;
pub mod items;
pub mod messages;
pub mod profile;
pub mod upload;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::middleware::AuthState;
use crate::services::{
    AiService, ApplicationWorkflow, AuthService, ItemStore, MessageService, Notifier,
    ProfileService,
};
use crate::storage::StorageBackend;

/// Everything the handlers need, constructed once at startup and passed
/// explicitly. No module-level singletons.
#[derive(Clone)]
pub struct AppState {
    pub items: ItemStore,
    pub applications: ApplicationWorkflow,
    pub messages: MessageService,
    pub profiles: ProfileService,
    pub ai: AiService,
    pub auth: AuthService,
    pub auth_state: AuthState,
    pub notifier: Notifier,
    pub storage: Option<Arc<dyn StorageBackend>>,
    pub frontend_origin: String,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth_state.clone()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/google", get(auth::google_login))
        .route("/auth/callback", get(auth::google_callback))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/api/items", get(items::list_items).post(items::create_item))
        .route(
            "/api/items/{id}",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        .route(
            "/api/items/{id}/apply",
            post(items::apply).delete(items::cancel_application),
        )
        .route("/api/items/{id}/applications", get(items::list_applications))
        .route("/api/items/{id}/my-application", get(items::my_application))
        .route("/api/profile", get(profile::get_profile).put(profile::update_profile))
        .route(
            "/api/messages/conversations",
            get(messages::list_conversations).post(messages::create_conversation),
        )
        .route(
            "/api/messages/conversations/{id}",
            get(messages::get_conversation),
        )
        .route(
            "/api/messages/conversations/{id}/messages",
            post(messages::send_message),
        )
        .route("/api/messages/unread-count", get(messages::unread_count))
        .route("/api/messages/contact-admin", post(messages::contact_admin))
        .route("/api/messages/report", post(messages::report))
        .route("/upload", post(upload::upload_image))
        .route("/api/ai/generate-description", post(ai::generate_description))
        .route("/api/ai/usage", get(ai::usage))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
