use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::error::AppResult;
use crate::middleware::AuthenticatedUser;
use crate::services::ai_service::AiUsage;
use crate::services::GenerateDescriptionInput;

use super::AppState;

pub async fn generate_description(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<GenerateDescriptionInput>,
) -> AppResult<Json<serde_json::Value>> {
    let generated = state.ai.generate_description(&user.uid, input).await?;
    Ok(Json(json!({
        "description": generated.description,
        "remaining": generated.remaining,
    })))
}

pub async fn usage(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<AiUsage>> {
    let usage = state.ai.usage(&user.uid).await?;
    Ok(Json(usage))
}
