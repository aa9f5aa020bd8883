use axum::extract::State;
use axum::Json;

use crate::error::AppResult;
use crate::middleware::AuthenticatedUser;
use crate::models::Profile;
use crate::services::UpdateProfileInput;

use super::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Profile>> {
    let profile = state.profiles.get(&user.uid).await?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<Json<Profile>> {
    let profile = state.profiles.update(&user.uid, input).await?;
    Ok(Json(profile))
}
