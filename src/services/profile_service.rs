use serde::Deserialize;
use sqlx::PgPool;

use crate::error::{AppError, AppResult, FieldViolation};
use crate::models::{Profile, UserModel};

const USER_COLUMNS: &str = "id, email, name, picture, display_name, display_picture";

/// Body of PUT /api/profile. Both fields optional; empty strings clear.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    pub display_name: Option<String>,
    pub display_picture: Option<String>,
}

#[derive(Clone)]
pub struct ProfileService {
    pool: PgPool,
}

impl ProfileService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: &str) -> AppResult<Profile> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user: Option<UserModel> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        user.map(UserModel::into_profile)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn update(&self, user_id: &str, input: UpdateProfileInput) -> AppResult<Profile> {
        if input.display_name.is_none() && input.display_picture.is_none() {
            return Err(AppError::BadRequest("No fields to update".to_string()));
        }
        if let Some(name) = &input.display_name {
            if name.chars().count() > 50 {
                return Err(AppError::Validation(vec![FieldViolation::new(
                    "displayName",
                    "displayName must be at most 50 characters",
                )]));
            }
        }

        // An empty string clears the field back to the anonymous default.
        let display_name = input.display_name.map(|s| {
            let trimmed = s.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        });
        let display_picture = input.display_picture.map(|s| {
            let trimmed = s.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        });

        let sql = format!(
            "UPDATE users SET \
             display_name = CASE WHEN $1 THEN $2 ELSE display_name END, \
             display_picture = CASE WHEN $3 THEN $4 ELSE display_picture END \
             WHERE id = $5 \
             RETURNING {}",
            USER_COLUMNS
        );
        let user: Option<UserModel> = sqlx::query_as(&sql)
            .bind(display_name.is_some())
            .bind(display_name.flatten())
            .bind(display_picture.is_some())
            .bind(display_picture.flatten())
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        user.map(UserModel::into_profile)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}
