use axum::extract::{Multipart, State};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthenticatedUser;

use super::AppState;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Accepts a multipart form with a single `image` field and stores it under
/// a collision-free key. Responds with the public URL.
pub async fn upload_image(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<Json<serde_json::Value>> {
    let storage = state
        .storage
        .as_ref()
        .ok_or_else(|| AppError::Storage("Storage is not configured".to_string()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("image").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::BadRequest(
                "Only image uploads are allowed".to_string(),
            ));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
        if data.is_empty() {
            return Err(AppError::BadRequest("Empty file".to_string()));
        }
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::BadRequest(
                "File exceeds the 10MB upload limit".to_string(),
            ));
        }

        let key = format!("uploads/{}-{}", Uuid::new_v4(), sanitize(&file_name));
        let url = storage.upload(&key, &data, &content_type).await?;
        tracing::info!("Uploaded {} to bucket {}", key, storage.bucket());
        return Ok(Json(json!({ "url": url })));
    }

    Err(AppError::BadRequest(
        "Missing 'image' field in multipart body".to_string(),
    ))
}

/// Keeps keys URL-safe without encoding: anything outside a small
/// allow-list becomes an underscore.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::sanitize;

    #[test]
    fn sanitize_keeps_safe_names() {
        assert_eq!(sanitize("photo-1.jpg"), "photo-1.jpg");
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize("写真.jpg"), "__.jpg");
    }

    #[test]
    fn sanitize_handles_empty_input() {
        assert_eq!(sanitize(""), "image");
    }
}
