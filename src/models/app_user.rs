use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user row. The id is the Google `sub` claim, stored as opaque text.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserModel {
    pub id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub display_name: Option<String>,
    pub display_picture: Option<String>,
}

/// Profile payload returned by /api/profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
    pub display_name: Option<String>,
    pub display_picture: Option<String>,
}

impl UserModel {
    pub fn into_profile(self) -> Profile {
        Profile {
            id: self.id,
            name: self.name,
            email: self.email,
            picture: self.picture,
            display_name: self.display_name,
            display_picture: self.display_picture,
        }
    }

    /// The name shown to other users: the custom display name when set,
    /// otherwise an anonymous handle derived from the id.
    pub fn public_name(&self) -> String {
        match &self.display_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => anonymous_name(&self.id),
        }
    }
}

/// `ユーザー` + first 8 chars of the id, for users without a display name.
pub fn anonymous_name(user_id: &str) -> String {
    let prefix: String = user_id.chars().take(8).collect();
    format!("ユーザー{}", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_name_truncates_to_eight_chars() {
        assert_eq!(anonymous_name("1234567890abc"), "ユーザー12345678");
        assert_eq!(anonymous_name("short"), "ユーザーshort");
    }

    #[test]
    fn public_name_prefers_display_name() {
        let user = UserModel {
            id: "1234567890".to_string(),
            email: "a@example.com".to_string(),
            name: "Alice".to_string(),
            picture: None,
            display_name: Some("ふりま太郎".to_string()),
            display_picture: None,
        };
        assert_eq!(user.public_name(), "ふりま太郎");

        let anonymous = UserModel {
            display_name: None,
            ..user
        };
        assert_eq!(anonymous.public_name(), "ユーザー12345678");
    }
}
