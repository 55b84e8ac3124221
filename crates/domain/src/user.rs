use kkvat_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::flags::deserialize_lenient_bool;

fn default_active() -> bool {
    true
}

/// Back-office user as returned by `/api/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend identifier. Some payloads spell it `ID`.
    #[serde(alias = "ID")]
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
    /// Given name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Role name.
    #[serde(default)]
    pub role: Option<String>,
    /// Whether the account is enabled.
    #[serde(default = "default_active", deserialize_with = "deserialize_lenient_bool")]
    pub is_active: bool,
}

/// Create/update body for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
    /// Unique login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Plaintext password; omitted on updates that keep the current one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Role name.
    #[serde(default)]
    pub role: String,
    /// Whether the account is enabled.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl UserDraft {
    /// Validates fields the backend would otherwise reject.
    pub fn validate(&self) -> AppResult<()> {
        if self.username.trim().is_empty() {
            return Err(AppError::Validation("username is required".to_owned()));
        }

        if !self.email.contains('@') {
            return Err(AppError::Validation(format!(
                "'{}' is not a valid email address",
                self.email
            )));
        }

        Ok(())
    }
}

impl From<&User> for UserDraft {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone().unwrap_or_default(),
            password: None,
            first_name: user.first_name.clone().unwrap_or_default(),
            last_name: user.last_name.clone().unwrap_or_default(),
            role: user.role.clone().unwrap_or_default(),
            is_active: user.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{User, UserDraft};

    #[test]
    fn user_accepts_uppercase_id_alias() {
        let user = serde_json::from_str::<User>(r#"{"ID":4,"username":"bob","isActive":1}"#);
        assert!(matches!(user, Ok(User { id: 4, is_active: true, .. })));
    }

    #[test]
    fn draft_from_user_omits_password() {
        let user = User {
            id: 1,
            username: "ada".to_owned(),
            email: Some("ada@example.com".to_owned()),
            first_name: None,
            last_name: None,
            role: Some("ADMIN".to_owned()),
            is_active: true,
        };

        let body = serde_json::to_value(UserDraft::from(&user)).unwrap_or_default();
        assert!(body.get("password").is_none());
        assert_eq!(body["role"], "ADMIN");
    }

    #[test]
    fn draft_rejects_invalid_email() {
        let draft = UserDraft {
            username: "ada".to_owned(),
            email: "nope".to_owned(),
            password: Some("secret".to_owned()),
            first_name: String::new(),
            last_name: String::new(),
            role: String::new(),
            is_active: true,
        };

        assert!(draft.validate().is_err());
    }
}
