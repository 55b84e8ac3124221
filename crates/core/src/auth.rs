use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};

/// Bearer token issued by the backend login endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wraps a raw access token. Blank values are rejected.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_owned()))
    }

    /// Returns the raw token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the `Authorization` header value for this token.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl Debug for BearerToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("BearerToken(<redacted>)")
    }
}

/// User information returned by the login endpoint and cached in the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionUser {
    /// Backend user identifier.
    pub id: Option<i64>,
    /// Login name.
    pub username: String,
    /// Email address, if the backend returned one.
    pub email: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Role name assigned to the user.
    pub role: Option<String>,
}

impl SessionUser {
    /// Returns a human-friendly name for the current user.
    #[must_use]
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            self.username.clone()
        } else {
            parts.join(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BearerToken, SessionUser};

    #[test]
    fn blank_token_is_rejected() {
        assert!(BearerToken::new("   ").is_none());
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = BearerToken::new("secret-value");
        assert!(!format!("{token:?}").contains("secret-value"));
        assert_eq!(
            token.map(|token| token.header_value()),
            Some("Bearer secret-value".to_owned())
        );
    }

    #[test]
    fn session_user_tolerates_partial_payloads() {
        let user: Result<SessionUser, _> =
            serde_json::from_str(r#"{"id":7,"username":"admin","firstName":"Ada"}"#);
        let user = user.unwrap_or_default();
        assert_eq!(user.id, Some(7));
        assert_eq!(user.display_name(), "Ada");
    }
}
