use serde::Deserialize;
use serde_json::{Value, json};

use kkvat_core::{AppError, AppResult, BearerToken, NonEmptyString, SessionUser};
use kkvat_domain::{MenuItem, MenuNode, build_menu_tree};

use crate::api_gateway::{ApiGateway, LOGIN_PATH, server_supplied_message};
use crate::list_envelope::decode_rows;

const LOGOUT_PATH: &str = "/api/auth/logout";
const INVALID_CREDENTIALS: &str = "Invalid username or password";
const SERVER_UNREACHABLE: &str =
    "Unable to reach the server. Check that the backend is running and the base URL is correct.";

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// Signed-in user, when the backend returned one.
    pub user: Option<SessionUser>,
    /// Navigation menus granted to the user.
    pub menus: Vec<MenuItem>,
    /// Server session identifier, informational only.
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<SessionUser>,
    #[serde(default)]
    session_id: Option<Value>,
    #[serde(default)]
    menus: Option<Value>,
}

/// Application service for signing in and out.
#[derive(Clone)]
pub struct AuthService {
    gateway: ApiGateway,
}

impl AuthService {
    /// Creates a new service from the shared gateway.
    #[must_use]
    pub fn new(gateway: ApiGateway) -> Self {
        Self { gateway }
    }

    /// Exchanges credentials for a session and loads the navigation tree.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<LoginOutcome> {
        let username = NonEmptyString::new(username.trim())
            .map_err(|_| AppError::Validation("username is required".to_owned()))?;
        if password.is_empty() {
            return Err(AppError::Validation("password is required".to_owned()));
        }

        let response: LoginResponse = self
            .gateway
            .post_json(
                LOGIN_PATH,
                &json!({ "username": username.as_str(), "password": password }),
            )
            .await
            .map_err(login_error)?;

        let access_token = response
            .access_token
            .and_then(BearerToken::new)
            .ok_or_else(|| {
                AppError::UnexpectedPayload("login response carried no access token".to_owned())
            })?;
        let mut menus = response
            .menus
            .map(decode_rows::<MenuItem>)
            .unwrap_or_default();
        let session_id = response.session_id.and_then(|value| match value {
            Value::String(text) => Some(text),
            Value::Null => None,
            other => Some(other.to_string()),
        });

        self.gateway
            .session()
            .establish(access_token, response.user.clone(), menus.clone())
            .await?;
        tracing::info!(username = username.as_str(), "signed in");

        if let Some(user_id) = response.user.as_ref().and_then(|user| user.id) {
            match self.fetch_user_menus(user_id).await {
                Ok(refreshed) => {
                    self.gateway.session().replace_menus(refreshed.clone()).await?;
                    menus = refreshed;
                }
                Err(error) => {
                    tracing::warn!(user_id, error = %error, "keeping login menus after menu refresh failed");
                }
            }
        }

        Ok(LoginOutcome {
            user: response.user,
            menus,
            session_id,
        })
    }

    /// Ends the server session when possible and always clears local state.
    pub async fn logout(&self) -> AppResult<()> {
        if self.gateway.session().access_token().await.is_some() {
            let result: AppResult<Value> = self.gateway.post_json(LOGOUT_PATH, &json!({})).await;
            if let Err(error) = result {
                tracing::debug!(error = %error, "server logout failed, clearing local session anyway");
            }
        }

        self.gateway.session().clear().await?;
        tracing::info!("signed out");
        Ok(())
    }

    /// Returns whether a token is held.
    pub async fn is_logged_in(&self) -> bool {
        self.gateway.session().access_token().await.is_some()
    }

    /// Returns the signed-in user.
    pub async fn current_user(&self) -> Option<SessionUser> {
        self.gateway.session().user().await
    }

    /// Returns the granted menus, from memory first and the store second.
    pub async fn current_menus(&self) -> AppResult<Vec<MenuItem>> {
        self.gateway.session().menus().await
    }

    /// Returns the granted menus arranged as a tree.
    pub async fn menu_tree(&self) -> AppResult<Vec<MenuNode>> {
        Ok(build_menu_tree(&self.current_menus().await?))
    }

    async fn fetch_user_menus(&self, user_id: i64) -> AppResult<Vec<MenuItem>> {
        let payload: Value = self
            .gateway
            .get_json(&format!("/api/menu-items/user/{user_id}/hierarchical"), &[])
            .await?;
        Ok(decode_rows(payload))
    }
}

fn login_error(error: AppError) -> AppError {
    match error {
        AppError::Unauthorized(_) => AppError::Unauthorized(INVALID_CREDENTIALS.to_owned()),
        AppError::Unavailable(_) => AppError::Unavailable(SERVER_UNREACHABLE.to_owned()),
        AppError::Validation(message) => AppError::Validation(message),
        AppError::Forbidden(message) => AppError::Forbidden(message),
        other => {
            tracing::warn!(error = %other, "login failed");
            let message = server_supplied_message(&other).unwrap_or("Login failed");
            AppError::Internal(message.to_owned())
        }
    }
}

#[cfg(test)]
mod tests;
