use std::path::PathBuf;

use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use kkvat_core::{AppResult, BearerToken, SessionUser};
use kkvat_domain::MenuItem;

/// Outbound request as seen by the transport.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the API base URL, starting with `/api/`.
    pub path: String,
    /// Query parameters in insertion order.
    pub query: Vec<(String, String)>,
    /// Request headers. The gateway adds `Authorization` here.
    pub headers: HeaderMap,
    /// JSON body.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Creates a request without query, headers, or body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Appends one query parameter.
    #[must_use]
    pub fn with_query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_owned(), value.to_string()));
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Raw response returned by the transport for any status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Creates a response with a JSON body.
    #[must_use]
    pub fn json(status: StatusCode, body: &Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
        }
    }
}

/// Port for sending HTTP requests to the backend.
///
/// Implementations return `Ok` for every response that arrived, whatever its
/// status, and `AppError::Unavailable` when no response was received.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends one request.
    async fn send(&self, request: ApiRequest) -> AppResult<ApiResponse>;
}

/// Session state that survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedSession {
    /// Access token issued at login.
    pub access_token: Option<BearerToken>,
    /// Signed-in user.
    pub user: Option<SessionUser>,
    /// Navigation menus granted to the user.
    pub menus: Vec<MenuItem>,
}

/// Port for persisting the session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the stored session, empty when nothing was stored.
    async fn load(&self) -> AppResult<PersistedSession>;

    /// Replaces the stored session.
    async fn save(&self, session: &PersistedSession) -> AppResult<()>;

    /// Removes every stored key.
    async fn clear(&self) -> AppResult<()>;
}

/// Port receiving downloaded report files.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Stores `bytes` under `file_name` and returns where they were written.
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<PathBuf>;
}
