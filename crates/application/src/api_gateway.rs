use std::sync::Arc;

use http::header::{AUTHORIZATION, HeaderValue};
use http::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use kkvat_core::{AppError, AppResult};

use crate::gateway_ports::{ApiRequest, ApiResponse, HttpTransport};
use crate::session_context::SessionContext;

/// Path of the credential exchange endpoint; it never carries a bearer token.
pub const LOGIN_PATH: &str = "/api/auth/login";

const MAX_PLAIN_ERROR_LEN: usize = 300;

/// Single choke point for backend calls.
///
/// Attaches the session token, logs the exchange, and maps non-success
/// statuses to `AppError` exactly once.
#[derive(Clone)]
pub struct ApiGateway {
    transport: Arc<dyn HttpTransport>,
    session: SessionContext,
}

impl ApiGateway {
    /// Creates a gateway over `transport` using `session` for credentials.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, session: SessionContext) -> Self {
        Self { transport, session }
    }

    /// Returns the session this gateway authenticates with.
    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Sends a request and returns the successful response.
    pub async fn send(&self, mut request: ApiRequest) -> AppResult<ApiResponse> {
        if !request.path.contains(LOGIN_PATH)
            && let Some(token) = self.session.access_token().await
        {
            let value = HeaderValue::from_str(&token.header_value()).map_err(|_| {
                AppError::Unauthorized("stored access token is not a valid header value".to_owned())
            })?;
            request.headers.insert(AUTHORIZATION, value);
        }

        let method = request.method.clone();
        let path = request.path.clone();
        tracing::debug!(%method, %path, "sending backend request");

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%method, %path, error = %error, "backend request failed");
                return Err(error);
            }
        };

        if response.status.is_success() {
            tracing::debug!(%method, %path, status = response.status.as_u16(), "backend request succeeded");
            return Ok(response);
        }

        tracing::warn!(%method, %path, status = response.status.as_u16(), "backend rejected request");
        Err(error_for_status(response.status, &response.body))
    }

    /// Sends a request and decodes the JSON body.
    pub async fn send_json<T>(&self, request: ApiRequest) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let path = request.path.clone();
        let response = self.send(request).await?;
        decode_body(&path, &response.body)
    }

    /// `GET` with query parameters, decoding JSON.
    pub async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let request = query.iter().fold(
            ApiRequest::new(Method::GET, path),
            |request, (name, value)| request.with_query(name, value),
        );
        self.send_json(request).await
    }

    /// `POST` a JSON body, decoding the JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::new(Method::POST, path).with_json(encode_body(path, body)?);
        self.send_json(request).await
    }

    /// `PUT` a JSON body, decoding the JSON response.
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::new(Method::PUT, path).with_json(encode_body(path, body)?);
        self.send_json(request).await
    }

    /// `DELETE`, ignoring any response body.
    pub async fn delete(&self, path: &str) -> AppResult<()> {
        self.send(ApiRequest::new(Method::DELETE, path)).await?;
        Ok(())
    }

    /// `GET` returning raw bytes.
    pub async fn get_bytes(&self, path: &str) -> AppResult<Vec<u8>> {
        Ok(self.send(ApiRequest::new(Method::GET, path)).await?.body)
    }
}

fn encode_body<B>(path: &str, body: &B) -> AppResult<Value>
where
    B: Serialize + ?Sized,
{
    serde_json::to_value(body)
        .map_err(|error| AppError::Internal(format!("failed to encode body for '{path}': {error}")))
}

fn decode_body<T>(path: &str, body: &[u8]) -> AppResult<T>
where
    T: DeserializeOwned,
{
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"null".as_slice()
    } else {
        body
    };

    serde_json::from_slice(body).map_err(|error| {
        AppError::UnexpectedPayload(format!("unexpected response from '{path}': {error}"))
    })
}

fn error_for_status(status: StatusCode, body: &[u8]) -> AppError {
    let message = server_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_owned()
    });

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AppError::Validation(message),
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        _ => AppError::Internal(format!("status {}: {message}", status.as_u16())),
    }
}

/// Returns the backend's own message carried by a status error, or `None`
/// when the error text is only the status reason.
pub(crate) fn server_supplied_message(error: &AppError) -> Option<&str> {
    let (status, message) = match error {
        AppError::Validation(message) => (StatusCode::BAD_REQUEST, message.as_str()),
        AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.as_str()),
        AppError::Forbidden(message) => (StatusCode::FORBIDDEN, message.as_str()),
        AppError::NotFound(message) => (StatusCode::NOT_FOUND, message.as_str()),
        AppError::Conflict(message) => (StatusCode::CONFLICT, message.as_str()),
        AppError::Internal(message) => {
            let (code, rest) = message.strip_prefix("status ")?.split_once(": ")?;
            let status = code.parse::<u16>().ok().and_then(|code| StatusCode::from_u16(code).ok())?;
            (status, rest)
        }
        AppError::Unavailable(_) | AppError::UnexpectedPayload(_) => return None,
    };

    let is_reason = message == "request failed" || status.canonical_reason() == Some(message);
    (!message.trim().is_empty() && !is_reason).then_some(message)
}

fn server_message(body: &[u8]) -> Option<String> {
    if let Ok(payload) = serde_json::from_slice::<Value>(body) {
        return ["message", "error"]
            .iter()
            .filter_map(|key| payload.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|message| !message.is_empty())
            .map(ToOwned::to_owned);
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    (!text.is_empty() && text.len() <= MAX_PLAIN_ERROR_LEN && !text.starts_with('<'))
        .then(|| text.to_owned())
}
