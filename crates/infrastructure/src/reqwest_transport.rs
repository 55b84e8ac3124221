use std::time::Duration;

use async_trait::async_trait;
use kkvat_application::{ApiRequest, ApiResponse, HttpTransport};
use kkvat_core::{AppError, AppResult};
use url::Url;

/// `HttpTransport` adapter backed by a shared `reqwest::Client`.
///
/// Any HTTP status is returned as a response; only a request that produced
/// no response (connect failure, timeout, broken body) is an error.
#[derive(Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Creates a transport with its own client and request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build http client: {error}")))?;
        Self::with_client(http_client, base_url)
    }

    /// Creates a transport around an existing client.
    pub fn with_client(http_client: reqwest::Client, base_url: &str) -> AppResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(base_url).map_err(|error| {
            AppError::Validation(format!("invalid api base url '{base_url}': {error}"))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "api base url '{base_url}' cannot carry paths"
            )));
        }

        Ok(Self {
            http_client,
            base_url: base_url.to_owned(),
        })
    }

    /// Returns the base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn url_for(&self, path: &str) -> AppResult<Url> {
        let joined = if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        };
        Url::parse(&joined)
            .map_err(|error| AppError::Validation(format!("invalid request path '{path}': {error}")))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> AppResult<ApiResponse> {
        let mut url = self.url_for(&request.path)?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        let method = request.method.clone();
        let path = request.path.clone();

        let mut builder = self
            .http_client
            .request(request.method, url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|error| {
            AppError::Unavailable(format!("{method} {path} failed: {error}"))
        })?;
        let status = response.status();
        let body = response.bytes().await.map_err(|error| {
            AppError::Unavailable(format!("{method} {path} body could not be read: {error}"))
        })?;

        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }
}
