use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;

use kkvat_core::{AppError, AppResult};

use crate::api_gateway::ApiGateway;
use crate::gateway_ports::{
    ApiRequest, ApiResponse, DownloadSink, HttpTransport, PersistedSession, SessionStore,
};
use crate::session_context::SessionContext;

enum Scripted {
    Respond(ApiResponse),
    Unreachable,
}

/// Transport answering from scripted routes and recording every request.
///
/// A route answers with its queued responses in order and repeats the last
/// one. Unscripted routes answer `404`.
#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub(crate) async fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.push(method, path, Scripted::Respond(ApiResponse::json(status, &body)))
            .await;
    }

    pub(crate) async fn respond_bytes(&self, method: Method, path: &str, body: &[u8]) {
        self.push(
            method,
            path,
            Scripted::Respond(ApiResponse {
                status: StatusCode::OK,
                body: body.to_vec(),
            }),
        )
        .await;
    }

    pub(crate) async fn unreachable(&self, method: Method, path: &str) {
        self.push(method, path, Scripted::Unreachable).await;
    }

    pub(crate) async fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().await.clone()
    }

    pub(crate) async fn requests_to(&self, method: &Method, path: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|request| &request.method == method && request.path == path)
            .cloned()
            .collect()
    }

    pub(crate) async fn mutation_count(&self) -> usize {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|request| request.method != Method::GET)
            .count()
    }

    async fn push(&self, method: Method, path: &str, scripted: Scripted) {
        self.routes
            .lock()
            .await
            .entry((method, path.to_owned()))
            .or_default()
            .push_back(scripted);
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> AppResult<ApiResponse> {
        let key = (request.method.clone(), request.path.clone());
        self.requests.lock().await.push(request);

        let mut routes = self.routes.lock().await;
        let Some(queue) = routes.get_mut(&key) else {
            return Ok(ApiResponse::json(
                StatusCode::NOT_FOUND,
                &serde_json::json!({ "message": format!("no route for {} {}", key.0, key.1) }),
            ));
        };

        let scripted = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().map(|scripted| match scripted {
                Scripted::Respond(response) => Scripted::Respond(response.clone()),
                Scripted::Unreachable => Scripted::Unreachable,
            })
        };

        match scripted {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Unreachable) | None => Err(AppError::Unavailable(
                "connection refused".to_owned(),
            )),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeSessionStore {
    pub(crate) stored: Mutex<PersistedSession>,
}

#[async_trait]
impl SessionStore for FakeSessionStore {
    async fn load(&self) -> AppResult<PersistedSession> {
        Ok(self.stored.lock().await.clone())
    }

    async fn save(&self, session: &PersistedSession) -> AppResult<()> {
        *self.stored.lock().await = session.clone();
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        *self.stored.lock().await = PersistedSession::default();
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeDownloadSink {
    pub(crate) files: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl DownloadSink for FakeDownloadSink {
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<PathBuf> {
        self.files.lock().await.push((file_name.to_owned(), bytes));
        Ok(PathBuf::from("/downloads").join(file_name))
    }
}

pub(crate) struct Harness {
    pub(crate) transport: Arc<FakeTransport>,
    pub(crate) store: Arc<FakeSessionStore>,
    pub(crate) gateway: ApiGateway,
}

pub(crate) fn harness() -> Harness {
    let transport = Arc::new(FakeTransport::default());
    let store = Arc::new(FakeSessionStore::default());
    let session = SessionContext::new(store.clone());
    let gateway = ApiGateway::new(transport.clone(), session);

    Harness {
        transport,
        store,
        gateway,
    }
}

pub(crate) async fn signed_in_harness() -> Harness {
    let harness = harness();
    let token = kkvat_core::BearerToken::new("token-123");
    if let Some(token) = token {
        let established = harness
            .gateway
            .session()
            .establish(token, None, Vec::new())
            .await;
        assert!(established.is_ok());
    }
    harness
}
