use http::Method;
use http::header::AUTHORIZATION;
use serde_json::json;

use kkvat_core::AppError;

use crate::api_gateway::LOGIN_PATH;
use crate::test_support::{Harness, harness};

use super::{AuthService, INVALID_CREDENTIALS, LOGOUT_PATH};

async fn script_login(harness: &Harness) {
    harness
        .transport
        .respond(
            Method::POST,
            LOGIN_PATH,
            200,
            json!({
                "accessToken": "tok-1",
                "sessionId": 99,
                "user": { "id": 5, "username": "ada", "firstName": "Ada" },
                "menus": [{ "id": 1, "name": "Home", "menuOrder": 1 }],
            }),
        )
        .await;
}

#[tokio::test]
async fn login_stores_session_and_refreshes_menus() {
    let harness = harness();
    script_login(&harness).await;
    harness
        .transport
        .respond(
            Method::GET,
            "/api/menu-items/user/5/hierarchical",
            200,
            json!({ "data": [{ "id": 2, "name": "Reports", "menuOrder": 1 }] }),
        )
        .await;
    let service = AuthService::new(harness.gateway.clone());
    let mut menus = harness.gateway.session().subscribe_menus();

    let outcome = service.login("ada", "secret").await;

    let Ok(outcome) = outcome else {
        panic!("login should succeed");
    };
    assert_eq!(outcome.session_id.as_deref(), Some("99"));
    assert_eq!(outcome.menus.len(), 1);
    assert_eq!(outcome.menus[0].name, "Reports");
    assert!(menus.has_changed().unwrap_or(false));
    assert_eq!(menus.borrow_and_update()[0].name, "Reports");

    let stored = harness.store.stored.lock().await.clone();
    assert_eq!(stored.access_token.map(|token| token.as_str().to_owned()), Some("tok-1".to_owned()));
    assert_eq!(stored.user.map(|user| user.username), Some("ada".to_owned()));
    assert_eq!(stored.menus[0].name, "Reports");

    let follow_up = harness
        .transport
        .requests_to(&Method::GET, "/api/menu-items/user/5/hierarchical")
        .await;
    assert_eq!(
        follow_up[0]
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok()),
        Some("Bearer tok-1")
    );
}

#[tokio::test]
async fn failed_menu_refresh_keeps_login_menus() {
    let harness = harness();
    script_login(&harness).await;
    let service = AuthService::new(harness.gateway.clone());

    let outcome = service.login("ada", "secret").await;

    assert_eq!(outcome.map(|outcome| outcome.menus.len()).ok(), Some(1));
    let menus = service.current_menus().await.unwrap_or_default();
    assert_eq!(menus[0].name, "Home");
}

#[tokio::test]
async fn bad_credentials_use_fixed_message() {
    let harness = harness();
    harness
        .transport
        .respond(Method::POST, LOGIN_PATH, 401, json!({ "message": "Bad credentials" }))
        .await;
    let service = AuthService::new(harness.gateway.clone());

    let result = service.login("ada", "wrong").await;

    assert_eq!(
        result.err(),
        Some(AppError::Unauthorized(INVALID_CREDENTIALS.to_owned()))
    );
    assert!(!service.is_logged_in().await);
}

#[tokio::test]
async fn unreachable_server_gets_connectivity_hint() {
    let harness = harness();
    harness.transport.unreachable(Method::POST, LOGIN_PATH).await;
    let service = AuthService::new(harness.gateway.clone());

    let result = service.login("ada", "secret").await;

    match result {
        Err(AppError::Unavailable(message)) => assert!(message.starts_with("Unable to reach")),
        other => panic!("expected unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn blank_credentials_are_rejected_locally() {
    let harness = harness();
    let service = AuthService::new(harness.gateway.clone());

    assert!(matches!(
        service.login("  ", "secret").await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        service.login("ada", "").await,
        Err(AppError::Validation(_))
    ));
    assert!(harness.transport.requests().await.is_empty());
}

#[tokio::test]
async fn logout_clears_everything_even_when_server_call_fails() {
    let harness = harness();
    script_login(&harness).await;
    harness.transport.unreachable(Method::POST, LOGOUT_PATH).await;
    let service = AuthService::new(harness.gateway.clone());
    assert!(service.login("ada", "secret").await.is_ok());
    let menus = harness.gateway.session().subscribe_menus();

    assert!(service.logout().await.is_ok());

    assert!(!service.is_logged_in().await);
    assert!(service.current_user().await.is_none());
    assert!(menus.borrow().is_empty());
    assert_eq!(*harness.store.stored.lock().await, Default::default());
    assert_eq!(
        harness
            .transport
            .requests_to(&Method::POST, LOGOUT_PATH)
            .await
            .len(),
        1
    );
}

#[tokio::test]
async fn restore_rehydrates_previous_session() {
    let first = harness();
    script_login(&first).await;
    assert!(AuthService::new(first.gateway.clone()).login("ada", "secret").await.is_ok());
    let persisted = first.store.stored.lock().await.clone();

    let second = harness();
    *second.store.stored.lock().await = persisted;
    assert!(second.gateway.session().restore().await.is_ok());
    let service = AuthService::new(second.gateway.clone());

    assert!(service.is_logged_in().await);
    assert_eq!(
        service.current_user().await.map(|user| user.display_name()),
        Some("Ada".to_owned())
    );
    assert_eq!(service.menu_tree().await.map(|tree| tree.len()).ok(), Some(1));
}

#[tokio::test]
async fn server_failure_message_is_kept() {
    let harness = harness();
    harness
        .transport
        .respond(Method::POST, LOGIN_PATH, 500, json!({ "message": "Account locked" }))
        .await;
    let service = AuthService::new(harness.gateway.clone());

    let result = service.login("ada", "secret").await;

    assert_eq!(result.err(), Some(AppError::Internal("Account locked".to_owned())));
}

#[tokio::test]
async fn bare_server_failure_falls_back_to_generic_message() {
    let harness = harness();
    harness
        .transport
        .respond(Method::POST, LOGIN_PATH, 503, json!({}))
        .await;
    let service = AuthService::new(harness.gateway.clone());

    let result = service.login("ada", "secret").await;

    assert_eq!(result.err(), Some(AppError::Internal("Login failed".to_owned())));
}
