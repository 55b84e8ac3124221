use http::Method;
use serde_json::json;

use kkvat_core::AppError;
use kkvat_domain::EntityConfig;

use crate::test_support::signed_in_harness;

use super::EntityManagementService;

fn invoice_config() -> EntityConfig {
    let mut config = EntityConfig::new("Invoice", "invoice");
    config.add_column();
    let named = config.add_column();
    config.columns[named].column_name = "total".to_owned();
    config
}

#[tokio::test]
async fn create_submits_normalized_columns_then_generates() {
    let harness = signed_in_harness().await;
    harness
        .transport
        .respond(
            Method::POST,
            "/api/entity-management",
            201,
            json!({ "entity": { "id": 12, "entityName": "Invoice" }, "generation": "done" }),
        )
        .await;
    harness
        .transport
        .respond(
            Method::POST,
            "/api/entity-management/12/generate",
            200,
            json!({ "status": "ok", "message": "Generated 4 files" }),
        )
        .await;
    harness
        .transport
        .respond(Method::GET, "/api/entity-management", 200, json!([]))
        .await;
    let service = EntityManagementService::new(harness.gateway.clone());

    let Ok(creation) = service.create(invoice_config()).await else {
        panic!("create should succeed");
    };

    assert_eq!(creation.id, Some(12));
    let generation = creation.generation.and_then(Result::ok);
    assert_eq!(
        generation.as_ref().map(|outcome| outcome.summary()),
        Some("Generated 4 files")
    );

    let posts = harness
        .transport
        .requests_to(&Method::POST, "/api/entity-management")
        .await;
    let body = posts[0].body.clone().unwrap_or_default();
    assert_eq!(body["columns"], json!([{
        "column_seq": 1,
        "column_name": "total",
        "column_length": null,
        "column_datatype": "string",
        "column_type": "freefield",
        "column_index": 0,
        "column_primary": 0,
        "column_part_of_search": 0,
        "column_referential_integrity": 0,
        "is_dropdown": 0,
        "is_radiobutton": 0,
        "is_checkbox": 0,
        "is_freefield": 1,
    }]));
    assert_eq!(body["doWeNeed1LevelWorkflow"], json!(false));
}

#[tokio::test]
async fn create_without_id_skips_generation() {
    let harness = signed_in_harness().await;
    harness
        .transport
        .respond(Method::POST, "/api/entity-management", 201, json!({ "status": "queued" }))
        .await;
    let service = EntityManagementService::new(harness.gateway.clone());

    let creation = service.create(invoice_config()).await;

    assert_eq!(creation.map(|creation| creation.generation.is_none()).ok(), Some(true));
    assert_eq!(harness.transport.mutation_count().await, 1);
}

#[tokio::test]
async fn generation_failure_is_reported_without_failing_create() {
    let harness = signed_in_harness().await;
    harness
        .transport
        .respond(Method::POST, "/api/entity-management", 201, json!({ "id": 3 }))
        .await;
    harness
        .transport
        .respond(
            Method::POST,
            "/api/entity-management/3/generate",
            500,
            json!({ "status": "error", "message": "template missing" }),
        )
        .await;
    let service = EntityManagementService::new(harness.gateway.clone());

    let Ok(creation) = service.create(invoice_config()).await else {
        panic!("create should succeed");
    };

    assert_eq!(
        creation.generation,
        Some(Err(AppError::Internal("status 500: template missing".to_owned())))
    );
}

#[tokio::test]
async fn list_decodes_stringified_columns() {
    let harness = signed_in_harness().await;
    harness
        .transport
        .respond(
            Method::GET,
            "/api/entity-management",
            200,
            json!([{ "id": 1, "entityName": "Order", "columns": "{\"0\":{\"name\":\"ref\"}}" }]),
        )
        .await;
    let service = EntityManagementService::new(harness.gateway.clone());

    let configs = service.list().await.unwrap_or_default();

    assert_eq!(configs[0].columns[0].column_name, "ref");
    assert_eq!(configs[0].columns[0].column_seq, 1);
}

#[tokio::test]
async fn generated_artifacts_accept_keyed_objects() {
    let harness = signed_in_harness().await;
    harness
        .transport
        .respond(
            Method::GET,
            "/api/entity-management/generated",
            200,
            json!({ "a": { "name": "invoice", "path": "/gen/invoice" } }),
        )
        .await;
    let service = EntityManagementService::new(harness.gateway.clone());

    let artifacts = service.list_generated().await.unwrap_or_default();

    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].name, "invoice");
}

#[tokio::test]
async fn deleting_generated_folder_rejects_path_segments() {
    let harness = signed_in_harness().await;
    harness
        .transport
        .respond(
            Method::DELETE,
            "/api/entity-management/generated/invoice",
            200,
            json!({ "status": "ok" }),
        )
        .await;
    let service = EntityManagementService::new(harness.gateway.clone());

    assert!(service.delete_generated("invoice").await.is_ok());
    assert!(matches!(
        service.delete_generated("../etc").await,
        Err(AppError::Validation(_))
    ));
    assert_eq!(harness.transport.mutation_count().await, 1);
}

#[tokio::test]
async fn update_requires_entity_name() {
    let harness = signed_in_harness().await;
    let service = EntityManagementService::new(harness.gateway.clone());

    let result = service.update(1, EntityConfig::new("", "t")).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(harness.transport.requests().await.is_empty());
}
