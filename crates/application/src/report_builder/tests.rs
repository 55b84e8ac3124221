use http::Method;
use serde_json::json;

use kkvat_domain::{FilterOperator, Report, SortConfig, SortDirection};

use crate::test_support::{Harness, signed_in_harness};

use super::{ReportBuilder, WizardStep};

async fn harness_with_view() -> Harness {
    let harness = signed_in_harness().await;
    harness
        .transport
        .respond(
            Method::GET,
            "/api/report-views/4/fields",
            200,
            json!([
                { "fieldName": "status", "isFilterable": true, "isSortable": false },
                { "fieldName": "startTime", "isFilterable": false, "isSortable": true },
                { "fieldName": "testName", "isFilterable": true, "isSortable": true },
            ]),
        )
        .await;
    harness
        .transport
        .respond(
            Method::GET,
            "/api/report-views/4/fields/filterable",
            200,
            json!([{ "fieldName": "status", "isFilterable": true }]),
        )
        .await;
    harness
}

async fn ready_builder(harness: &Harness) -> ReportBuilder {
    let mut builder = ReportBuilder::new(harness.gateway.clone());
    assert!(builder.select_view(4).await.is_ok());
    builder.details_mut().name = "Daily failures".to_owned();
    builder.toggle_column("status");
    builder.toggle_column("testName");
    builder
}

#[tokio::test]
async fn subset_failure_falls_back_to_field_flags() {
    let harness = harness_with_view().await;
    let mut builder = ReportBuilder::new(harness.gateway.clone());

    assert!(builder.select_view(4).await.is_ok());

    let filterable: Vec<&str> = builder
        .filterable_fields()
        .iter()
        .map(|field| field.field_name.as_str())
        .collect();
    let sortable: Vec<&str> = builder
        .sortable_fields()
        .iter()
        .map(|field| field.field_name.as_str())
        .collect();
    assert_eq!(filterable, vec!["status"]);
    assert_eq!(sortable, vec!["startTime", "testName"]);
    assert_eq!(builder.fields().len(), 3);
}

#[tokio::test]
async fn next_validates_only_the_current_step() {
    let harness = harness_with_view().await;
    let mut builder = ReportBuilder::new(harness.gateway.clone());

    builder.details_mut().name = "ab".to_owned();
    assert!(builder.next().is_err());
    builder.details_mut().name = "abc".to_owned();
    assert!(builder.next().is_err());

    assert!(builder.select_view(4).await.is_ok());
    assert_eq!(builder.next().ok(), Some(WizardStep::Columns));
    assert!(builder.next().is_err());

    builder.toggle_column("status");
    assert_eq!(builder.next().ok(), Some(WizardStep::Filters));
    assert_eq!(builder.next().ok(), Some(WizardStep::Sorting));
    assert_eq!(builder.next().ok(), Some(WizardStep::PreviewAndSave));
    assert_eq!(builder.step().number(), 5);

    builder.toggle_column("status");
    assert_eq!(builder.previous(), WizardStep::Sorting);
    assert_eq!(builder.previous(), WizardStep::Filters);
}

#[tokio::test]
async fn column_selection_keeps_first_selection_order() {
    let harness = harness_with_view().await;
    let mut builder = ReportBuilder::new(harness.gateway.clone());
    assert!(builder.select_view(4).await.is_ok());

    assert!(builder.toggle_column("testName"));
    assert!(builder.toggle_column("status"));
    assert!(builder.toggle_column("startTime"));
    assert!(!builder.toggle_column("status"));

    assert_eq!(builder.selected_columns(), ["testName", "startTime"]);

    assert!(builder.select_view(4).await.is_ok());
    assert!(builder.selected_columns().is_empty());
}

#[tokio::test]
async fn filters_and_sorts_default_to_first_eligible_field() {
    let harness = harness_with_view().await;
    let mut builder = ready_builder(&harness).await;

    builder.add_filter();
    builder.add_sort();
    builder.add_sort();

    assert_eq!(builder.filters()[0].field, "status");
    assert_eq!(builder.filters()[0].operator, FilterOperator::Equals);
    assert_eq!(builder.filters()[0].value, json!(""));
    assert_eq!(builder.sorts()[0].field, "startTime");
    assert_eq!(builder.sorts()[0].direction, SortDirection::Asc);

    assert!(builder.update_sort(
        1,
        SortConfig {
            field: "testName".to_owned(),
            direction: SortDirection::Desc,
        }
    ));
    assert!(builder.move_sort_up(1));
    assert_eq!(builder.sorts()[0].field, "testName");
    assert!(!builder.move_sort_up(0));
    assert!(!builder.move_sort_down(1));
    assert!(builder.move_sort_down(0));
    assert_eq!(builder.sorts()[1].field, "testName");

    assert!(!builder.remove_filter(3));
    assert!(builder.remove_filter(0));
    assert!(builder.filters().is_empty());
}

#[tokio::test]
async fn preview_is_local() {
    let harness = harness_with_view().await;
    let mut builder = ready_builder(&harness).await;
    let before = harness.transport.requests().await.len();

    let rows = builder.preview().map(<[_]>::to_vec);

    assert_eq!(
        rows.ok(),
        Some(vec![json!({ "status": "sample", "testName": "sample" })])
    );
    assert_eq!(harness.transport.requests().await.len(), before);
}

#[tokio::test]
async fn save_omits_empty_blocks_and_posts_once() {
    let harness = harness_with_view().await;
    harness
        .transport
        .respond(
            Method::POST,
            "/api/reports",
            201,
            json!({ "id": 12, "name": "Daily failures" }),
        )
        .await;
    let mut builder = ready_builder(&harness).await;

    let saved = builder.save().await;

    assert_eq!(saved.map(|report| report.id).ok(), Some(12));
    assert_eq!(builder.editing_id(), Some(12));
    let posts = harness.transport.requests_to(&Method::POST, "/api/reports").await;
    assert_eq!(posts.len(), 1);
    assert_eq!(
        posts[0].body,
        Some(json!({
            "name": "Daily failures",
            "description": "",
            "viewId": 4,
            "selectedColumns": ["status", "testName"],
            "reportType": "EXECUTION",
            "isPublic": false,
        }))
    );
}

#[tokio::test]
async fn save_wraps_filters_and_lists_sorts() {
    let harness = harness_with_view().await;
    harness
        .transport
        .respond(
            Method::POST,
            "/api/reports",
            201,
            json!({ "id": 13, "name": "Daily failures" }),
        )
        .await;
    let mut builder = ready_builder(&harness).await;
    builder.add_filter();
    builder.add_sort();

    assert!(builder.save().await.is_ok());

    let posts = harness.transport.requests_to(&Method::POST, "/api/reports").await;
    let body = posts[0].body.clone().unwrap_or_default();
    assert_eq!(
        body["filterConditions"],
        json!({ "conditions": [{ "field": "status", "operator": "=", "value": "" }] })
    );
    assert_eq!(
        body["sortConfig"],
        json!([{ "field": "startTime", "direction": "ASC" }])
    );
}

#[tokio::test]
async fn invalid_report_is_rejected_without_network() {
    let harness = harness_with_view().await;
    let mut builder = ReportBuilder::new(harness.gateway.clone());
    assert!(builder.select_view(4).await.is_ok());
    builder.details_mut().name = "Daily failures".to_owned();

    assert!(builder.save().await.is_err());
    assert_eq!(harness.transport.mutation_count().await, 0);
}

#[tokio::test]
async fn edit_restores_stored_blocks_and_puts() {
    let harness = harness_with_view().await;
    harness
        .transport
        .respond(
            Method::PUT,
            "/api/reports/8",
            200,
            json!({ "id": 8, "name": "Renamed" }),
        )
        .await;
    let report: Report = serde_json::from_value(json!({
        "id": 8,
        "name": "Stored",
        "viewId": 4,
        "selectedColumns": ["testName"],
        "filterConditions": { "conditions": [{ "field": "status", "operator": "LIKE", "value": "FAIL" }] },
        "sortConfig": { "field": "testName", "direction": "DESC" },
        "reportType": "CUSTOM",
        "isPublic": 1,
    }))
    .unwrap_or_else(|error| panic!("fixture should decode: {error}"));
    let mut builder = ReportBuilder::new(harness.gateway.clone());

    assert!(builder.edit(&report).await.is_ok());
    assert_eq!(builder.filters()[0].operator, FilterOperator::Like);
    assert_eq!(builder.sorts()[0].direction, SortDirection::Desc);
    assert!(builder.details().is_public);

    builder.details_mut().name = "Renamed".to_owned();
    assert!(builder.save().await.is_ok());
    assert_eq!(
        harness.transport.requests_to(&Method::PUT, "/api/reports/8").await.len(),
        1
    );
    assert_eq!(harness.transport.mutation_count().await, 1);
}
