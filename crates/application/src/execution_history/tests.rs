use std::sync::Arc;

use chrono::NaiveDate;
use http::Method;
use serde_json::{Value, json};

use kkvat_core::AppError;
use kkvat_domain::{ExecutionStatus, ExecutionType, ReportExecution};

use crate::test_support::{FakeDownloadSink, Harness, signed_in_harness};

use super::{ExecutionFilters, ExecutionHistory, ExecutionScope};

fn execution(id: i64, status: &str, execution_type: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "reportName": "Daily",
        "status": status,
        "executionType": execution_type,
        "createdAt": created_at,
        "filePath": "/srv/reports/daily.csv",
    })
}

async fn scripted_history(page_size: u32) -> (Harness, Arc<FakeDownloadSink>, ExecutionHistory) {
    let harness = signed_in_harness().await;
    harness
        .transport
        .respond(
            Method::GET,
            "/api/report-executions/download-list",
            200,
            json!({
                "content": [
                    execution(1, "COMPLETED", "MANUAL", "2024-05-01T08:00:00"),
                    execution(2, "FAILED", "SCHEDULED", "2024-05-02T23:30:00"),
                    execution(3, "COMPLETED", "SCHEDULED", "2024-05-03T09:15:00"),
                ],
                "totalElements": 25,
                "totalPages": 3,
            }),
        )
        .await;
    let sink = Arc::new(FakeDownloadSink::default());
    let history = ExecutionHistory::new(harness.gateway.clone(), sink.clone(), page_size);
    (harness, sink, history)
}

fn date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn ids(executions: &[ReportExecution]) -> Vec<i64> {
    executions.iter().map(|execution| execution.id).collect()
}

#[tokio::test]
async fn filters_apply_to_current_page_without_changing_total() {
    let (_harness, _sink, history) = scripted_history(10).await;

    assert!(
        history
            .apply_filters(ExecutionFilters {
                execution_type: Some(ExecutionType::Scheduled),
                ..ExecutionFilters::default()
            })
            .await
            .is_ok()
    );

    let snapshot = history.snapshot().await;
    assert_eq!(ids(&snapshot.executions), vec![2, 3]);
    assert_eq!(snapshot.total_executions, 25);
    assert_eq!(snapshot.total_pages, 3);
}

#[tokio::test]
async fn date_to_includes_the_whole_day() {
    let (_harness, _sink, history) = scripted_history(10).await;

    assert!(
        history
            .apply_filters(ExecutionFilters {
                date_from: date(2024, 5, 2),
                date_to: date(2024, 5, 2),
                ..ExecutionFilters::default()
            })
            .await
            .is_ok()
    );
    assert_eq!(ids(&history.snapshot().await.executions), vec![2]);

    assert!(history.reset_filters().await.is_ok());
    assert_eq!(history.snapshot().await.executions.len(), 3);
}

#[tokio::test]
async fn paging_is_bounded_by_total_over_size() {
    let (harness, _sink, history) = scripted_history(10).await;
    assert!(history.load().await.is_ok());

    assert_eq!(history.previous_page().await.ok(), Some(false));
    assert_eq!(history.next_page().await.ok(), Some(true));
    assert_eq!(history.next_page().await.ok(), Some(true));
    assert_eq!(history.next_page().await.ok(), Some(false));
    assert_eq!(history.snapshot().await.page, 2);

    let last = harness.transport.requests().await;
    assert_eq!(
        last.last().map(|request| request.query.clone()),
        Some(vec![
            ("page".to_owned(), "2".to_owned()),
            ("size".to_owned(), "10".to_owned())
        ])
    );

    assert!(history.apply_filters(ExecutionFilters::default()).await.is_ok());
    assert_eq!(history.snapshot().await.page, 0);
}

#[tokio::test]
async fn scope_selects_the_listing_endpoint() {
    let harness = signed_in_harness().await;
    harness
        .transport
        .respond(
            Method::GET,
            "/api/report-executions/report/7",
            200,
            json!([execution(9, "PENDING", "API", "2024-05-01T08:00:00")]),
        )
        .await;
    let history = ExecutionHistory::new(
        harness.gateway.clone(),
        Arc::new(FakeDownloadSink::default()),
        10,
    );

    assert!(history.set_scope(ExecutionScope::Report(7)).await.is_ok());

    let snapshot = history.snapshot().await;
    assert_eq!(ids(&snapshot.executions), vec![9]);
    assert_eq!(snapshot.total_executions, 1);
}

#[tokio::test]
async fn download_refuses_incomplete_executions_locally() {
    let (harness, sink, history) = scripted_history(10).await;
    let pending: ReportExecution = serde_json::from_value(execution(
        4,
        "GENERATING",
        "MANUAL",
        "2024-05-01T08:00:00",
    ))
    .unwrap_or_else(|error| panic!("fixture should decode: {error}"));

    let result = history.download(&pending).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(harness.transport.requests().await.is_empty());
    assert!(sink.files.lock().await.is_empty());
}

#[tokio::test]
async fn download_hands_bytes_to_the_sink() {
    let (harness, sink, history) = scripted_history(10).await;
    harness
        .transport
        .respond_bytes(Method::GET, "/api/report-executions/download/1", b"a,b\n1,2\n")
        .await;
    let completed: ReportExecution = serde_json::from_value(execution(
        1,
        "COMPLETED",
        "MANUAL",
        "2024-05-01T08:00:00",
    ))
    .unwrap_or_else(|error| panic!("fixture should decode: {error}"));
    assert_eq!(completed.status, ExecutionStatus::Completed);

    let path = history.download(&completed).await;

    assert_eq!(
        path.ok(),
        Some(std::path::PathBuf::from("/downloads/Daily_2024-05-01.csv"))
    );
    assert_eq!(
        sink.files.lock().await.clone(),
        vec![("Daily_2024-05-01.csv".to_owned(), b"a,b\n1,2\n".to_vec())]
    );
    assert!(!history.is_downloading(1).await);
}

#[tokio::test]
async fn preset_scope_and_filters_apply_to_a_direct_page_load() {
    let harness = signed_in_harness().await;
    harness
        .transport
        .respond(
            Method::GET,
            "/api/report-executions/my-executions",
            200,
            json!({
                "content": [
                    execution(5, "FAILED", "MANUAL", "2024-05-01T08:00:00"),
                    execution(6, "COMPLETED", "MANUAL", "2024-05-01T09:00:00"),
                ],
                "totalElements": 12,
            }),
        )
        .await;
    let history = ExecutionHistory::new(
        harness.gateway.clone(),
        Arc::new(FakeDownloadSink::default()),
        5,
    )
    .with_scope(ExecutionScope::Mine)
    .with_filters(ExecutionFilters {
        status: Some(ExecutionStatus::Failed),
        ..ExecutionFilters::default()
    });

    assert!(history.load_page(1).await.is_ok());

    let snapshot = history.snapshot().await;
    assert_eq!(ids(&snapshot.executions), vec![5]);
    assert_eq!(snapshot.page, 1);
    assert_eq!(snapshot.total_pages, 3);
}
