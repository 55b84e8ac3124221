use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use kkvat_core::AppError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::flags::deserialize_lenient_bool;

/// Category of a saved report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    /// Reports over test executions.
    Execution,
    /// Reports over user activity.
    UserActivity,
    /// Anything else.
    #[default]
    Custom,
}

impl ReportType {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Execution => "EXECUTION",
            Self::UserActivity => "USER_ACTIVITY",
            Self::Custom => "CUSTOM",
        }
    }
}

impl FromStr for ReportType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EXECUTION" => Ok(Self::Execution),
            "USER_ACTIVITY" => Ok(Self::UserActivity),
            "CUSTOM" => Ok(Self::Custom),
            _ => Err(AppError::Validation(format!("unknown report type '{value}'"))),
        }
    }
}

/// Saved report definition.
///
/// Filter and sort blocks are kept as raw JSON: stored reports carry several
/// historical shapes and are interpreted where they are used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Backend identifier.
    pub id: i64,
    /// Report name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Source view.
    #[serde(default)]
    pub view_id: Option<i64>,
    /// Selected column names; `null` from the backend decodes as empty.
    #[serde(default, deserialize_with = "deserialize_nullable_list")]
    pub selected_columns: Vec<String>,
    /// Stored filter block.
    #[serde(default)]
    pub filter_conditions: Option<Value>,
    /// Stored sort block.
    #[serde(default)]
    pub sort_config: Option<Value>,
    /// Category.
    #[serde(default)]
    pub report_type: ReportType,
    /// Visible to every user.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub is_public: bool,
    /// Author login name.
    #[serde(default, alias = "createdByName")]
    pub created_by_username: Option<String>,
    /// Creation time.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<NaiveDateTime>,
    /// Last update time.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub updated_at: Option<NaiveDateTime>,
}

/// Create/update body for a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    /// Report name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Source view.
    pub view_id: i64,
    /// Selected column names in display order.
    pub selected_columns: Vec<String>,
    /// `{"conditions": [...]}`; omitted when there are none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_conditions: Option<Value>,
    /// Sort rules; omitted when there are none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_config: Option<Value>,
    /// Category.
    pub report_type: ReportType,
    /// Visible to every user.
    pub is_public: bool,
}

/// Lifecycle of one report run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Queued.
    Pending,
    /// Running.
    Generating,
    /// Finished with a file.
    Completed,
    /// Finished with an error.
    Failed,
}

impl ExecutionStatus {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Generating => "GENERATING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Returns the operator-facing label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Generating => "Generating",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    /// Returns whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns whether the backend may move an execution from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Generating)
                | (Self::Generating, Self::Completed)
                | (Self::Generating, Self::Failed)
        )
    }
}

impl FromStr for ExecutionStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "GENERATING" => Ok(Self::Generating),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(AppError::Validation(format!(
                "unknown execution status '{value}'"
            ))),
        }
    }
}

/// What triggered a report run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionType {
    /// Started by an operator.
    Manual,
    /// Started by a schedule.
    Scheduled,
    /// Started through the API.
    Api,
}

impl ExecutionType {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::Scheduled => "SCHEDULED",
            Self::Api => "API",
        }
    }

    /// Returns the operator-facing label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Manual => "Manual",
            Self::Scheduled => "Scheduled",
            Self::Api => "API Call",
        }
    }
}

impl FromStr for ExecutionType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "MANUAL" => Ok(Self::Manual),
            "SCHEDULED" => Ok(Self::Scheduled),
            "API" => Ok(Self::Api),
            _ => Err(AppError::Validation(format!(
                "unknown execution type '{value}'"
            ))),
        }
    }
}

/// One run of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportExecution {
    /// Backend identifier.
    pub id: i64,
    /// Report that was run.
    #[serde(default)]
    pub report_id: Option<i64>,
    /// Report name at run time.
    #[serde(default)]
    pub report_name: Option<String>,
    /// Schedule that triggered the run.
    #[serde(default)]
    pub schedule_id: Option<i64>,
    /// Trigger.
    pub execution_type: ExecutionType,
    /// Current status.
    pub status: ExecutionStatus,
    /// Start time.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub start_time: Option<NaiveDateTime>,
    /// End time.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub end_time: Option<NaiveDateTime>,
    /// Run time in milliseconds.
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Server-side path of the produced file.
    #[serde(default)]
    pub file_path: Option<String>,
    /// Size of the produced file in bytes.
    #[serde(default)]
    pub file_size: Option<u64>,
    /// Rows written.
    #[serde(default)]
    pub row_count: Option<u64>,
    /// Failure detail.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Username of the operator who ran it.
    #[serde(default)]
    pub executed_by_username: Option<String>,
    /// Row creation time.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<NaiveDateTime>,
}

impl ReportExecution {
    /// Returns whether a file is available for download.
    #[must_use]
    pub fn is_downloadable(&self) -> bool {
        self.status == ExecutionStatus::Completed
            && self
                .file_path
                .as_deref()
                .is_some_and(|path| !path.trim().is_empty())
    }

    /// Returns the suggested local file name, `<report>_<yyyy-mm-dd>.csv`.
    #[must_use]
    pub fn download_file_name(&self) -> String {
        let report_name = self
            .report_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        match (report_name, self.created_at) {
            (Some(name), Some(created_at)) => {
                format!("{}_{}.csv", sanitize_file_stem(name), created_at.format("%Y-%m-%d"))
            }
            (Some(name), None) => format!("{}.csv", sanitize_file_stem(name)),
            (None, _) => format!("report_{}.csv", self.id),
        }
    }
}

fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|character| match character {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}

fn deserialize_nullable_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `2024-05-01T10:00:00[.fff]` and RFC 3339 with an offset.
/// Unparseable values become `None`.
pub(crate) fn deserialize_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_str).and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|timestamp| timestamp.naive_utc())
        })
}

/// Formats a run time as `1h 2m`, `3m 4s`, or `5s`; `-` when unknown or zero.
#[must_use]
pub fn format_duration(duration_ms: Option<u64>) -> String {
    let Some(duration_ms) = duration_ms.filter(|duration| *duration > 0) else {
        return "-".to_owned();
    };

    let seconds = duration_ms / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{hours}h {}m", minutes % 60)
    } else if minutes > 0 {
        format!("{minutes}m {}s", seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

/// Formats a byte count with up to two decimals; `-` when unknown or zero.
#[must_use]
pub fn format_file_size(bytes: Option<u64>) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let Some(bytes) = bytes.filter(|bytes| *bytes > 0) else {
        return "-".to_owned();
    };

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        ExecutionStatus, Report, ReportExecution, ReportRequest, ReportType, format_duration,
        format_file_size,
    };

    #[test]
    fn report_tolerates_null_columns_and_reads_author() {
        let report = serde_json::from_value::<Report>(json!({
            "id": 3,
            "name": "Failed runs",
            "viewId": 2,
            "selectedColumns": null,
            "filterConditions": null,
            "createdByUsername": "ada",
        }));

        let Ok(report) = report else {
            panic!("report with null columns should decode");
        };
        assert!(report.selected_columns.is_empty());
        assert_eq!(report.created_by_username.as_deref(), Some("ada"));
    }

    fn execution(status: &str, file_path: Option<&str>) -> ReportExecution {
        let payload = json!({
            "id": 41,
            "reportId": 7,
            "reportName": "Daily runs",
            "executionType": "MANUAL",
            "status": status,
            "filePath": file_path,
            "createdAt": "2024-05-01T10:15:00.123",
        });

        match serde_json::from_value(payload) {
            Ok(execution) => execution,
            Err(error) => panic!("execution should decode: {error}"),
        }
    }

    #[test]
    fn only_completed_runs_with_files_are_downloadable() {
        assert!(execution("COMPLETED", Some("/tmp/a.csv")).is_downloadable());
        assert!(!execution("COMPLETED", None).is_downloadable());
        assert!(!execution("GENERATING", Some("/tmp/a.csv")).is_downloadable());
        assert!(!execution("FAILED", Some("/tmp/a.csv")).is_downloadable());
    }

    #[test]
    fn download_name_uses_report_name_and_creation_date() {
        assert_eq!(
            execution("COMPLETED", None).download_file_name(),
            "Daily runs_2024-05-01.csv"
        );

        let mut unnamed = execution("COMPLETED", None);
        unnamed.report_name = None;
        assert_eq!(unnamed.download_file_name(), "report_41.csv");
    }

    #[test]
    fn status_transitions_follow_lifecycle() {
        use ExecutionStatus::{Completed, Failed, Generating, Pending};

        assert!(Pending.can_transition_to(Generating));
        assert!(Generating.can_transition_to(Completed));
        assert!(Generating.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Generating));
        assert!(Completed.is_terminal() && Failed.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn request_omits_empty_blocks() {
        let request = ReportRequest {
            name: "Runs".to_owned(),
            description: String::new(),
            view_id: 2,
            selected_columns: vec!["status".to_owned()],
            filter_conditions: None,
            sort_config: None,
            report_type: ReportType::Execution,
            is_public: false,
        };
        let payload = serde_json::to_value(&request).unwrap_or_default();

        assert!(payload.get("filterConditions").is_none());
        assert!(payload.get("sortConfig").is_none());
        assert_eq!(payload["reportType"], json!("EXECUTION"));
        assert_eq!(payload["viewId"], json!(2));
    }

    #[test]
    fn durations_and_sizes_are_human_readable() {
        assert_eq!(format_duration(Some(3_720_000)), "1h 2m");
        assert_eq!(format_duration(Some(184_000)), "3m 4s");
        assert_eq!(format_duration(Some(5_400)), "5s");
        assert_eq!(format_duration(None), "-");
        assert_eq!(format_duration(Some(0)), "-");

        assert_eq!(format_file_size(Some(512)), "512 B");
        assert_eq!(format_file_size(Some(1536)), "1.5 KB");
        assert_eq!(format_file_size(Some(5 * 1024 * 1024)), "5 MB");
        assert_eq!(format_file_size(None), "-");
    }

    #[test]
    fn offset_timestamps_are_accepted() {
        let payload = json!({
            "id": 1,
            "executionType": "API",
            "status": "PENDING",
            "createdAt": "2024-05-01T23:00:00Z",
            "startTime": "garbage",
        });
        let Ok(execution) = serde_json::from_value::<ReportExecution>(payload) else {
            panic!("execution should decode");
        };

        assert!(execution.created_at.is_some());
        assert!(execution.start_time.is_none());
    }
}
