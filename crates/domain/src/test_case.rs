use std::str::FromStr;

use kkvat_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT_SECONDS: u32 = 30;

fn default_timeout_seconds() -> u32 {
    DEFAULT_TIMEOUT_SECONDS
}

/// Lifecycle of a recorded test case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestCaseStatus {
    /// Being authored.
    #[default]
    Draft,
    /// Runnable.
    Active,
    /// Superseded but still listed.
    Deprecated,
    /// Hidden from normal use.
    Archived,
}

impl TestCaseStatus {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Deprecated => "DEPRECATED",
            Self::Archived => "ARCHIVED",
        }
    }
}

impl FromStr for TestCaseStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "ACTIVE" => Ok(Self::Active),
            "DEPRECATED" => Ok(Self::Deprecated),
            "ARCHIVED" => Ok(Self::Archived),
            _ => Err(AppError::Validation(format!(
                "unknown test case status '{value}'"
            ))),
        }
    }
}

/// Recorded browser test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Backend identifier.
    pub id: i64,
    /// Test name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Recorded action script, opaque JSON text.
    #[serde(default)]
    pub recorded_actions: Option<String>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: TestCaseStatus,
    /// Owning group.
    #[serde(default)]
    pub group_id: Option<i64>,
    /// Owning group name.
    #[serde(default)]
    pub group_name: Option<String>,
    /// Comma-separated tags.
    #[serde(default)]
    pub tags: Option<String>,
    /// Application entry URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-run timeout. Stored for the runner; the console never enforces it.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u32,
}

/// Create/update body for a test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseDraft {
    /// Test name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Recorded action script.
    pub recorded_actions: String,
    /// Lifecycle status.
    #[serde(default)]
    pub status: TestCaseStatus,
    /// Owning group.
    #[serde(default)]
    pub group_id: Option<i64>,
    /// Comma-separated tags.
    #[serde(default)]
    pub tags: String,
    /// Application entry URL.
    #[serde(default)]
    pub base_url: String,
    /// Per-run timeout.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u32,
}

impl TestCaseDraft {
    /// Creates a draft with an empty action script.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            recorded_actions: "[]".to_owned(),
            status: TestCaseStatus::Draft,
            group_id: None,
            tags: String::new(),
            base_url: String::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Validates fields the backend would otherwise reject.
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("test case name is required".to_owned()));
        }

        if self.recorded_actions.trim().is_empty() {
            return Err(AppError::Validation(
                "recorded actions are required".to_owned(),
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(AppError::Validation(
                "timeout must be greater than zero".to_owned(),
            ));
        }

        Ok(())
    }
}

impl From<&TestCase> for TestCaseDraft {
    fn from(test_case: &TestCase) -> Self {
        Self {
            name: test_case.name.clone(),
            description: test_case.description.clone().unwrap_or_default(),
            recorded_actions: test_case
                .recorded_actions
                .clone()
                .unwrap_or_else(|| "[]".to_owned()),
            status: test_case.status,
            group_id: test_case.group_id,
            tags: test_case.tags.clone().unwrap_or_default(),
            base_url: test_case.base_url.clone().unwrap_or_default(),
            timeout_seconds: test_case.timeout_seconds,
        }
    }
}
