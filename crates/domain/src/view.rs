use std::str::FromStr;

use kkvat_core::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::flags::deserialize_lenient_bool;

/// Database view a report can be built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    /// Backend identifier.
    pub id: i64,
    /// Technical view name.
    pub name: String,
    /// Label shown to operators.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Underlying table or view.
    #[serde(default)]
    pub table_name: Option<String>,
    /// Whether the view can be used.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub is_active: bool,
    /// Field catalogue, present on detail responses only.
    #[serde(default)]
    pub fields: Vec<ReportViewField>,
}

impl ReportView {
    /// Returns the operator-facing label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|label| !label.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

/// One selectable field of a report view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportViewField {
    /// Backend identifier.
    #[serde(default)]
    pub id: Option<i64>,
    /// Owning view.
    #[serde(default)]
    pub view_id: Option<i64>,
    /// Column name used in requests.
    pub field_name: String,
    /// Label shown to operators.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Loose type hint (`string`, `number`, `date`, ...).
    #[serde(default)]
    pub field_type: Option<String>,
    /// Whether the field may appear in filter conditions.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub is_filterable: bool,
    /// Whether the field may appear in sort rules.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub is_sortable: bool,
}

impl ReportViewField {
    /// Returns the operator-facing label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|label| !label.trim().is_empty())
            .unwrap_or(&self.field_name)
    }
}

/// Comparison used by a filter condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Equality.
    #[default]
    #[serde(rename = "=")]
    Equals,
    /// Strictly less.
    #[serde(rename = "<")]
    LessThan,
    /// Strictly greater.
    #[serde(rename = ">")]
    GreaterThan,
    /// Less or equal.
    #[serde(rename = "<=")]
    LessOrEqual,
    /// Greater or equal.
    #[serde(rename = ">=")]
    GreaterOrEqual,
    /// SQL pattern match.
    #[serde(rename = "LIKE")]
    Like,
}

impl FilterOperator {
    /// Returns the wire symbol.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::LessOrEqual => "<=",
            Self::GreaterOrEqual => ">=",
            Self::Like => "LIKE",
        }
    }
}

impl FromStr for FilterOperator {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "=" => Ok(Self::Equals),
            "<" => Ok(Self::LessThan),
            ">" => Ok(Self::GreaterThan),
            "<=" => Ok(Self::LessOrEqual),
            ">=" => Ok(Self::GreaterOrEqual),
            other if other.eq_ignore_ascii_case("like") => Ok(Self::Like),
            _ => Err(AppError::Validation(format!(
                "unknown filter operator '{value}'"
            ))),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if value.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(AppError::Validation(format!(
                "unknown sort direction '{value}'"
            )))
        }
    }
}

/// One `field operator value` filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    /// Field name; blank until chosen.
    pub field: String,
    /// Comparison.
    pub operator: FilterOperator,
    /// Right-hand operand, usually a string.
    pub value: Value,
}

impl FilterCondition {
    /// Creates a condition with `=` and an empty value.
    #[must_use]
    pub fn on(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: FilterOperator::Equals,
            value: Value::String(String::new()),
        }
    }
}

/// Filter block stored on a report as `{"conditions": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConditions {
    /// Conditions combined with AND.
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
}

/// One sort rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    /// Field name; blank until chosen.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}
