use serde_json::{Map, Value, json};

use kkvat_core::{AppError, AppResult};
use kkvat_domain::{Report, ReportExecution, ReportViewField};

use crate::api_gateway::ApiGateway;
use crate::list_envelope::decode_rows;

const EXECUTIONS_PATH: &str = "/api/report-executions";
const DEFAULT_FIELD_TYPE: &str = "string";

/// One runtime filter prompt for a saved report.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterInput {
    /// Field name sent to the backend.
    pub name: String,
    /// Label shown to the operator.
    pub display: String,
    /// Loose type hint.
    pub field_type: String,
    /// Current value; `null` or `""` means "no filter".
    pub value: Value,
}

impl FilterInput {
    fn is_set(&self) -> bool {
        match &self.value {
            Value::Null => false,
            Value::String(text) => !text.is_empty(),
            _ => true,
        }
    }
}

/// Builds runtime filter prompts from a report's stored filter block.
///
/// The block may be an object of defaults, an array of names, an array of
/// objects naming a `fieldName`, `name`, or `field`, or any of those encoded
/// as a JSON string. `{"conditions": [...]}` is read as its condition list
/// with each condition's value as the default. Anything unreadable falls
/// back to one prompt per filterable field.
#[must_use]
pub fn prepare_filter_inputs(
    stored: Option<&Value>,
    filterable_fields: &[ReportViewField],
) -> Vec<FilterInput> {
    let parsed = match stored {
        Some(Value::String(text)) => serde_json::from_str::<Value>(text).ok(),
        Some(other) => Some(other.clone()),
        None => None,
    };

    let (names, defaults) = match parsed {
        Some(Value::Object(mut map)) => match map.remove("conditions") {
            Some(Value::Array(conditions)) if map.is_empty() => {
                named_entries(&conditions, true)
            }
            Some(other) => {
                map.insert("conditions".to_owned(), other);
                (map.keys().cloned().collect(), map)
            }
            None => (map.keys().cloned().collect(), map),
        },
        Some(Value::Array(entries)) => named_entries(&entries, false),
        _ => (Vec::new(), Map::new()),
    };

    let names: Vec<String> = names
        .into_iter()
        .filter(|name| !name.trim().is_empty())
        .collect();

    if names.is_empty() {
        return filterable_fields
            .iter()
            .map(|field| FilterInput {
                name: field.field_name.clone(),
                display: field.label().to_owned(),
                field_type: field
                    .field_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FIELD_TYPE.to_owned()),
                value: Value::String(String::new()),
            })
            .collect();
    }

    names
        .into_iter()
        .map(|stored_name| {
            let name = stored_name.trim().to_owned();
            let meta = find_field(filterable_fields, &name);
            let display = meta
                .and_then(|field| field.display_name.clone())
                .filter(|label| !label.trim().is_empty())
                .or_else(|| meta.map(|field| field.field_name.clone()))
                .unwrap_or_else(|| prettify_field_name(&name));
            let field_type = meta
                .and_then(|field| field.field_type.clone())
                .unwrap_or_else(|| DEFAULT_FIELD_TYPE.to_owned());
            let value = defaults
                .get(&stored_name)
                .or_else(|| defaults.get(&name))
                .or_else(|| defaults.get(&name.to_lowercase()))
                .cloned()
                .unwrap_or_else(|| Value::String(String::new()));

            FilterInput {
                name,
                display,
                field_type,
                value,
            }
        })
        .collect()
}

fn named_entries(entries: &[Value], values_as_defaults: bool) -> (Vec<String>, Map<String, Value>) {
    let mut names = Vec::new();
    let mut defaults = Map::new();

    for entry in entries {
        match entry {
            Value::String(name) => names.push(name.clone()),
            Value::Object(object) => {
                let name = ["fieldName", "name", "field"]
                    .iter()
                    .find_map(|key| object.get(*key).and_then(Value::as_str));
                if let Some(name) = name {
                    if values_as_defaults && let Some(value) = object.get("value") {
                        defaults.insert(name.to_owned(), value.clone());
                    }
                    names.push(name.to_owned());
                }
            }
            _ => {}
        }
    }

    (names, defaults)
}

fn find_field<'a>(fields: &'a [ReportViewField], name: &str) -> Option<&'a ReportViewField> {
    let needle = name.trim().to_lowercase();
    fields.iter().find(|field| {
        field.field_name.trim().to_lowercase() == needle
            || field
                .display_name
                .as_deref()
                .is_some_and(|label| label.trim().to_lowercase() == needle)
    })
}

/// Turns `startTime`, `start_time`, or `start-time` into `Start Time`.
#[must_use]
pub fn prettify_field_name(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len() + 4);
    let mut previous_lower = false;
    for character in name.chars() {
        if character.is_uppercase() && previous_lower {
            spaced.push(' ');
        }
        previous_lower = character.is_lowercase() || character.is_ascii_digit();
        spaced.push(if character == '_' || character == '-' {
            ' '
        } else {
            character
        });
    }

    spaced
        .split_whitespace()
        .map(|word| {
            let mut characters = word.chars();
            match characters.next() {
                Some(first) => first.to_uppercase().chain(characters).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// A saved report prepared for an ad-hoc run.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedReport {
    /// The saved definition.
    pub report: Report,
    /// Filter prompts derived from the stored block.
    pub inputs: Vec<FilterInput>,
}

/// Single-page report runner: pick a report, fill filters, run or queue it.
#[derive(Clone)]
pub struct ReportRunner {
    gateway: ApiGateway,
}

impl ReportRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new(gateway: ApiGateway) -> Self {
        Self { gateway }
    }

    /// Loads a report and derives its filter prompts.
    ///
    /// When the view's filterable fields cannot be loaded the prompts are
    /// built without field metadata.
    pub async fn load_report(&self, report_id: i64) -> AppResult<PreparedReport> {
        let report: Report = self
            .gateway
            .get_json(&format!("/api/reports/{report_id}"), &[])
            .await?;

        let filterable: Vec<ReportViewField> = match report.view_id {
            Some(view_id) => {
                let path = format!("/api/report-views/{view_id}/fields/filterable");
                match self.gateway.get_json::<Value>(&path, &[]).await {
                    Ok(payload) => decode_rows(payload),
                    Err(error) => {
                        tracing::warn!(report_id, error = %error, "filterable fields unavailable");
                        Vec::new()
                    }
                }
            }
            None => Vec::new(),
        };

        let inputs = prepare_filter_inputs(report.filter_conditions.as_ref(), &filterable);
        Ok(PreparedReport { report, inputs })
    }

    /// Runs the report synchronously and returns the result rows.
    pub async fn run(&self, report: &Report, inputs: &[FilterInput]) -> AppResult<Vec<Value>> {
        let view_id = report
            .view_id
            .ok_or_else(|| AppError::Validation("report has no data source".to_owned()))?;
        let filter_condition: Map<String, Value> = inputs
            .iter()
            .filter(|input| input.is_set())
            .map(|input| (input.name.clone(), input.value.clone()))
            .collect();
        let body = json!({
            "select_columns": report.selected_columns,
            "view_id": view_id,
            "filter_condition": filter_condition,
        });

        let payload: Value = self
            .gateway
            .post_json(&format!("{EXECUTIONS_PATH}/run/{}", report.id), &body)
            .await?;
        let rows: Vec<Value> = decode_rows(payload);
        tracing::info!(report_id = report.id, rows = rows.len(), "report run finished");
        Ok(rows)
    }

    /// Queues a file generation for the report.
    pub async fn request_generation(&self, report_id: i64) -> AppResult<ReportExecution> {
        let execution: ReportExecution = self
            .gateway
            .post_json(
                &format!("{EXECUTIONS_PATH}/generate/{report_id}"),
                &json!({}),
            )
            .await?;
        tracing::info!(
            report_id,
            execution_id = execution.id,
            status = execution.status.as_str(),
            "report generation requested"
        );
        Ok(execution)
    }
}
