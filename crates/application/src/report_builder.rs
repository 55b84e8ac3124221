use serde_json::{Map, Value};

use kkvat_core::{AppError, AppResult};
use kkvat_domain::{
    FilterCondition, FilterConditions, Report, ReportRequest, ReportType, ReportView,
    ReportViewField, SortConfig, SortDirection,
};

use crate::api_gateway::ApiGateway;
use crate::list_envelope::decode_rows;

const REPORT_VIEWS_PATH: &str = "/api/report-views";
const REPORTS_PATH: &str = "/api/reports";
const MIN_NAME_LEN: usize = 3;
const PREVIEW_PLACEHOLDER: &str = "sample";

/// Steps of the report builder wizard, in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    /// Name, description, type, and source view.
    #[default]
    Details,
    /// Column selection.
    Columns,
    /// Filter conditions.
    Filters,
    /// Sort rules.
    Sorting,
    /// Local preview and save.
    PreviewAndSave,
}

impl WizardStep {
    /// Returns the 1-based step number.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::Details => 1,
            Self::Columns => 2,
            Self::Filters => 3,
            Self::Sorting => 4,
            Self::PreviewAndSave => 5,
        }
    }

    /// Returns the step heading.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Details => "Report Details",
            Self::Columns => "Select Columns",
            Self::Filters => "Add Filters",
            Self::Sorting => "Configure Sorting",
            Self::PreviewAndSave => "Preview & Save",
        }
    }

    fn following(self) -> Self {
        match self {
            Self::Details => Self::Columns,
            Self::Columns => Self::Filters,
            Self::Filters => Self::Sorting,
            Self::Sorting | Self::PreviewAndSave => Self::PreviewAndSave,
        }
    }

    fn preceding(self) -> Self {
        match self {
            Self::Details | Self::Columns => Self::Details,
            Self::Filters => Self::Columns,
            Self::Sorting => Self::Filters,
            Self::PreviewAndSave => Self::Sorting,
        }
    }
}

/// Free-form fields of the first wizard step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDetails {
    /// Report name, at least three characters once trimmed.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Category.
    pub report_type: ReportType,
    /// Visible to every user.
    pub is_public: bool,
}

impl Default for ReportDetails {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            report_type: ReportType::Execution,
            is_public: false,
        }
    }
}

/// Five-step wizard that builds or edits a saved report.
///
/// Only [`ReportBuilder::save`] and the view/field loaders touch the network;
/// navigation, selection, and preview are local.
pub struct ReportBuilder {
    gateway: ApiGateway,
    step: WizardStep,
    details: ReportDetails,
    views: Vec<ReportView>,
    view_id: Option<i64>,
    all_fields: Vec<ReportViewField>,
    filterable_fields: Vec<ReportViewField>,
    sortable_fields: Vec<ReportViewField>,
    selected_columns: Vec<String>,
    filters: Vec<FilterCondition>,
    sorts: Vec<SortConfig>,
    preview: Vec<Value>,
    editing_id: Option<i64>,
}

impl ReportBuilder {
    /// Creates an empty wizard on the first step.
    #[must_use]
    pub fn new(gateway: ApiGateway) -> Self {
        Self {
            gateway,
            step: WizardStep::Details,
            details: ReportDetails::default(),
            views: Vec::new(),
            view_id: None,
            all_fields: Vec::new(),
            filterable_fields: Vec::new(),
            sortable_fields: Vec::new(),
            selected_columns: Vec::new(),
            filters: Vec::new(),
            sorts: Vec::new(),
            preview: Vec::new(),
            editing_id: None,
        }
    }

    /// Fetches the views a report can be built from.
    pub async fn load_views(&mut self) -> AppResult<&[ReportView]> {
        let payload: Value = self.gateway.get_json(REPORT_VIEWS_PATH, &[]).await?;
        self.views = decode_rows(payload);
        Ok(&self.views)
    }

    /// Returns the loaded views.
    #[must_use]
    pub fn views(&self) -> &[ReportView] {
        &self.views
    }

    /// Returns the current step.
    #[must_use]
    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Returns the report being edited, `None` when creating.
    #[must_use]
    pub fn editing_id(&self) -> Option<i64> {
        self.editing_id
    }

    /// Returns the first-step fields.
    #[must_use]
    pub fn details(&self) -> &ReportDetails {
        &self.details
    }

    /// Returns the first-step fields for editing.
    pub fn details_mut(&mut self) -> &mut ReportDetails {
        &mut self.details
    }

    /// Returns the selected view.
    #[must_use]
    pub fn view_id(&self) -> Option<i64> {
        self.view_id
    }

    /// Selects a source view, loads its fields, and clears the column selection.
    pub async fn select_view(&mut self, view_id: i64) -> AppResult<()> {
        self.load_fields(view_id).await?;
        self.view_id = Some(view_id);
        self.selected_columns.clear();
        Ok(())
    }

    /// Returns every field of the selected view.
    #[must_use]
    pub fn fields(&self) -> &[ReportViewField] {
        &self.all_fields
    }

    /// Returns the filterable fields of the selected view.
    #[must_use]
    pub fn filterable_fields(&self) -> &[ReportViewField] {
        &self.filterable_fields
    }

    /// Returns the sortable fields of the selected view.
    #[must_use]
    pub fn sortable_fields(&self) -> &[ReportViewField] {
        &self.sortable_fields
    }

    /// Adds or removes a column, keeping first-selection order. Returns
    /// whether the column is selected afterwards.
    pub fn toggle_column(&mut self, field_name: &str) -> bool {
        if let Some(position) = self
            .selected_columns
            .iter()
            .position(|selected| selected == field_name)
        {
            self.selected_columns.remove(position);
            false
        } else {
            self.selected_columns.push(field_name.to_owned());
            true
        }
    }

    /// Returns the selected columns in selection order.
    #[must_use]
    pub fn selected_columns(&self) -> &[String] {
        &self.selected_columns
    }

    /// Appends a filter on the first filterable field.
    pub fn add_filter(&mut self) {
        let field = self
            .filterable_fields
            .first()
            .map(|field| field.field_name.clone())
            .unwrap_or_default();
        self.filters.push(FilterCondition::on(field));
    }

    /// Removes the filter at `index`; out of range is a no-op.
    pub fn remove_filter(&mut self, index: usize) -> bool {
        if index >= self.filters.len() {
            return false;
        }

        self.filters.remove(index);
        true
    }

    /// Replaces the filter at `index`; out of range is a no-op.
    pub fn update_filter(&mut self, index: usize, condition: FilterCondition) -> bool {
        match self.filters.get_mut(index) {
            Some(slot) => {
                *slot = condition;
                true
            }
            None => false,
        }
    }

    /// Returns the filter conditions.
    #[must_use]
    pub fn filters(&self) -> &[FilterCondition] {
        &self.filters
    }

    /// Appends an ascending sort on the first sortable field.
    pub fn add_sort(&mut self) {
        let field = self
            .sortable_fields
            .first()
            .map(|field| field.field_name.clone())
            .unwrap_or_default();
        self.sorts.push(SortConfig {
            field,
            direction: SortDirection::Asc,
        });
    }

    /// Removes the sort at `index`; out of range is a no-op.
    pub fn remove_sort(&mut self, index: usize) -> bool {
        if index >= self.sorts.len() {
            return false;
        }

        self.sorts.remove(index);
        true
    }

    /// Replaces the sort at `index`; out of range is a no-op.
    pub fn update_sort(&mut self, index: usize, sort: SortConfig) -> bool {
        match self.sorts.get_mut(index) {
            Some(slot) => {
                *slot = sort;
                true
            }
            None => false,
        }
    }

    /// Swaps the sort at `index` with its predecessor.
    pub fn move_sort_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.sorts.len() {
            return false;
        }

        self.sorts.swap(index, index - 1);
        true
    }

    /// Swaps the sort at `index` with its successor.
    pub fn move_sort_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.sorts.len() {
            return false;
        }

        self.sorts.swap(index, index + 1);
        true
    }

    /// Returns the sort rules in priority order.
    #[must_use]
    pub fn sorts(&self) -> &[SortConfig] {
        &self.sorts
    }

    /// Advances after validating the current step only.
    pub fn next(&mut self) -> AppResult<WizardStep> {
        self.validate_step(self.step)?;
        self.step = self.step.following();
        Ok(self.step)
    }

    /// Goes back one step without validating.
    pub fn previous(&mut self) -> WizardStep {
        self.step = self.step.preceding();
        self.step
    }

    /// Checks the requirements of one step.
    pub fn validate_step(&self, step: WizardStep) -> AppResult<()> {
        match step {
            WizardStep::Details => {
                if self.details.name.trim().chars().count() < MIN_NAME_LEN {
                    return Err(AppError::Validation(format!(
                        "report name must be at least {MIN_NAME_LEN} characters"
                    )));
                }
                if self.view_id.is_none() {
                    return Err(AppError::Validation(
                        "please select a data source".to_owned(),
                    ));
                }
                Ok(())
            }
            WizardStep::Columns => {
                if self.selected_columns.is_empty() {
                    return Err(AppError::Validation(
                        "please select at least one column".to_owned(),
                    ));
                }
                Ok(())
            }
            WizardStep::Filters | WizardStep::Sorting | WizardStep::PreviewAndSave => Ok(()),
        }
    }

    /// Produces placeholder preview rows; no data is fetched.
    pub fn preview(&mut self) -> AppResult<&[Value]> {
        if self.view_id.is_none() {
            return Err(AppError::Validation(
                "please select a data source first".to_owned(),
            ));
        }
        self.validate_step(WizardStep::Columns)?;

        let row: Map<String, Value> = self
            .selected_columns
            .iter()
            .map(|column| (column.clone(), Value::String(PREVIEW_PLACEHOLDER.to_owned())))
            .collect();
        self.preview = vec![Value::Object(row)];
        Ok(&self.preview)
    }

    /// Assembles the request body, failing on any local validation error.
    pub fn build_request(&self) -> AppResult<ReportRequest> {
        self.validate_step(WizardStep::Details)?;
        self.validate_step(WizardStep::Columns)?;
        let view_id = self
            .view_id
            .ok_or_else(|| AppError::Validation("please select a data source".to_owned()))?;

        let filter_conditions = if self.filters.is_empty() {
            None
        } else {
            Some(encode(&FilterConditions {
                conditions: self.filters.clone(),
            })?)
        };
        let sort_config = if self.sorts.is_empty() {
            None
        } else {
            Some(encode(&self.sorts)?)
        };

        Ok(ReportRequest {
            name: self.details.name.trim().to_owned(),
            description: self.details.description.clone(),
            view_id,
            selected_columns: self.selected_columns.clone(),
            filter_conditions,
            sort_config,
            report_type: self.details.report_type,
            is_public: self.details.is_public,
        })
    }

    /// Validates locally, then creates or updates the report.
    pub async fn save(&mut self) -> AppResult<Report> {
        let request = self.build_request()?;

        let saved: Report = match self.editing_id {
            Some(id) => {
                self.gateway
                    .put_json(&format!("{REPORTS_PATH}/{id}"), &request)
                    .await?
            }
            None => self.gateway.post_json(REPORTS_PATH, &request).await?,
        };

        tracing::info!(report_id = saved.id, name = %saved.name, "report saved");
        self.editing_id = Some(saved.id);
        Ok(saved)
    }

    /// Loads an existing report into the wizard for editing.
    pub async fn edit(&mut self, report: &Report) -> AppResult<()> {
        if let Some(view_id) = report.view_id {
            self.load_fields(view_id).await?;
        }

        self.editing_id = Some(report.id);
        self.step = WizardStep::Details;
        self.view_id = report.view_id;
        self.details = ReportDetails {
            name: report.name.clone(),
            description: report.description.clone().unwrap_or_default(),
            report_type: report.report_type,
            is_public: report.is_public,
        };
        self.selected_columns = report.selected_columns.clone();
        self.filters = stored_filters(report.filter_conditions.as_ref());
        self.sorts = stored_sorts(report.sort_config.as_ref());
        self.preview.clear();
        Ok(())
    }

    async fn load_fields(&mut self, view_id: i64) -> AppResult<()> {
        let fields_path = format!("{REPORT_VIEWS_PATH}/{view_id}/fields");
        let payload: Value = self.gateway.get_json(&fields_path, &[]).await?;
        let all_fields: Vec<ReportViewField> = decode_rows(payload);

        let filterable = self
            .field_subset(&format!("{fields_path}/filterable"))
            .await
            .unwrap_or_else(|| {
                all_fields
                    .iter()
                    .filter(|field| field.is_filterable)
                    .cloned()
                    .collect()
            });
        let sortable = self
            .field_subset(&format!("{fields_path}/sortable"))
            .await
            .unwrap_or_else(|| {
                all_fields
                    .iter()
                    .filter(|field| field.is_sortable)
                    .cloned()
                    .collect()
            });

        self.all_fields = all_fields;
        self.filterable_fields = filterable;
        self.sortable_fields = sortable;
        Ok(())
    }

    async fn field_subset(&self, path: &str) -> Option<Vec<ReportViewField>> {
        match self.gateway.get_json::<Value>(path, &[]).await {
            Ok(payload) => Some(decode_rows(payload)),
            Err(error) => {
                tracing::warn!(path, error = %error, "falling back to field flags");
                None
            }
        }
    }
}

fn encode<T: serde::Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value)
        .map_err(|error| AppError::Internal(format!("failed to encode report block: {error}")))
}

fn stored_filters(raw: Option<&Value>) -> Vec<FilterCondition> {
    let conditions = match raw {
        Some(Value::Object(map)) => map.get("conditions"),
        Some(array @ Value::Array(_)) => Some(array),
        _ => None,
    };

    conditions
        .and_then(|conditions| serde_json::from_value(conditions.clone()).ok())
        .unwrap_or_default()
}

fn stored_sorts(raw: Option<&Value>) -> Vec<SortConfig> {
    match raw {
        Some(Value::Array(_)) => raw
            .and_then(|sorts| serde_json::from_value(sorts.clone()).ok())
            .unwrap_or_default(),
        Some(single @ Value::Object(_)) => serde_json::from_value(single.clone())
            .map(|sort| vec![sort])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests;
