use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use kkvat_core::{AppError, AppResult};
use kkvat_domain::{ExecutionStatus, ExecutionType, ReportExecution};

use crate::api_gateway::ApiGateway;
use crate::gateway_ports::DownloadSink;
use crate::list_envelope::decode_page;

const EXECUTIONS_PATH: &str = "/api/report-executions";

/// Default page size of the history screen.
pub const DEFAULT_HISTORY_PAGE_SIZE: u32 = 10;

/// Which executions the history lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionScope {
    /// Executions with a file the current user may download.
    #[default]
    Downloadable,
    /// Executions started by the current user.
    Mine,
    /// Executions of one report.
    Report(i64),
}

impl ExecutionScope {
    fn path(self) -> String {
        match self {
            Self::Downloadable => format!("{EXECUTIONS_PATH}/download-list"),
            Self::Mine => format!("{EXECUTIONS_PATH}/my-executions"),
            Self::Report(report_id) => format!("{EXECUTIONS_PATH}/report/{report_id}"),
        }
    }
}

/// Local filters over the fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionFilters {
    /// Keep only this status.
    pub status: Option<ExecutionStatus>,
    /// Keep only this trigger.
    pub execution_type: Option<ExecutionType>,
    /// Keep executions created on or after this day.
    pub date_from: Option<NaiveDate>,
    /// Keep executions created on or before this day.
    pub date_to: Option<NaiveDate>,
}

impl ExecutionFilters {
    /// Returns whether no filter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Returns whether `execution` passes every set filter.
    ///
    /// Date filters compare against `createdAt`; executions without one are
    /// dropped while a date filter is set.
    #[must_use]
    pub fn matches(&self, execution: &ReportExecution) -> bool {
        if self.status.is_some_and(|status| status != execution.status) {
            return false;
        }
        if self
            .execution_type
            .is_some_and(|execution_type| execution_type != execution.execution_type)
        {
            return false;
        }
        if self.date_from.is_none() && self.date_to.is_none() {
            return true;
        }

        let Some(created_at) = execution.created_at else {
            return false;
        };
        let after_start = self
            .date_from
            .is_none_or(|from| created_at >= from.and_time(NaiveTime::MIN));
        let before_end = self
            .date_to
            .is_none_or(|to| created_at <= end_of_day(to));
        after_start && before_end
    }
}

fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
        .map_or_else(|| day.and_time(NaiveTime::MIN), |time| day.and_time(time))
}

/// Point-in-time view of the history screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySnapshot {
    /// Rows of the current page that pass the filters.
    pub executions: Vec<ReportExecution>,
    /// Zero-based page index.
    pub page: u32,
    /// `ceil(total_executions / page_size)`.
    pub total_pages: u32,
    /// Server row count, unaffected by local filters.
    pub total_executions: u64,
    /// Active filters.
    pub filters: ExecutionFilters,
}

#[derive(Default)]
struct HistoryState {
    scope: ExecutionScope,
    fetched: Vec<ReportExecution>,
    page: u32,
    total_executions: u64,
    filters: ExecutionFilters,
}

/// Paged execution history with local filtering and file download.
pub struct ExecutionHistory {
    gateway: ApiGateway,
    sink: Arc<dyn DownloadSink>,
    page_size: u32,
    state: RwLock<HistoryState>,
    downloading: Mutex<HashSet<i64>>,
}

impl ExecutionHistory {
    /// Creates a history over downloadable executions.
    #[must_use]
    pub fn new(gateway: ApiGateway, sink: Arc<dyn DownloadSink>, page_size: u32) -> Self {
        Self {
            gateway,
            sink,
            page_size: page_size.max(1),
            state: RwLock::new(HistoryState::default()),
            downloading: Mutex::new(HashSet::new()),
        }
    }

    /// Sets the listed scope before the first load.
    #[must_use]
    pub fn with_scope(mut self, scope: ExecutionScope) -> Self {
        self.state.get_mut().scope = scope;
        self
    }

    /// Sets the filters before the first load.
    #[must_use]
    pub fn with_filters(mut self, filters: ExecutionFilters) -> Self {
        self.state.get_mut().filters = filters;
        self
    }

    /// Switches the listed scope and loads its first page.
    pub async fn set_scope(&self, scope: ExecutionScope) -> AppResult<()> {
        {
            let mut state = self.state.write().await;
            state.scope = scope;
            state.page = 0;
        }
        self.load().await
    }

    /// Fetches the current page.
    pub async fn load(&self) -> AppResult<()> {
        let (scope, page) = {
            let state = self.state.read().await;
            (state.scope, state.page)
        };
        let query = [("page", page.to_string()), ("size", self.page_size.to_string())];

        let payload: Value = self.gateway.get_json(&scope.path(), &query).await?;
        let fetched = decode_page::<ReportExecution>(payload);

        let mut state = self.state.write().await;
        state.total_executions = fetched.total();
        state.fetched = fetched.rows;
        tracing::debug!(
            ?scope,
            page,
            rows = state.fetched.len(),
            total = state.total_executions,
            "execution history loaded"
        );
        Ok(())
    }

    /// Fetches `page` directly, keeping scope and filters.
    pub async fn load_page(&self, page: u32) -> AppResult<()> {
        self.state.write().await.page = page;
        self.load().await
    }

    /// Returns the visible rows and paging state.
    pub async fn snapshot(&self) -> HistorySnapshot {
        let state = self.state.read().await;
        HistorySnapshot {
            executions: state
                .fetched
                .iter()
                .filter(|execution| state.filters.matches(execution))
                .cloned()
                .collect(),
            page: state.page,
            total_pages: self.page_count(state.total_executions),
            total_executions: state.total_executions,
            filters: state.filters.clone(),
        }
    }

    /// Replaces the filters and reloads from page 0.
    pub async fn apply_filters(&self, filters: ExecutionFilters) -> AppResult<()> {
        {
            let mut state = self.state.write().await;
            state.filters = filters;
            state.page = 0;
        }
        self.load().await
    }

    /// Clears the filters and reloads from page 0.
    pub async fn reset_filters(&self) -> AppResult<()> {
        self.apply_filters(ExecutionFilters::default()).await
    }

    /// Moves to the next page when one exists. Returns whether it moved.
    pub async fn next_page(&self) -> AppResult<bool> {
        {
            let mut state = self.state.write().await;
            if state.page + 1 >= self.page_count(state.total_executions) {
                return Ok(false);
            }
            state.page += 1;
        }
        self.load().await.map(|()| true)
    }

    /// Moves to the previous page when one exists. Returns whether it moved.
    pub async fn previous_page(&self) -> AppResult<bool> {
        {
            let mut state = self.state.write().await;
            if state.page == 0 {
                return Ok(false);
            }
            state.page -= 1;
        }
        self.load().await.map(|()| true)
    }

    /// Fetches one execution.
    pub async fn get(&self, execution_id: i64) -> AppResult<ReportExecution> {
        self.gateway
            .get_json(&format!("{EXECUTIONS_PATH}/{execution_id}"), &[])
            .await
    }

    /// Downloads the file of a completed execution into the sink.
    pub async fn download(&self, execution: &ReportExecution) -> AppResult<PathBuf> {
        if execution.status != ExecutionStatus::Completed {
            return Err(AppError::Validation(
                "report is not ready for download".to_owned(),
            ));
        }
        if !self.downloading.lock().await.insert(execution.id) {
            return Err(AppError::Conflict(format!(
                "execution {} is already downloading",
                execution.id
            )));
        }

        let result = self.fetch_file(execution).await;
        self.downloading.lock().await.remove(&execution.id);
        result
    }

    /// Returns whether a download of `execution_id` is in flight.
    pub async fn is_downloading(&self, execution_id: i64) -> bool {
        self.downloading.lock().await.contains(&execution_id)
    }

    async fn fetch_file(&self, execution: &ReportExecution) -> AppResult<PathBuf> {
        let bytes = self
            .gateway
            .get_bytes(&format!("{EXECUTIONS_PATH}/download/{}", execution.id))
            .await?;
        let size = bytes.len();
        let path = self
            .sink
            .store(&execution.download_file_name(), bytes)
            .await?;
        tracing::info!(execution_id = execution.id, bytes = size, path = %path.display(), "report downloaded");
        Ok(path)
    }

    fn page_count(&self, total: u64) -> u32 {
        u32::try_from(total.div_ceil(u64::from(self.page_size))).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests;
