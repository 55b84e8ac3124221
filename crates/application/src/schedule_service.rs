use serde_json::Value;

use kkvat_core::AppResult;
use kkvat_domain::{ReportSchedule, ScheduleDraft};

use crate::api_gateway::ApiGateway;
use crate::list_envelope::decode_rows;
use crate::list_screen::{ListScreen, ListSnapshot, ReportSchedules};

const SCHEDULES_PATH: &str = "/api/report-schedules";

/// Recurring report runs: paged list plus validated create/update/delete.
pub struct ScheduleService {
    gateway: ApiGateway,
    screen: ListScreen<ReportSchedules>,
}

impl ScheduleService {
    /// Creates a service listing `page_size` schedules per page.
    #[must_use]
    pub fn new(gateway: ApiGateway, page_size: u32) -> Self {
        Self {
            screen: ListScreen::new(gateway.clone(), page_size),
            gateway,
        }
    }

    /// Loads one page of schedules.
    pub async fn list(&self, page: u32) -> AppResult<ListSnapshot<ReportSchedule>> {
        self.screen.load(page).await?;
        Ok(self.screen.snapshot().await)
    }

    /// Reloads the current page.
    pub async fn reload(&self) -> AppResult<()> {
        self.screen.reload().await
    }

    /// Returns the last loaded page.
    pub async fn snapshot(&self) -> ListSnapshot<ReportSchedule> {
        self.screen.snapshot().await
    }

    /// Fetches one schedule.
    pub async fn get(&self, id: i64) -> AppResult<ReportSchedule> {
        self.screen.get(id).await
    }

    /// Validates and creates a schedule, then reloads.
    pub async fn create(&self, draft: &ScheduleDraft) -> AppResult<Value> {
        let request = draft.to_request()?;
        self.screen.create(&request).await
    }

    /// Validates and replaces a schedule, then reloads.
    pub async fn update(&self, id: i64, draft: &ScheduleDraft) -> AppResult<Value> {
        let request = draft.to_request()?;
        self.screen.update(id, &request).await
    }

    /// Deletes a schedule, then reloads.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        self.screen.delete(id).await
    }

    /// Returns the schedules of one report.
    ///
    /// Rows for other reports are dropped in case the backend ignores the
    /// `reportId` parameter.
    pub async fn schedules_for_report(&self, report_id: i64) -> AppResult<Vec<ReportSchedule>> {
        let payload: Value = self
            .gateway
            .get_json(SCHEDULES_PATH, &[("reportId", report_id.to_string())])
            .await?;
        let schedules: Vec<ReportSchedule> = decode_rows(payload);
        Ok(schedules
            .into_iter()
            .filter(|schedule| schedule.report_id == report_id)
            .collect())
    }
}
