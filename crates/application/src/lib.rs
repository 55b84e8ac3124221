//! Application services and ports for the kkvat console.

#![forbid(unsafe_code)]

mod api_gateway;
mod auth_service;
mod entity_management_service;
mod execution_history;
mod gateway_ports;
mod generation_progress;
mod list_envelope;
mod list_screen;
mod report_builder;
mod report_runner;
mod schedule_service;
mod security_admin_service;
mod session_context;

#[cfg(test)]
mod test_support;

pub use api_gateway::{ApiGateway, LOGIN_PATH};
pub use auth_service::{AuthService, LoginOutcome};
pub use entity_management_service::{EntityCreation, EntityManagementService};
pub use execution_history::{
    DEFAULT_HISTORY_PAGE_SIZE, ExecutionFilters, ExecutionHistory, ExecutionScope,
    HistorySnapshot,
};
pub use gateway_ports::{
    ApiRequest, ApiResponse, DownloadSink, HttpTransport, PersistedSession, SessionStore,
};
pub use generation_progress::{DEFAULT_PROGRESS_INTERVAL, GenerationProgressMonitor};
pub use list_envelope::{Page, decode_page, decode_rows};
pub use list_screen::{
    ConsoleResource, EntityConfigs, Groups, ListScreen, ListSnapshot, ListState, Listing,
    MenuItems, ReportSchedules, Reports, Roles, SearchMode, TestCases, Users,
};
pub use report_builder::{ReportBuilder, ReportDetails, WizardStep};
pub use report_runner::{
    FilterInput, PreparedReport, ReportRunner, prepare_filter_inputs, prettify_field_name,
};
pub use schedule_service::ScheduleService;
pub use security_admin_service::SecurityAdminService;
pub use session_context::SessionContext;
