use kkvat_core::{AppError, AppResult};
use kkvat_domain::{
    EntityConfig, Group, GroupDraft, MenuItem, MenuItemDraft, Report, ReportRequest,
    ReportSchedule, Role, RoleDraft, ScheduleRequest, TestCase, TestCaseDraft, User, UserDraft,
};

use super::{ConsoleResource, Listing, SearchMode};

fn require_name(label: &str, name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation(format!("{label} name is required")));
    }

    Ok(())
}

/// Back-office users.
pub struct Users;

impl ConsoleResource for Users {
    const LABEL: &'static str = "users";
    const BASE_PATH: &'static str = "/api/users";
    const LISTING: Listing = Listing::Paged;
    const SEARCH: SearchMode = SearchMode::Server;

    type Model = User;
    type Draft = UserDraft;

    fn id(model: &User) -> i64 {
        model.id
    }

    fn validate(draft: &UserDraft) -> AppResult<()> {
        draft.validate()
    }
}

/// User groups.
pub struct Groups;

impl ConsoleResource for Groups {
    const LABEL: &'static str = "groups";
    const BASE_PATH: &'static str = "/api/groups";
    const LISTING: Listing = Listing::Paged;
    const SEARCH: SearchMode = SearchMode::Server;

    type Model = Group;
    type Draft = GroupDraft;

    fn id(model: &Group) -> i64 {
        model.id
    }

    fn validate(draft: &GroupDraft) -> AppResult<()> {
        require_name("group", &draft.name)
    }
}

/// Roles; the backend returns them unpaged so search runs locally.
pub struct Roles;

impl ConsoleResource for Roles {
    const LABEL: &'static str = "roles";
    const BASE_PATH: &'static str = "/api/roles";
    const LISTING: Listing = Listing::Full;
    const SEARCH: SearchMode = SearchMode::Client;

    type Model = Role;
    type Draft = RoleDraft;

    fn id(model: &Role) -> i64 {
        model.id
    }

    fn matches(model: &Role, keyword: &str) -> bool {
        model.matches_keyword(keyword)
    }

    fn validate(draft: &RoleDraft) -> AppResult<()> {
        require_name("role", &draft.name)
    }
}

/// Navigation menu items.
pub struct MenuItems;

impl ConsoleResource for MenuItems {
    const LABEL: &'static str = "menu items";
    const BASE_PATH: &'static str = "/api/menu-items";
    const LISTING: Listing = Listing::Full;
    const SEARCH: SearchMode = SearchMode::Unsupported;

    type Model = MenuItem;
    type Draft = MenuItemDraft;

    fn id(model: &MenuItem) -> i64 {
        model.id
    }

    fn validate(draft: &MenuItemDraft) -> AppResult<()> {
        require_name("menu item", &draft.name)
    }
}

/// Recorded test cases.
pub struct TestCases;

impl ConsoleResource for TestCases {
    const LABEL: &'static str = "test cases";
    const BASE_PATH: &'static str = "/api/test-cases";
    const LISTING: Listing = Listing::FullAt("/list");
    const SEARCH: SearchMode = SearchMode::Unsupported;

    type Model = TestCase;
    type Draft = TestCaseDraft;

    fn id(model: &TestCase) -> i64 {
        model.id
    }

    fn validate(draft: &TestCaseDraft) -> AppResult<()> {
        draft.validate()
    }
}

/// Saved reports.
pub struct Reports;

impl ConsoleResource for Reports {
    const LABEL: &'static str = "reports";
    const BASE_PATH: &'static str = "/api/reports";
    const LISTING: Listing = Listing::Paged;
    const SEARCH: SearchMode = SearchMode::Server;

    type Model = Report;
    type Draft = ReportRequest;

    fn id(model: &Report) -> i64 {
        model.id
    }

    fn validate(draft: &ReportRequest) -> AppResult<()> {
        require_name("report", &draft.name)?;
        if draft.selected_columns.is_empty() {
            return Err(AppError::Validation(
                "select at least one column".to_owned(),
            ));
        }

        Ok(())
    }
}

/// Report schedules.
pub struct ReportSchedules;

impl ConsoleResource for ReportSchedules {
    const LABEL: &'static str = "report schedules";
    const BASE_PATH: &'static str = "/api/report-schedules";
    const LISTING: Listing = Listing::Paged;
    const SEARCH: SearchMode = SearchMode::Unsupported;

    type Model = ReportSchedule;
    type Draft = ScheduleRequest;

    fn id(model: &ReportSchedule) -> i64 {
        model.id
    }
}

/// Entity definitions for the code generator.
pub struct EntityConfigs;

impl ConsoleResource for EntityConfigs {
    const LABEL: &'static str = "entity configurations";
    const BASE_PATH: &'static str = "/api/entity-management";
    const LISTING: Listing = Listing::Full;
    const SEARCH: SearchMode = SearchMode::Unsupported;

    type Model = EntityConfig;
    type Draft = EntityConfig;

    fn id(model: &EntityConfig) -> i64 {
        model.id.unwrap_or_default()
    }

    fn validate(draft: &EntityConfig) -> AppResult<()> {
        require_name("entity", &draft.entity_name)
    }
}
