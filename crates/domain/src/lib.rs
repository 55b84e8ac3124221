//! Domain entities, invariants, and payload normalizers for the kkvat console.

#![forbid(unsafe_code)]

mod flags;
mod menu;
mod metadata;
mod report;
mod schedule;
mod security;
mod test_case;
mod user;
mod view;

pub use flags::{coerce_flag, deserialize_lenient_bool, is_truthy_flag};
pub use menu::{MenuItem, MenuItemDraft, MenuNode, build_menu_tree};
pub use metadata::{
    EntityColumn, EntityConfig, GeneratedArtifact, GenerationOutcome, ProgressStep,
    decode_progress_steps, normalize_columns,
};
pub use report::{
    ExecutionStatus, ExecutionType, Report, ReportExecution, ReportRequest, ReportType,
    format_duration, format_file_size,
};
pub use schedule::{ReportSchedule, ScheduleDraft, ScheduleFrequency, ScheduleRequest};
pub use security::{Group, GroupDraft, GroupMembership, Role, RoleDraft, RoleMenuAssignment};
pub use test_case::{TestCase, TestCaseDraft, TestCaseStatus};
pub use user::{User, UserDraft};
pub use view::{
    FilterCondition, FilterConditions, FilterOperator, ReportView, ReportViewField,
    SortConfig, SortDirection,
};
