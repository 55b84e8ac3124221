use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "kkvat-console")]
#[command(about = "Operator console for the kkvat back-office API", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Backend base URL (overrides KKVAT_API_BASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in and store the session
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "KKVAT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Print the navigation menu tree
    Menu,

    /// Manage users
    Users {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage groups
    Groups {
        #[command(subcommand)]
        action: PagedListAction,
    },

    /// Manage roles
    Roles {
        #[command(subcommand)]
        action: RoleAction,
    },

    /// Manage menu items
    MenuItems {
        #[command(subcommand)]
        action: FullListAction,
    },

    /// Manage recorded test cases
    TestCases {
        #[command(subcommand)]
        action: FullListAction,
    },

    /// Show or replace the members of a group
    GroupMembers {
        #[command(subcommand)]
        action: GroupMembersAction,
    },

    /// Show or replace the menu items granted to a role
    RoleMenus {
        #[command(subcommand)]
        action: RoleMenusAction,
    },

    /// Entity definitions and code generation
    Entities {
        #[command(subcommand)]
        action: EntityAction,
    },

    /// Saved reports
    Reports {
        #[command(subcommand)]
        action: ReportAction,
    },

    /// Report execution history
    Executions {
        #[command(subcommand)]
        action: ExecutionAction,
    },

    /// Recurring report schedules
    Schedules {
        #[command(subcommand)]
        action: ScheduleAction,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// List one page of users
    List {
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Search users by keyword
    Search { keyword: String },
}

#[derive(Subcommand)]
pub enum PagedListAction {
    /// List one page, optionally filtered by keyword
    List {
        #[arg(long, default_value_t = 0)]
        page: u32,

        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum FullListAction {
    /// List every row
    List,
}

#[derive(Subcommand)]
pub enum RoleAction {
    /// List roles, optionally filtered by name or description
    List {
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum GroupMembersAction {
    /// Show current members
    Show { group_id: i64 },
    /// Replace members with the given user ids
    Set {
        group_id: i64,
        #[arg(value_delimiter = ',')]
        user_ids: Vec<i64>,
    },
}

#[derive(Subcommand)]
pub enum RoleMenusAction {
    /// Show granted menu items
    Show { role_id: i64 },
    /// Replace granted menu items
    Set {
        role_id: i64,
        #[arg(value_delimiter = ',')]
        menu_item_ids: Vec<i64>,
    },
}

#[derive(Subcommand)]
pub enum EntityAction {
    /// List entity definitions
    List,
    /// Create a definition and generate its artifacts
    Create {
        #[arg(long)]
        name: String,

        /// Table name (defaults to the entity name)
        #[arg(long)]
        table: Option<String>,

        /// JSON file holding the column list or column map
        #[arg(long, value_name = "PATH")]
        columns_file: Option<std::path::PathBuf>,
    },
    /// Regenerate artifacts for a definition
    Generate { id: i64 },
    /// List generated artifacts
    Generated,
    /// Delete a generated artifact folder
    DeleteGenerated { name: String },
    /// Follow generation progress until Ctrl-C
    Progress { name: String },
}

#[derive(Subcommand)]
pub enum ReportAction {
    /// List one page of reports
    List {
        #[arg(long, default_value_t = 0)]
        page: u32,

        #[arg(long)]
        search: Option<String>,
    },
    /// Build and save a report
    Create(CreateReportArgs),
    /// Run a report and print its rows
    Run {
        id: i64,

        /// Filter value as NAME=VALUE
        #[arg(long = "filter", value_name = "NAME=VALUE")]
        filters: Vec<String>,
    },
    /// Queue a report file generation
    Generate { id: i64 },
}

#[derive(Args)]
pub struct CreateReportArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long)]
    pub view: i64,

    #[arg(long, value_delimiter = ',', required = true)]
    pub columns: Vec<String>,

    /// Filter as FIELD:OPERATOR:VALUE
    #[arg(long = "filter", value_name = "FIELD:OP:VALUE")]
    pub filters: Vec<String>,

    /// Sort as FIELD[:ASC|DESC]
    #[arg(long = "sort", value_name = "FIELD[:DIR]")]
    pub sorts: Vec<String>,

    #[arg(long, default_value = "EXECUTION")]
    pub report_type: String,

    #[arg(long)]
    pub public: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ScopeArg {
    Downloadable,
    Mine,
}

#[derive(Subcommand)]
pub enum ExecutionAction {
    /// List executions with optional local filters
    List {
        #[arg(long, value_enum, default_value_t = ScopeArg::Downloadable)]
        scope: ScopeArg,

        /// Show executions of one report instead
        #[arg(long, conflicts_with = "scope")]
        report: Option<i64>,

        #[arg(long, default_value_t = 0)]
        page: u32,

        #[arg(long)]
        status: Option<String>,

        #[arg(long = "type")]
        execution_type: Option<String>,

        #[arg(long, value_name = "YYYY-MM-DD")]
        from: Option<NaiveDate>,

        #[arg(long, value_name = "YYYY-MM-DD")]
        to: Option<NaiveDate>,
    },
    /// Download the file of a completed execution
    Download { id: i64 },
}

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// List one page of schedules
    List {
        #[arg(long, default_value_t = 0)]
        page: u32,

        /// Only schedules of this report
        #[arg(long)]
        report: Option<i64>,
    },
    /// Create a schedule
    Create {
        #[arg(long)]
        report: i64,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "DAILY")]
        frequency: String,

        #[arg(long, default_value = "09:00", value_name = "HH:MM")]
        time: String,

        #[arg(long)]
        day_of_week: Option<u8>,

        #[arg(long)]
        day_of_month: Option<u8>,

        #[arg(long, default_value = "")]
        recipients: String,

        #[arg(long)]
        inactive: bool,
    },
    /// Delete a schedule
    Delete { id: i64 },
}
