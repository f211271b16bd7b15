pub mod client;
pub mod export_schedule;
pub mod filter_preset;
pub mod report;
pub mod role;
pub mod settings;
pub mod tenant;
pub mod user;

pub use client::{Client, ClientStatus, CreateClient, UpdateClient};
pub use export_schedule::{
    BulkScheduleAction, CreateExportSchedule, ExportFrequency, ExportSchedule, UpdateExportSchedule,
};
pub use filter_preset::{CreateFilterPreset, FilterPreset, UpdateFilterPreset};
pub use report::{CreateReport, ExecutionStatus, Report, ReportExecution, UpdateReport};
pub use role::{CreateRole, Role, UpdateRole};
pub use settings::UserManagementSettings;
pub use tenant::Tenant;
pub use user::{CreateUser, UpdateUser, User, UserRole, UserStatus};
