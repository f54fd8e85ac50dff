//! Core data access for the mentoring workspace.
//! Every read and write against the shared spreadsheet goes through this crate.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ConfigError, LoggingConfig, SheetLayout, WorkspaceConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::metrics::{
    DashboardMetrics, ProgressBucket, SalesMetric, StudentSnapshot, ERROR_SENTINEL,
    UNSTARTED_BUCKET,
};
pub use model::question::{Question, QuestionStatus};
pub use model::schedule::{EventId, NewScheduleEvent, ScheduleEvent, ScheduleValidationError};
pub use model::student::{
    DirectoryEntry, GoalInfo, RowAddress, Task, TASK_STATUS_DONE, TASK_STATUS_IN_PROGRESS,
    TASK_STATUS_NOT_STARTED,
};
pub use repo::directory_repo::{DirectoryCache, DirectoryResolver, InMemoryDirectoryCache};
pub use repo::goal_repo::GoalInfoRepository;
pub use repo::question_repo::QuestionQueue;
pub use repo::sales_repo::SalesRepository;
pub use repo::schedule_repo::ScheduleStore;
pub use repo::task_repo::TaskSheetRepository;
pub use repo::{SheetError, SheetResult};
pub use service::metrics_service::MetricsAggregator;
pub use service::provisioning_service::{ProvisionedStudent, ProvisioningEngine};
pub use service::student_service::StudentService;
pub use store::{
    A1Range, CellRows, SqliteTabularStore, StoreError, StoreResult, TabId, TabInfo, TabularStore,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
