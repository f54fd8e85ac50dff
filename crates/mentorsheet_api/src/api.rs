//! Use-case API invoked once per web request.
//!
//! # Responsibility
//! - Wire one store and one config into every core component.
//! - Convert internal errors into defaults, tagged lookups or action
//!   envelopes so callers never handle `SheetError` directly.
//!
//! # Invariants
//! - No method returns `Result` or panics; failures are logged with a
//!   stable `error_code` and collapsed.
//! - Not-found outcomes log at `info`; transport and input failures at `warn`.
//! - Log lines carry ids and codes only, never question or reply text.

use log::{info, warn};
use mentorsheet_core::{
    init_logging as init_logging_inner, ConfigError, DashboardMetrics, DirectoryEntry,
    DirectoryResolver, GoalInfo, GoalInfoRepository, LoggingConfig, MetricsAggregator,
    NewScheduleEvent, ProvisioningEngine, Question, QuestionQueue, RowAddress, SalesRepository,
    ScheduleEvent, ScheduleStore, SheetError, SqliteTabularStore, StoreError, StudentService,
    Task, TabularStore, TaskSheetRepository, WorkspaceConfig,
};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;

/// Initializes core logging once per process.
///
/// Returns an empty string on success and the error message otherwise.
pub fn init_logging(config: &LoggingConfig) -> String {
    match init_logging_inner(config) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Outcome of a lookup that keeps "absent" and "unreachable" apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    /// The store or input failed; carries a diagnostic message.
    Unavailable(String),
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Generic action response envelope for write operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Identifier of the affected record (student id, event id, row).
    pub id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            ok: true,
            id: Some(id.into()),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }
}

/// Facade construction failure.
#[derive(Debug)]
pub enum DeskInitError {
    Config(ConfigError),
    Store(StoreError),
}

impl Display for DeskInitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DeskInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<ConfigError> for DeskInitError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<StoreError> for DeskInitError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Single entry point for student and admin screens.
pub struct MentorDesk {
    students: StudentService,
    questions: Arc<QuestionQueue>,
    schedule: Arc<ScheduleStore>,
    provisioning: ProvisioningEngine,
    metrics: MetricsAggregator,
}

impl MentorDesk {
    /// Builds every component over one shared store.
    ///
    /// # Errors
    /// - `DeskInitError::Config` when `config` fails validation.
    pub fn new(
        store: Arc<dyn TabularStore>,
        config: &WorkspaceConfig,
    ) -> Result<Self, DeskInitError> {
        config.validate()?;
        let resolver = Arc::new(DirectoryResolver::new(Arc::clone(&store), config));
        let questions = Arc::new(QuestionQueue::new(Arc::clone(&store), config));
        let schedule = Arc::new(ScheduleStore::new(Arc::clone(&store), config));

        let students = StudentService::new(
            Arc::clone(&resolver),
            TaskSheetRepository::new(Arc::clone(&store), &config.layout),
            GoalInfoRepository::new(Arc::clone(&store)),
        );
        let provisioning =
            ProvisioningEngine::new(Arc::clone(&store), Arc::clone(&resolver), config);
        let metrics = MetricsAggregator::new(
            resolver,
            GoalInfoRepository::new(Arc::clone(&store)),
            Arc::clone(&questions),
            Arc::clone(&schedule),
            SalesRepository::new(store, config),
        );

        Ok(Self {
            students,
            questions,
            schedule,
            provisioning,
            metrics,
        })
    }

    /// Opens (or creates) a local SQLite workspace at `path`.
    pub fn open_local(
        path: impl AsRef<Path>,
        config: &WorkspaceConfig,
    ) -> Result<Self, DeskInitError> {
        config.validate()?;
        let store = SqliteTabularStore::open(path)?;
        store.create_spreadsheet(&config.master_spreadsheet_id)?;
        Self::new(Arc::new(store), config)
    }

    pub fn get_directory_entry(&self, student_id: &str) -> Lookup<DirectoryEntry> {
        match self.students.directory_entry(student_id) {
            Ok(entry) => Lookup::Found(entry),
            Err(err) if err.is_not_found() => {
                log_failure("get_directory_entry", &err);
                Lookup::NotFound
            }
            Err(err) => {
                log_failure("get_directory_entry", &err);
                Lookup::Unavailable(err.to_string())
            }
        }
    }

    /// Tasks of one student; empty when the student or tab cannot be read.
    pub fn get_tasks(&self, student_id: &str) -> Vec<Task> {
        self.students
            .tasks(student_id)
            .unwrap_or_else(|err| collapse("get_tasks", &err))
    }

    pub fn set_task_status(
        &self,
        student_id: &str,
        row: RowAddress,
        status: &str,
    ) -> ActionResponse {
        match self.students.set_task_status(student_id, row, status) {
            Ok(()) => ActionResponse::success("Task status updated.", row.to_string()),
            Err(err) => fail("set_task_status", &err),
        }
    }

    /// Header block of one student; all-empty when it cannot be read.
    pub fn get_goal_info(&self, student_id: &str) -> GoalInfo {
        self.students
            .goal_info(student_id)
            .unwrap_or_else(|err| collapse("get_goal_info", &err))
    }

    /// Appends a question; the response id is the question's row.
    pub fn submit_question(&self, student_id: &str, text: &str) -> ActionResponse {
        match self.questions.submit(student_id, text) {
            Ok(question) => {
                ActionResponse::success("Question submitted.", question.row.to_string())
            }
            Err(err) => fail("submit_question", &err),
        }
    }

    pub fn list_unanswered_questions(&self) -> Vec<Question> {
        self.questions
            .list_unanswered()
            .unwrap_or_else(|err| collapse("list_unanswered_questions", &err))
    }

    pub fn list_student_questions(&self, student_id: &str) -> Vec<Question> {
        self.questions
            .list_for_student(student_id)
            .unwrap_or_else(|err| collapse("list_student_questions", &err))
    }

    pub fn reply_to_question(&self, row: RowAddress, reply: &str) -> ActionResponse {
        match self.questions.reply(row, reply) {
            Ok(()) => ActionResponse::success("Reply saved.", row.to_string()),
            Err(err) => fail("reply_to_question", &err),
        }
    }

    pub fn list_schedule(&self) -> Vec<ScheduleEvent> {
        self.schedule
            .list()
            .unwrap_or_else(|err| collapse("list_schedule", &err))
    }

    /// Creates an event; the response id is the generated event id.
    pub fn add_schedule(&self, request: NewScheduleEvent) -> ActionResponse {
        match self.schedule.create(request) {
            Ok(event) => ActionResponse::success("Event added.", event.id),
            Err(err) => fail("add_schedule", &err),
        }
    }

    pub fn delete_schedule(&self, event_id: &str) -> ActionResponse {
        match self.schedule.delete(event_id) {
            Ok(()) => ActionResponse::success("Event deleted.", event_id.trim()),
            Err(err) => fail("delete_schedule", &err),
        }
    }

    /// Dashboard figures; all-default when a shared tab cannot be read.
    pub fn get_dashboard_metrics(&self) -> DashboardMetrics {
        self.metrics
            .dashboard()
            .unwrap_or_else(|err| collapse("get_dashboard_metrics", &err))
    }

    /// Provisions a student tab; the message names the created tab.
    pub fn create_student(&self, display_name: &str, student_id: &str) -> ActionResponse {
        match self.provisioning.create_student(display_name, student_id) {
            Ok(created) => ActionResponse::success(
                format!("Student created on tab {}.", created.entry.tab_name),
                created.entry.student_id,
            ),
            Err(err) => fail("create_student", &err),
        }
    }

    pub fn delete_student(&self, student_id: &str) -> ActionResponse {
        match self.provisioning.delete_student(student_id) {
            Ok(removed) => ActionResponse::success(
                format!("Removed {removed} directory row(s)."),
                student_id.trim(),
            ),
            Err(err) => fail("delete_student", &err),
        }
    }
}

fn log_failure(event: &str, err: &SheetError) {
    if err.is_not_found() {
        info!(
            "event={event} module=api status=not_found error_code={}",
            err.code()
        );
    } else {
        warn!(
            "event={event} module=api status=error error_code={}",
            err.code()
        );
    }
}

fn collapse<T: Default>(event: &str, err: &SheetError) -> T {
    log_failure(event, err);
    T::default()
}

fn fail(event: &str, err: &SheetError) -> ActionResponse {
    log_failure(event, err);
    ActionResponse::failure(format!("{event} failed: {err}"))
}
