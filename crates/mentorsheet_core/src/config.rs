//! Workspace configuration.
//!
//! # Responsibility
//! - Name every tab and header offset the sheet layout depends on.
//! - Load settings from JSON with environment overrides.
//!
//! # Invariants
//! - Every field has a default matching the production sheet layout.
//! - `validate()` runs before a config is handed to any repository.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Overrides `master_spreadsheet_id`.
pub const ENV_MASTER_SPREADSHEET_ID: &str = "MENTORSHEET_MASTER_SPREADSHEET_ID";
/// Overrides `logging.level`.
pub const ENV_LOG_LEVEL: &str = "MENTORSHEET_LOG_LEVEL";

/// Tab names and fixed offsets of the human-edited sheet layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    pub directory_tab: String,
    pub questions_tab: String,
    pub schedule_tab: String,
    pub sales_tab: String,
    /// Used when a directory row leaves the tab column empty.
    pub default_student_tab: String,
    pub template_tab: String,
    /// Shared prefix of every per-student tab title.
    pub student_tab_prefix: String,
    /// First 1-based row of the task block.
    pub task_first_row: u32,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            directory_tab: "Master".to_string(),
            questions_tab: "質問".to_string(),
            schedule_tab: "スケジュール".to_string(),
            sales_tab: "売上".to_string(),
            default_student_tab: "行動管理".to_string(),
            template_tab: "行動管理①".to_string(),
            student_tab_prefix: "行動管理".to_string(),
            task_first_row: 6,
        }
    }
}

/// Logging settings consumed by `crate::logging::init_logging`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: String,
    pub duplicate_to_stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            log_dir: String::new(),
            duplicate_to_stderr: false,
        }
    }
}

/// Top-level configuration for one mentoring workspace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Spreadsheet holding the directory, questions, schedule and sales tabs.
    pub master_spreadsheet_id: String,
    pub layout: SheetLayout,
    pub logging: LoggingConfig,
}

/// Configuration load or validation failure.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl WorkspaceConfig {
    /// Config for one master spreadsheet with the default layout.
    pub fn for_spreadsheet(master_spreadsheet_id: impl Into<String>) -> Self {
        Self {
            master_spreadsheet_id: master_spreadsheet_id.into(),
            ..Self::default()
        }
    }

    /// Parses JSON, applies environment overrides, then validates.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(json)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Applies overrides from a key lookup (the process environment in
    /// production). Blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(id) = non_blank(ENV_MASTER_SPREADSHEET_ID) {
            self.master_spreadsheet_id = id.trim().to_string();
        }
        if let Some(level) = non_blank(ENV_LOG_LEVEL) {
            self.logging.level = level.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.master_spreadsheet_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "master_spreadsheet_id cannot be empty".to_string(),
            ));
        }

        let layout = &self.layout;
        let tabs = [
            ("directory_tab", &layout.directory_tab),
            ("questions_tab", &layout.questions_tab),
            ("schedule_tab", &layout.schedule_tab),
            ("sales_tab", &layout.sales_tab),
            ("default_student_tab", &layout.default_student_tab),
            ("template_tab", &layout.template_tab),
            ("student_tab_prefix", &layout.student_tab_prefix),
        ];
        if let Some((name, _)) = tabs.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("layout.{name} cannot be empty")));
        }

        if layout.task_first_row < 2 {
            return Err(ConfigError::Invalid(format!(
                "layout.task_first_row must be at least 2, got {}",
                layout.task_first_row
            )));
        }
        Ok(())
    }
}
