//! Sheet repositories: row parsing and range writes per tab family.
//!
//! # Responsibility
//! - Translate between typed records and the human-edited tab layouts.
//! - Keep A1 addressing details out of the service layer.
//!
//! # Invariants
//! - Short rows read as implicit-empty trailing cells, never as errors.
//! - Transport failures surface as `SheetError::Store`; absent records as
//!   the dedicated not-found variants.

use crate::model::schedule::ScheduleValidationError;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod directory_repo;
pub mod goal_repo;
pub mod question_repo;
pub mod sales_repo;
pub mod schedule_repo;
pub mod task_repo;

pub type SheetResult<T> = Result<T, SheetError>;

/// Error shared by sheet repositories and services.
#[derive(Debug)]
pub enum SheetError {
    Store(StoreError),
    StudentNotFound(String),
    TemplateNotFound(String),
    EventNotFound(String),
    InvalidInput(String),
    Validation(ScheduleValidationError),
}

impl SheetError {
    /// True for "no such record" outcomes, false for transport/input failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::StudentNotFound(_) | Self::TemplateNotFound(_) | Self::EventNotFound(_)
        )
    }

    /// Stable short code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Store(_) => "store_failed",
            Self::StudentNotFound(_) => "student_not_found",
            Self::TemplateNotFound(_) => "template_not_found",
            Self::EventNotFound(_) => "event_not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Validation(_) => "validation_failed",
        }
    }
}

impl Display for SheetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::StudentNotFound(id) => write!(f, "student not found: {id}"),
            Self::TemplateNotFound(name) => write!(f, "template tab not found: {name}"),
            Self::EventNotFound(id) => write!(f, "schedule event not found: {id}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SheetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for SheetError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<ScheduleValidationError> for SheetError {
    fn from(value: ScheduleValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Trims and rejects blank caller input.
pub(crate) fn required(field: &str, value: &str) -> SheetResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SheetError::InvalidInput(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}
