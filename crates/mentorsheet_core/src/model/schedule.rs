//! Schedule event records.
//!
//! # Invariants
//! - `id` is generated once at creation and never reused.
//! - When both bounds parse as dates, `end` is not earlier than `start`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Generated, position-independent event identifier.
pub type EventId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub id: EventId,
    pub title: String,
    pub start: String,
    pub end: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Caller input for a new event; the id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScheduleEvent {
    pub title: String,
    pub start: String,
    pub end: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleValidationError {
    EmptyTitle,
    EndBeforeStart { start: String, end: String },
}

impl Display for ScheduleValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "schedule title cannot be empty"),
            Self::EndBeforeStart { start, end } => {
                write!(f, "schedule end `{end}` is earlier than start `{start}`")
            }
        }
    }
}

impl Error for ScheduleValidationError {}

impl NewScheduleEvent {
    pub fn new(
        title: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            start: start.into(),
            end: end.into(),
            kind: kind.into(),
        }
    }

    /// Checks title presence and bound ordering.
    ///
    /// Free-text bounds that do not parse as dates are accepted as-is; the
    /// sheet is human-edited and may hold labels like "TBD".
    pub fn validate(&self) -> Result<(), ScheduleValidationError> {
        if self.title.trim().is_empty() {
            return Err(ScheduleValidationError::EmptyTitle);
        }
        if let (Some(start), Some(end)) = (parse_moment(&self.start), parse_moment(&self.end)) {
            if end < start {
                return Err(ScheduleValidationError::EndBeforeStart {
                    start: self.start.clone(),
                    end: self.end.clone(),
                });
            }
        }
        Ok(())
    }

    /// Assigns a fresh random id.
    pub fn into_event(self) -> ScheduleEvent {
        ScheduleEvent {
            id: Uuid::new_v4().to_string(),
            title: self.title.trim().to_string(),
            start: self.start.trim().to_string(),
            end: self.end.trim().to_string(),
            kind: self.kind.trim().to_string(),
        }
    }
}

/// Parses the date formats the calendar widget and spreadsheet produce.
fn parse_moment(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y/%m/%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}
