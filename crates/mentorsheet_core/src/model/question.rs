//! Question queue records.

use crate::model::student::RowAddress;
use serde::{Deserialize, Serialize};

pub const QUESTION_STATUS_UNANSWERED: &str = "未回答";
pub const QUESTION_STATUS_ANSWERED: &str = "回答済み";

/// Lifecycle of one question row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    Unanswered,
    Answered,
}

impl QuestionStatus {
    /// Text stored in the status column.
    pub fn as_cell(self) -> &'static str {
        match self {
            Self::Unanswered => QUESTION_STATUS_UNANSWERED,
            Self::Answered => QUESTION_STATUS_ANSWERED,
        }
    }

    /// Anything other than the unanswered marker counts as answered, so
    /// hand-edited statuses never re-enter the admin queue.
    pub fn from_cell(value: &str) -> Self {
        if value.trim() == QUESTION_STATUS_UNANSWERED {
            Self::Unanswered
        } else {
            Self::Answered
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub row: RowAddress,
    pub timestamp: String,
    pub student_id: String,
    pub text: String,
    pub status: QuestionStatus,
    pub reply: String,
}
