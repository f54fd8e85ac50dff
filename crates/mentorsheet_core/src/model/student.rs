//! Student directory, task and goal records.

use serde::{Deserialize, Serialize};

/// 1-based physical row number inside a tab.
pub type RowAddress = u32;

/// Status written into a task row when nothing has been recorded yet.
pub const TASK_STATUS_NOT_STARTED: &str = "未着手";
pub const TASK_STATUS_IN_PROGRESS: &str = "進行中";
pub const TASK_STATUS_DONE: &str = "完了";

/// Cell prefix that opens a new week context in the task block.
pub const WEEK_MARKER: &str = "Week";

/// One directory row: where a student's data lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub student_id: String,
    pub spreadsheet_id: String,
    pub display_name: String,
    pub tab_name: String,
}

/// One task row of a student tab.
///
/// `id` is the row the task occupied at read time. It is not stable across
/// manual edits that insert or remove rows above it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: RowAddress,
    pub title: String,
    pub description: String,
    pub status: String,
    pub week: String,
}

impl Task {
    pub fn is_done(&self) -> bool {
        self.status.trim() == TASK_STATUS_DONE
    }
}

/// Fixed header block of a student tab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalInfo {
    pub monthly_goal: String,
    pub bottleneck: String,
    pub weekly_focus: String,
    pub current_week: String,
    pub mentor: String,
}
