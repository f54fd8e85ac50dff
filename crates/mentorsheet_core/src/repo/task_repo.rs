//! Task block parsing and status writes for per-student tabs.
//!
//! # Responsibility
//! - Parse the semi-structured task block (rows from `task_first_row` down)
//!   into `Task` records with carried-forward week context.
//! - Write single status cells back by row address.
//!
//! # Invariants
//! - A row is a task iff its title cell is non-blank after trimming.
//! - A first cell starting with `WEEK_MARKER` sets the week for that row and
//!   every following row until the next marker.
//! - Status writes touch exactly one cell and never re-read the row first;
//!   a stale row address lands on whatever row now occupies it.

use crate::config::SheetLayout;
use crate::model::student::{DirectoryEntry, RowAddress, Task, TASK_STATUS_NOT_STARTED, WEEK_MARKER};
use crate::repo::{required, SheetError, SheetResult};
use crate::store::{cell_at, A1Range, CellRows, TabularStore};
use log::info;
use std::sync::Arc;

const COL_WEEK: usize = 0;
const COL_TITLE: usize = 1;
const COL_DESCRIPTION: usize = 2;
const COL_STATUS: usize = 3;
/// Task block spans columns A..E.
const TASK_LAST_COL: u32 = 4;

/// Reads and writes the task block of a student tab.
pub struct TaskSheetRepository {
    store: Arc<dyn TabularStore>,
    first_row: RowAddress,
}

impl TaskSheetRepository {
    pub fn new(store: Arc<dyn TabularStore>, layout: &SheetLayout) -> Self {
        Self {
            store,
            first_row: layout.task_first_row,
        }
    }

    /// Lists tasks of the tab referenced by `entry` in sheet order.
    pub fn list_tasks(&self, entry: &DirectoryEntry) -> SheetResult<Vec<Task>> {
        let range = A1Range::rows_from(&entry.tab_name, 0, TASK_LAST_COL, self.first_row);
        let rows = self.store.get_range(&entry.spreadsheet_id, &range)?;
        Ok(parse_task_rows(&rows, self.first_row))
    }

    /// Overwrites the status cell of `row`.
    ///
    /// # Errors
    /// - `InvalidInput` for a blank status or a row inside the header block.
    pub fn set_status(
        &self,
        entry: &DirectoryEntry,
        row: RowAddress,
        status: &str,
    ) -> SheetResult<()> {
        let status = required("status", status)?;
        if row < self.first_row {
            return Err(SheetError::InvalidInput(format!(
                "task row {row} is inside the header block (tasks start at row {})",
                self.first_row
            )));
        }

        let range = A1Range::cell(&entry.tab_name, COL_STATUS as u32, row);
        self.store
            .update_range(&entry.spreadsheet_id, &range, &vec![vec![status]])?;
        info!("event=task_status_write module=repo status=ok row={row}");
        Ok(())
    }
}

/// Parses a fetched task block whose first row sits at `first_row`.
pub fn parse_task_rows(rows: &CellRows, first_row: RowAddress) -> Vec<Task> {
    let mut tasks = Vec::new();
    let mut current_week = String::new();

    for (address, idx) in (first_row..).zip(0..rows.len()) {
        let marker = cell_at(rows, idx, COL_WEEK).trim();
        if marker.starts_with(WEEK_MARKER) {
            current_week = marker.to_string();
        }

        let title = cell_at(rows, idx, COL_TITLE).trim();
        if title.is_empty() {
            continue;
        }

        let status = match cell_at(rows, idx, COL_STATUS).trim() {
            "" => TASK_STATUS_NOT_STARTED.to_string(),
            value => value.to_string(),
        };
        tasks.push(Task {
            id: address,
            title: title.to_string(),
            description: cell_at(rows, idx, COL_DESCRIPTION).to_string(),
            status,
            week: current_week.clone(),
        });
    }

    tasks
}

#[cfg(test)]
mod tests {
    use super::parse_task_rows;
    use crate::model::student::TASK_STATUS_NOT_STARTED;

    fn rows(values: &[&[&str]]) -> Vec<Vec<String>> {
        values
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect()
    }

    #[test]
    fn week_context_carries_forward_until_next_marker() {
        let block = rows(&[&["Week1", "A", "", ""], &["", "B", "", ""], &["Week2", "C", "", ""]]);
        let tasks = parse_task_rows(&block, 6);

        let summary: Vec<(u32, &str, &str)> = tasks
            .iter()
            .map(|t| (t.id, t.title.as_str(), t.week.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![(6, "A", "Week1"), (7, "B", "Week1"), (8, "C", "Week2")]
        );
    }

    #[test]
    fn marker_row_without_title_only_moves_context() {
        let block = rows(&[&["Week3"], &[], &["", "after gap", "desc", "進行中"]]);
        let tasks = parse_task_rows(&block, 6);

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 8);
        assert_eq!(tasks[0].week, "Week3");
        assert_eq!(tasks[0].description, "desc");
        assert_eq!(tasks[0].status, "進行中");
    }

    #[test]
    fn short_rows_default_missing_fields() {
        let block = rows(&[&["", "  only title  "]]);
        let tasks = parse_task_rows(&block, 6);

        assert_eq!(tasks[0].title, "only title");
        assert_eq!(tasks[0].description, "");
        assert_eq!(tasks[0].status, TASK_STATUS_NOT_STARTED);
        assert_eq!(tasks[0].week, "");
    }

    #[test]
    fn non_marker_first_cell_is_ignored() {
        let block = rows(&[&["Week1", "A"], &["memo", "B"]]);
        let tasks = parse_task_rows(&block, 6);
        assert_eq!(tasks[1].week, "Week1");
    }
}
