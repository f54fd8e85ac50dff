//! Shared question queue tab.
//!
//! # Responsibility
//! - Append student questions with a server timestamp.
//! - List open questions with their row addresses for later replies.
//! - Write replies in place.
//!
//! # Invariants
//! - Rows are never deleted, so row addresses stay valid between listing
//!   and replying unless the tab is edited by hand.
//! - Concurrent replies to one row are last-write-wins.

use crate::config::WorkspaceConfig;
use crate::model::question::{Question, QuestionStatus};
use crate::model::student::RowAddress;
use crate::repo::{required, SheetError, SheetResult};
use crate::store::{cell_at, find_tab, A1Range, CellRows, StoreError, TabularStore};
use chrono::Local;
use log::info;
use std::sync::Arc;

const QUESTION_HEADER: [&str; 5] = ["日時", "生徒ID", "質問内容", "ステータス", "回答"];
const QUESTION_FIRST_ROW: RowAddress = 2;
const QUESTION_LAST_COL: u32 = 4;
const COL_STATUS: u32 = 3;
const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

pub struct QuestionQueue {
    store: Arc<dyn TabularStore>,
    spreadsheet_id: String,
    tab: String,
}

impl QuestionQueue {
    pub fn new(store: Arc<dyn TabularStore>, config: &WorkspaceConfig) -> Self {
        Self {
            store,
            spreadsheet_id: config.master_spreadsheet_id.clone(),
            tab: config.layout.questions_tab.clone(),
        }
    }

    /// Appends an unanswered question stamped with the local time.
    pub fn submit(&self, student_id: &str, text: &str) -> SheetResult<Question> {
        let student_id = required("student_id", student_id)?;
        let text = required("question", text)?;
        self.ensure_tab()?;

        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let status = QuestionStatus::Unanswered;
        let row = vec![
            timestamp.clone(),
            student_id.clone(),
            text.clone(),
            status.as_cell().to_string(),
            String::new(),
        ];
        let range = A1Range::rows_from(&self.tab, 0, QUESTION_LAST_COL, 1);
        self.store
            .append_rows(&self.spreadsheet_id, &range, &vec![row])?;

        // Append does not report its landing row; re-read to hand back the address.
        let row = self
            .list_all()?
            .into_iter()
            .rev()
            .find(|q| q.student_id == student_id && q.timestamp == timestamp && q.text == text)
            .map(|q| q.row)
            .ok_or_else(|| {
                StoreError::Backend("appended question row not found on re-read".into())
            })?;
        info!("event=question_submit module=repo status=ok row={row}");

        Ok(Question {
            row,
            timestamp,
            student_id,
            text,
            status,
            reply: String::new(),
        })
    }

    /// Open questions in sheet order.
    pub fn list_unanswered(&self) -> SheetResult<Vec<Question>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|q| q.status == QuestionStatus::Unanswered)
            .collect())
    }

    /// Every question asked by one student, answered or not.
    pub fn list_for_student(&self, student_id: &str) -> SheetResult<Vec<Question>> {
        let student_id = student_id.trim();
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|q| q.student_id == student_id)
            .collect())
    }

    pub fn count_unanswered(&self) -> SheetResult<usize> {
        Ok(self.list_unanswered()?.len())
    }

    /// Marks `row` answered and stores the reply text.
    pub fn reply(&self, row: RowAddress, reply: &str) -> SheetResult<()> {
        let reply = required("reply", reply)?;
        if row < QUESTION_FIRST_ROW {
            return Err(SheetError::InvalidInput(format!(
                "question row {row} is the header row"
            )));
        }

        let range = A1Range::block(&self.tab, COL_STATUS, QUESTION_LAST_COL, row, row);
        let values = vec![vec![QuestionStatus::Answered.as_cell().to_string(), reply]];
        self.store.update_range(&self.spreadsheet_id, &range, &values)?;
        info!("event=question_reply module=repo status=ok row={row}");
        Ok(())
    }

    fn list_all(&self) -> SheetResult<Vec<Question>> {
        let range = A1Range::rows_from(&self.tab, 0, QUESTION_LAST_COL, QUESTION_FIRST_ROW);
        match self.store.get_range(&self.spreadsheet_id, &range) {
            Ok(rows) => Ok(parse_question_rows(&rows)),
            Err(StoreError::TabNotFound(_)) => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn ensure_tab(&self) -> SheetResult<()> {
        let tabs = self.store.list_tabs(&self.spreadsheet_id)?;
        if find_tab(&tabs, &self.tab).is_some() {
            return Ok(());
        }

        self.store.add_tab(&self.spreadsheet_id, &self.tab)?;
        let header = vec![QUESTION_HEADER.iter().map(|h| h.to_string()).collect()];
        self.store.update_range(
            &self.spreadsheet_id,
            &A1Range::cell(&self.tab, 0, 1),
            &header,
        )?;
        info!("event=question_tab_create module=repo status=ok");
        Ok(())
    }
}

fn parse_question_rows(rows: &CellRows) -> Vec<Question> {
    (QUESTION_FIRST_ROW..)
        .zip(0..rows.len())
        .filter(|(_, idx)| !rows[*idx].iter().all(|cell| cell.trim().is_empty()))
        .map(|(row, idx)| Question {
            row,
            timestamp: cell_at(rows, idx, 0).to_string(),
            student_id: cell_at(rows, idx, 1).trim().to_string(),
            text: cell_at(rows, idx, 2).to_string(),
            status: QuestionStatus::from_cell(cell_at(rows, idx, 3)),
            reply: cell_at(rows, idx, 4).to_string(),
        })
        .collect()
}
