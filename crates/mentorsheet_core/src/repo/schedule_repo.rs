//! Shared schedule tab keyed by generated event ids.
//!
//! # Invariants
//! - Event identity is the id column, never the row position.
//! - Deletion re-reads the tab and maps id -> row immediately before the
//!   structural delete; cached row positions are never reused.

use crate::config::WorkspaceConfig;
use crate::model::schedule::{NewScheduleEvent, ScheduleEvent};
use crate::model::student::RowAddress;
use crate::repo::{SheetError, SheetResult};
use crate::store::{cell_at, find_tab, A1Range, CellRows, TabId, TabularStore};
use log::info;
use std::sync::Arc;

const SCHEDULE_HEADER: [&str; 5] = ["id", "title", "start", "end", "type"];
const SCHEDULE_FIRST_ROW: RowAddress = 2;
const SCHEDULE_LAST_COL: u32 = 4;

pub struct ScheduleStore {
    store: Arc<dyn TabularStore>,
    spreadsheet_id: String,
    tab: String,
}

impl ScheduleStore {
    pub fn new(store: Arc<dyn TabularStore>, config: &WorkspaceConfig) -> Self {
        Self {
            store,
            spreadsheet_id: config.master_spreadsheet_id.clone(),
            tab: config.layout.schedule_tab.clone(),
        }
    }

    /// Events in sheet order. Creates the tab on first access.
    pub fn list(&self) -> SheetResult<Vec<ScheduleEvent>> {
        self.ensure_tab()?;
        Ok(self
            .read_rows()?
            .into_iter()
            .map(|(_, event)| event)
            .collect())
    }

    /// Validates, assigns a fresh id and appends the event.
    pub fn create(&self, request: NewScheduleEvent) -> SheetResult<ScheduleEvent> {
        request.validate()?;
        self.ensure_tab()?;

        let event = request.into_event();
        let row = vec![
            event.id.clone(),
            event.title.clone(),
            event.start.clone(),
            event.end.clone(),
            event.kind.clone(),
        ];
        let range = A1Range::rows_from(&self.tab, 0, SCHEDULE_LAST_COL, 1);
        self.store
            .append_rows(&self.spreadsheet_id, &range, &vec![row])?;
        info!("event=schedule_create module=repo status=ok");
        Ok(event)
    }

    /// Removes the single row whose id matches.
    ///
    /// # Errors
    /// - `EventNotFound` when no row carries `id`.
    pub fn delete(&self, id: &str) -> SheetResult<()> {
        let id = id.trim();
        let tab_id = self.ensure_tab()?;
        let row = self
            .read_rows()?
            .into_iter()
            .find(|(_, event)| event.id == id)
            .map(|(row, _)| row)
            .ok_or_else(|| SheetError::EventNotFound(id.to_string()))?;

        let index = row - 1;
        self.store
            .delete_rows(&self.spreadsheet_id, tab_id, index, index + 1)?;
        info!("event=schedule_delete module=repo status=ok row={row}");
        Ok(())
    }

    pub fn count(&self) -> SheetResult<usize> {
        Ok(self.list()?.len())
    }

    fn read_rows(&self) -> SheetResult<Vec<(RowAddress, ScheduleEvent)>> {
        let range = A1Range::rows_from(&self.tab, 0, SCHEDULE_LAST_COL, SCHEDULE_FIRST_ROW);
        let rows = self.store.get_range(&self.spreadsheet_id, &range)?;
        Ok(parse_schedule_rows(&rows))
    }

    fn ensure_tab(&self) -> SheetResult<TabId> {
        let tabs = self.store.list_tabs(&self.spreadsheet_id)?;
        if let Some(tab) = find_tab(&tabs, &self.tab) {
            return Ok(tab.tab_id);
        }

        let tab_id = self.store.add_tab(&self.spreadsheet_id, &self.tab)?;
        let header = vec![SCHEDULE_HEADER.iter().map(|h| h.to_string()).collect()];
        self.store
            .update_range(&self.spreadsheet_id, &A1Range::cell(&self.tab, 0, 1), &header)?;
        info!("event=schedule_tab_create module=repo status=ok tab_id={tab_id}");
        Ok(tab_id)
    }
}

fn parse_schedule_rows(rows: &CellRows) -> Vec<(RowAddress, ScheduleEvent)> {
    (SCHEDULE_FIRST_ROW..)
        .zip(0..rows.len())
        .filter_map(|(row, idx)| {
            let id = cell_at(rows, idx, 0).trim();
            if id.is_empty() {
                return None;
            }
            Some((
                row,
                ScheduleEvent {
                    id: id.to_string(),
                    title: cell_at(rows, idx, 1).to_string(),
                    start: cell_at(rows, idx, 2).to_string(),
                    end: cell_at(rows, idx, 3).to_string(),
                    kind: cell_at(rows, idx, 4).to_string(),
                },
            ))
        })
        .collect()
}
