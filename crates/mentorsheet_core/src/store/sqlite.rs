//! SQLite-backed `TabularStore`.
//!
//! # Responsibility
//! - Emulate spreadsheet range semantics over a sparse `cells` table.
//! - Provide the offline backend used by the CLI demo and the test suites.
//!
//! # Invariants
//! - Only non-empty values are stored; writing `""` clears the cell.
//! - `row_idx`/`col_idx` are 0-based in storage.
//! - Structural changes (row delete, tab copy) run in one transaction.

use super::{A1Range, CellRows, StoreError, StoreResult, TabId, TabInfo, TabularStore};
use crate::db::{open_db, open_db_in_memory};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const COPY_SUFFIX: &str = " のコピー";

/// Local spreadsheet emulation persisted in SQLite.
pub struct SqliteTabularStore {
    conn: Mutex<Connection>,
}

impl SqliteTabularStore {
    /// Wraps an already migrated connection (see `crate::db`).
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens a migrated store file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens a migrated in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Registers a spreadsheet id; idempotent.
    pub fn create_spreadsheet(&self, spreadsheet_id: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO spreadsheets (spreadsheet_id) VALUES (?1);",
            [spreadsheet_id],
        )?;
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("store connection lock poisoned".to_string()))
    }
}

impl TabularStore for SqliteTabularStore {
    fn get_range(&self, spreadsheet_id: &str, range: &A1Range) -> StoreResult<CellRows> {
        let conn = self.lock()?;
        let tab_id = tab_id_by_title(&conn, spreadsheet_id, &range.tab)?;
        let first_row = i64::from(range.first_row) - 1;
        let last_row = range.last_row.map_or(i64::MAX, |row| i64::from(row) - 1);
        let first_col = i64::from(range.first_col);
        let last_col = range.last_col.map_or(i64::MAX, i64::from);

        let mut stmt = conn.prepare(
            "SELECT row_idx, col_idx, value
             FROM cells
             WHERE spreadsheet_id = ?1
               AND tab_id = ?2
               AND row_idx BETWEEN ?3 AND ?4
               AND col_idx BETWEEN ?5 AND ?6
             ORDER BY row_idx ASC, col_idx ASC;",
        )?;
        let mut cursor = stmt.query(params![
            spreadsheet_id,
            tab_id,
            first_row,
            last_row,
            first_col,
            last_col
        ])?;

        let mut rows: CellRows = Vec::new();
        while let Some(row) = cursor.next()? {
            let row_idx: i64 = row.get(0)?;
            let col_idx: i64 = row.get(1)?;
            let value: String = row.get(2)?;

            let rel_row = usize::try_from(row_idx - first_row).unwrap_or_default();
            let rel_col = usize::try_from(col_idx - first_col).unwrap_or_default();
            if rows.len() <= rel_row {
                rows.resize_with(rel_row + 1, Vec::new);
            }
            let cells = &mut rows[rel_row];
            if cells.len() < rel_col {
                cells.resize(rel_col, String::new());
            }
            cells.push(value);
        }

        Ok(rows)
    }

    fn update_range(
        &self,
        spreadsheet_id: &str,
        range: &A1Range,
        rows: &CellRows,
    ) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tab_id = tab_id_by_title(&conn, spreadsheet_id, &range.tab)?;
        let tx = conn.transaction()?;
        write_block(
            &tx,
            spreadsheet_id,
            tab_id,
            i64::from(range.first_row) - 1,
            i64::from(range.first_col),
            rows,
        )?;
        tx.commit()?;
        debug!(
            "event=store_update module=store status=ok tab_id={tab_id} rows={}",
            rows.len()
        );
        Ok(())
    }

    fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &A1Range,
        rows: &CellRows,
    ) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tab_id = tab_id_by_title(&conn, spreadsheet_id, &range.tab)?;
        let first_col = i64::from(range.first_col);
        let last_col = range.last_col.map_or(i64::MAX, i64::from);

        let last_used: Option<i64> = conn.query_row(
            "SELECT MAX(row_idx) FROM cells
             WHERE spreadsheet_id = ?1 AND tab_id = ?2 AND col_idx BETWEEN ?3 AND ?4;",
            params![spreadsheet_id, tab_id, first_col, last_col],
            |row| row.get(0),
        )?;
        let range_start = i64::from(range.first_row) - 1;
        let start_row = last_used.map_or(range_start, |last| (last + 1).max(range_start));

        let tx = conn.transaction()?;
        write_block(&tx, spreadsheet_id, tab_id, start_row, first_col, rows)?;
        tx.commit()?;
        debug!(
            "event=store_append module=store status=ok tab_id={tab_id} start_row={} rows={}",
            start_row + 1,
            rows.len()
        );
        Ok(())
    }

    fn delete_rows(
        &self,
        spreadsheet_id: &str,
        tab_id: TabId,
        start: u32,
        end: u32,
    ) -> StoreResult<()> {
        let mut conn = self.lock()?;
        ensure_tab_id(&conn, spreadsheet_id, tab_id)?;
        if end <= start {
            return Ok(());
        }
        let (start, end) = (i64::from(start), i64::from(end));
        let shift = end - start;

        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM cells
             WHERE spreadsheet_id = ?1 AND tab_id = ?2 AND row_idx >= ?3 AND row_idx < ?4;",
            params![spreadsheet_id, tab_id, start, end],
        )?;
        // Two passes through negative indices so the primary key never collides mid-update.
        tx.execute(
            "UPDATE cells SET row_idx = -(row_idx - ?3) - 1
             WHERE spreadsheet_id = ?1 AND tab_id = ?2 AND row_idx >= ?4;",
            params![spreadsheet_id, tab_id, shift, end],
        )?;
        tx.execute(
            "UPDATE cells SET row_idx = -row_idx - 1
             WHERE spreadsheet_id = ?1 AND tab_id = ?2 AND row_idx < 0;",
            params![spreadsheet_id, tab_id],
        )?;
        tx.commit()?;

        info!(
            "event=store_delete_rows module=store status=ok tab_id={tab_id} start={start} end={end}"
        );
        Ok(())
    }

    fn list_tabs(&self, spreadsheet_id: &str) -> StoreResult<Vec<TabInfo>> {
        let conn = self.lock()?;
        ensure_spreadsheet(&conn, spreadsheet_id)?;
        let mut stmt = conn.prepare(
            "SELECT tab_id, title FROM tabs
             WHERE spreadsheet_id = ?1
             ORDER BY position ASC, tab_id ASC;",
        )?;
        let tabs = stmt
            .query_map([spreadsheet_id], |row| {
                Ok(TabInfo {
                    tab_id: row.get(0)?,
                    title: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tabs)
    }

    fn add_tab(&self, spreadsheet_id: &str, title: &str) -> StoreResult<TabId> {
        let conn = self.lock()?;
        ensure_spreadsheet(&conn, spreadsheet_id)?;
        if title_in_use(&conn, spreadsheet_id, title)? {
            return Err(StoreError::DuplicateTab(title.to_string()));
        }
        let tab_id = insert_tab(&conn, spreadsheet_id, title)?;
        info!("event=store_add_tab module=store status=ok tab_id={tab_id}");
        Ok(tab_id)
    }

    fn rename_tab(&self, spreadsheet_id: &str, tab_id: TabId, title: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        ensure_tab_id(&conn, spreadsheet_id, tab_id)?;
        let owner: Option<TabId> = conn
            .query_row(
                "SELECT tab_id FROM tabs WHERE spreadsheet_id = ?1 AND title = ?2;",
                params![spreadsheet_id, title],
                |row| row.get(0),
            )
            .optional()?;
        if owner.is_some_and(|owner| owner != tab_id) {
            return Err(StoreError::DuplicateTab(title.to_string()));
        }

        conn.execute(
            "UPDATE tabs SET title = ?3 WHERE spreadsheet_id = ?1 AND tab_id = ?2;",
            params![spreadsheet_id, tab_id, title],
        )?;
        info!("event=store_rename_tab module=store status=ok tab_id={tab_id}");
        Ok(())
    }

    fn copy_tab(&self, spreadsheet_id: &str, tab_id: TabId) -> StoreResult<TabId> {
        let mut conn = self.lock()?;
        let source_title = ensure_tab_id(&conn, spreadsheet_id, tab_id)?;

        let base = format!("{source_title}{COPY_SUFFIX}");
        let mut title = base.clone();
        let mut counter = 2;
        while title_in_use(&conn, spreadsheet_id, &title)? {
            title = format!("{base} {counter}");
            counter += 1;
        }

        let tx = conn.transaction()?;
        let copy_id = insert_tab(&tx, spreadsheet_id, &title)?;
        tx.execute(
            "INSERT INTO cells (spreadsheet_id, tab_id, row_idx, col_idx, value)
             SELECT spreadsheet_id, ?3, row_idx, col_idx, value
             FROM cells
             WHERE spreadsheet_id = ?1 AND tab_id = ?2;",
            params![spreadsheet_id, tab_id, copy_id],
        )?;
        tx.commit()?;

        info!(
            "event=store_copy_tab module=store status=ok source_tab_id={tab_id} tab_id={copy_id}"
        );
        Ok(copy_id)
    }
}

fn ensure_spreadsheet(conn: &Connection, spreadsheet_id: &str) -> StoreResult<()> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM spreadsheets WHERE spreadsheet_id = ?1;",
            [spreadsheet_id],
            |_| Ok(()),
        )
        .optional()?;
    match exists {
        Some(()) => Ok(()),
        None => Err(StoreError::SpreadsheetNotFound(spreadsheet_id.to_string())),
    }
}

fn tab_id_by_title(conn: &Connection, spreadsheet_id: &str, title: &str) -> StoreResult<TabId> {
    ensure_spreadsheet(conn, spreadsheet_id)?;
    conn.query_row(
        "SELECT tab_id FROM tabs WHERE spreadsheet_id = ?1 AND title = ?2;",
        params![spreadsheet_id, title],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| StoreError::TabNotFound(title.to_string()))
}

/// Returns the tab's title when it exists.
fn ensure_tab_id(conn: &Connection, spreadsheet_id: &str, tab_id: TabId) -> StoreResult<String> {
    ensure_spreadsheet(conn, spreadsheet_id)?;
    conn.query_row(
        "SELECT title FROM tabs WHERE spreadsheet_id = ?1 AND tab_id = ?2;",
        params![spreadsheet_id, tab_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| StoreError::TabNotFound(format!("gid={tab_id}")))
}

fn title_in_use(conn: &Connection, spreadsheet_id: &str, title: &str) -> StoreResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM tabs WHERE spreadsheet_id = ?1 AND title = ?2;",
            params![spreadsheet_id, title],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn insert_tab(conn: &Connection, spreadsheet_id: &str, title: &str) -> StoreResult<TabId> {
    let (tab_id, position): (TabId, i64) = conn.query_row(
        "SELECT COALESCE(MAX(tab_id) + 1, 0), COALESCE(MAX(position) + 1, 0)
         FROM tabs WHERE spreadsheet_id = ?1;",
        [spreadsheet_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    conn.execute(
        "INSERT INTO tabs (spreadsheet_id, tab_id, title, position) VALUES (?1, ?2, ?3, ?4);",
        params![spreadsheet_id, tab_id, title, position],
    )?;
    Ok(tab_id)
}

fn write_block(
    conn: &Connection,
    spreadsheet_id: &str,
    tab_id: TabId,
    first_row: i64,
    first_col: i64,
    rows: &CellRows,
) -> StoreResult<()> {
    let mut upsert = conn.prepare(
        "INSERT INTO cells (spreadsheet_id, tab_id, row_idx, col_idx, value)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (spreadsheet_id, tab_id, row_idx, col_idx)
         DO UPDATE SET value = excluded.value;",
    )?;
    let mut clear = conn.prepare(
        "DELETE FROM cells
         WHERE spreadsheet_id = ?1 AND tab_id = ?2 AND row_idx = ?3 AND col_idx = ?4;",
    )?;

    for (row_offset, cells) in (0_i64..).zip(rows) {
        for (col_offset, value) in (0_i64..).zip(cells) {
            let row_idx = first_row + row_offset;
            let col_idx = first_col + col_offset;
            if value.is_empty() {
                clear.execute(params![spreadsheet_id, tab_id, row_idx, col_idx])?;
            } else {
                upsert.execute(params![spreadsheet_id, tab_id, row_idx, col_idx, value])?;
            }
        }
    }
    Ok(())
}
