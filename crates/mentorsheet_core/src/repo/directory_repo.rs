//! Student directory resolution.
//!
//! # Responsibility
//! - Map a student id to the spreadsheet and tab holding that student's rows.
//! - Own the resolution cache and its explicit invalidation.
//!
//! # Invariants
//! - First match wins: later directory rows with the same id are shadowed,
//!   never merged.
//! - Cache entries live until `invalidate`; there is no TTL.
//! - Only successful resolutions are cached.

use crate::config::WorkspaceConfig;
use crate::model::student::{DirectoryEntry, RowAddress};
use crate::repo::{SheetError, SheetResult};
use crate::store::{cell_at, A1Range, CellRows, TabId, TabularStore};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

static HYPERLINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^=HYPERLINK\(\s*"(?:[^"]|"")*"\s*[,;]\s*"((?:[^"]|"")*)"\s*\)$"#)
        .expect("valid hyperlink regex")
});

/// Directory data starts below the header row.
const DIRECTORY_FIRST_ROW: RowAddress = 2;
/// Columns A..D: student_id, spreadsheet_id, display_name, tab_name.
const DIRECTORY_LAST_COL: u32 = 3;

/// Injectable key-value store for resolved directory entries.
pub trait DirectoryCache: Send + Sync {
    fn get(&self, student_id: &str) -> Option<DirectoryEntry>;
    fn insert(&self, entry: DirectoryEntry);
    fn invalidate(&self, student_id: &str);
}

/// Process-local cache; population races are benign because resolution is
/// deterministic for a given directory state.
#[derive(Default)]
pub struct InMemoryDirectoryCache {
    entries: Mutex<HashMap<String, DirectoryEntry>>,
}

impl InMemoryDirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DirectoryCache for InMemoryDirectoryCache {
    fn get(&self, student_id: &str) -> Option<DirectoryEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(student_id)
            .cloned()
    }

    fn insert(&self, entry: DirectoryEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry.student_id.clone(), entry);
    }

    fn invalidate(&self, student_id: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(student_id);
    }
}

/// Resolves student ids through the directory tab of the master spreadsheet.
pub struct DirectoryResolver {
    store: Arc<dyn TabularStore>,
    master_spreadsheet_id: String,
    directory_tab: String,
    default_student_tab: String,
    cache: Arc<dyn DirectoryCache>,
}

impl DirectoryResolver {
    /// Creates a resolver with its own empty in-memory cache.
    pub fn new(store: Arc<dyn TabularStore>, config: &WorkspaceConfig) -> Self {
        Self::with_cache(store, config, Arc::new(InMemoryDirectoryCache::new()))
    }

    pub fn with_cache(
        store: Arc<dyn TabularStore>,
        config: &WorkspaceConfig,
        cache: Arc<dyn DirectoryCache>,
    ) -> Self {
        Self {
            store,
            master_spreadsheet_id: config.master_spreadsheet_id.clone(),
            directory_tab: config.layout.directory_tab.clone(),
            default_student_tab: config.layout.default_student_tab.clone(),
            cache,
        }
    }

    /// Returns the first directory row for `student_id`.
    ///
    /// # Errors
    /// - `SheetError::StudentNotFound` when no row matches.
    /// - `SheetError::Store` when the directory cannot be read.
    pub fn resolve(&self, student_id: &str) -> SheetResult<DirectoryEntry> {
        let student_id = student_id.trim();
        if let Some(entry) = self.cache.get(student_id) {
            debug!("event=directory_resolve module=repo status=ok cache=hit");
            return Ok(entry);
        }

        let started_at = Instant::now();
        let found = self
            .read_rows()?
            .into_iter()
            .find(|(_, entry)| entry.student_id == student_id)
            .map(|(_, entry)| entry);

        match found {
            Some(entry) => {
                info!(
                    "event=directory_resolve module=repo status=ok cache=miss duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                self.cache.insert(entry.clone());
                Ok(entry)
            }
            None => {
                info!(
                    "event=directory_resolve module=repo status=not_found duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Err(SheetError::StudentNotFound(student_id.to_string()))
            }
        }
    }

    /// All directory entries in sheet order, duplicates included.
    pub fn list_entries(&self) -> SheetResult<Vec<DirectoryEntry>> {
        Ok(self.read_rows()?.into_iter().map(|(_, entry)| entry).collect())
    }

    /// Every row address whose id cell equals `student_id`.
    pub fn matching_rows(&self, student_id: &str) -> SheetResult<Vec<RowAddress>> {
        let student_id = student_id.trim();
        Ok(self
            .read_rows()?
            .into_iter()
            .filter(|(_, entry)| entry.student_id == student_id)
            .map(|(row, _)| row)
            .collect())
    }

    /// Appends a directory row whose tab cell links to `tab_id`.
    pub fn register(&self, entry: &DirectoryEntry, tab_id: TabId) -> SheetResult<()> {
        let row = vec![
            entry.student_id.clone(),
            entry.spreadsheet_id.clone(),
            entry.display_name.clone(),
            hyperlink_formula(tab_id, &entry.tab_name),
        ];
        let range = A1Range::rows_from(&self.directory_tab, 0, DIRECTORY_LAST_COL, 1);
        self.store
            .append_rows(&self.master_spreadsheet_id, &range, &vec![row])?;
        self.cache.invalidate(&entry.student_id);
        Ok(())
    }

    /// Drops the cached entry so the next `resolve` re-reads the directory.
    pub fn invalidate(&self, student_id: &str) {
        self.cache.invalidate(student_id.trim());
    }

    pub fn directory_tab(&self) -> &str {
        &self.directory_tab
    }

    pub fn master_spreadsheet_id(&self) -> &str {
        &self.master_spreadsheet_id
    }

    fn read_rows(&self) -> SheetResult<Vec<(RowAddress, DirectoryEntry)>> {
        let range = A1Range::rows_from(
            &self.directory_tab,
            0,
            DIRECTORY_LAST_COL,
            DIRECTORY_FIRST_ROW,
        );
        let rows = self.store.get_range(&self.master_spreadsheet_id, &range)?;
        Ok(self.parse_rows(&rows))
    }

    fn parse_rows(&self, rows: &CellRows) -> Vec<(RowAddress, DirectoryEntry)> {
        (DIRECTORY_FIRST_ROW..)
            .zip(0..rows.len())
            .filter_map(|(address, idx)| {
                let student_id = cell_at(rows, idx, 0).trim();
                if student_id.is_empty() {
                    return None;
                }
                let spreadsheet_id = match cell_at(rows, idx, 1).trim() {
                    "" => self.master_spreadsheet_id.clone(),
                    id => id.to_string(),
                };
                let label = tab_label(cell_at(rows, idx, 3));
                let tab_name = if label.is_empty() {
                    self.default_student_tab.clone()
                } else {
                    label
                };
                Some((
                    address,
                    DirectoryEntry {
                        student_id: student_id.to_string(),
                        spreadsheet_id,
                        display_name: cell_at(rows, idx, 2).trim().to_string(),
                        tab_name,
                    },
                ))
            })
            .collect()
    }
}

/// Builds the clickable link written into the directory's tab column.
pub fn hyperlink_formula(tab_id: TabId, label: &str) -> String {
    format!(
        "=HYPERLINK(\"#gid={tab_id}\",\"{}\")",
        label.replace('"', "\"\"")
    )
}

/// Extracts the tab name from a tab cell holding either plain text or a
/// `HYPERLINK` formula.
pub fn tab_label(cell: &str) -> String {
    let trimmed = cell.trim();
    match HYPERLINK_RE.captures(trimmed).and_then(|caps| caps.get(1)) {
        Some(label) => label.as_str().replace("\"\"", "\"").trim().to_string(),
        None => trimmed.to_string(),
    }
}
