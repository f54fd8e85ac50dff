//! Tabular store capability consumed by every sheet repository.
//!
//! # Responsibility
//! - Define the range-addressed read/write/structural contract the core
//!   depends on, independent of how it reaches a spreadsheet service.
//! - Ship a local SQLite implementation for development and tests.
//!
//! # Invariants
//! - Returned rows mirror spreadsheet semantics: trailing empty cells and
//!   trailing empty rows are omitted, interior gaps are empty strings.
//! - `delete_rows` indices are 0-based and half-open; every other address
//!   uses 1-based rows through `A1Range`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod range;
pub mod sqlite;

pub use range::{A1Range, RangeError};
pub use sqlite::SqliteTabularStore;

/// Row-major cell values.
pub type CellRows = Vec<Vec<String>>;

pub type StoreResult<T> = Result<T, StoreError>;

/// Internal tab identifier (the sheet `gid`).
pub type TabId = i64;

/// One tab of a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub tab_id: TabId,
    pub title: String,
}

/// Transport or addressing failure reported by a store.
#[derive(Debug)]
pub enum StoreError {
    /// The store cannot be reached or is misconfigured.
    Unavailable(String),
    SpreadsheetNotFound(String),
    TabNotFound(String),
    DuplicateTab(String),
    InvalidRange(RangeError),
    Backend(Box<dyn Error + Send + Sync>),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "tabular store unavailable: {reason}"),
            Self::SpreadsheetNotFound(id) => write!(f, "spreadsheet not found: {id}"),
            Self::TabNotFound(tab) => write!(f, "tab not found: {tab}"),
            Self::DuplicateTab(title) => write!(f, "tab title already in use: {title}"),
            Self::InvalidRange(err) => write!(f, "{err}"),
            Self::Backend(err) => write!(f, "tabular store backend error: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRange(err) => Some(err),
            Self::Backend(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<RangeError> for StoreError {
    fn from(value: RangeError) -> Self {
        Self::InvalidRange(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Backend(Box::new(value))
    }
}

impl From<crate::db::DbError> for StoreError {
    fn from(value: crate::db::DbError) -> Self {
        Self::Backend(Box::new(value))
    }
}

/// Range-addressed access to a tabbed spreadsheet.
///
/// Implementations are shared across requests, hence `Send + Sync`.
pub trait TabularStore: Send + Sync {
    fn get_range(&self, spreadsheet_id: &str, range: &A1Range) -> StoreResult<CellRows>;

    /// Overwrites cells starting at the range's top-left corner.
    fn update_range(&self, spreadsheet_id: &str, range: &A1Range, rows: &CellRows)
        -> StoreResult<()>;

    /// Writes `rows` below the last populated row within the range's columns.
    fn append_rows(&self, spreadsheet_id: &str, range: &A1Range, rows: &CellRows)
        -> StoreResult<()>;

    /// Removes rows `[start, end)` (0-based) and shifts later rows up.
    fn delete_rows(&self, spreadsheet_id: &str, tab_id: TabId, start: u32, end: u32)
        -> StoreResult<()>;

    fn list_tabs(&self, spreadsheet_id: &str) -> StoreResult<Vec<TabInfo>>;

    fn add_tab(&self, spreadsheet_id: &str, title: &str) -> StoreResult<TabId>;

    fn rename_tab(&self, spreadsheet_id: &str, tab_id: TabId, title: &str) -> StoreResult<()>;

    /// Duplicates a tab inside the same spreadsheet and returns the copy's id.
    fn copy_tab(&self, spreadsheet_id: &str, tab_id: TabId) -> StoreResult<TabId>;
}

/// Returns the cell at `(row, col)` of a fetched block, or `""` when short.
pub fn cell_at(rows: &CellRows, row: usize, col: usize) -> &str {
    rows.get(row)
        .and_then(|cells| cells.get(col))
        .map_or("", String::as_str)
}

/// Finds a tab by exact title.
pub fn find_tab<'a>(tabs: &'a [TabInfo], title: &str) -> Option<&'a TabInfo> {
    tabs.iter().find(|tab| tab.title == title)
}
