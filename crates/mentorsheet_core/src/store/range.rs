//! Typed A1-notation ranges.
//!
//! # Responsibility
//! - Parse and format `Tab!A6:E`, `'Tab name'!D7`, `Tab!A:C` and bare `Tab`.
//! - Keep tab-name quoting rules in one place.
//! - The text form is what a remote spreadsheet adapter puts on the wire;
//!   repositories build ranges through the typed constructors instead.
//!
//! # Invariants
//! - Columns are 0-based (`A` = 0); rows are 1-based like the sheet UI.
//! - An absent end bound means "open-ended" in that dimension.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static CELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]*)([0-9]*)$").expect("valid A1 cell regex"));

/// One rectangular, possibly open-ended, region of a tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct A1Range {
    pub tab: String,
    pub first_col: u32,
    pub first_row: u32,
    pub last_col: Option<u32>,
    pub last_row: Option<u32>,
}

/// A1 parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    EmptyTab,
    UnterminatedQuote(String),
    InvalidCell(String),
    Inverted(String),
}

impl Display for RangeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTab => write!(f, "range has no tab name"),
            Self::UnterminatedQuote(value) => write!(f, "unterminated tab quote in `{value}`"),
            Self::InvalidCell(value) => write!(f, "invalid A1 cell reference `{value}`"),
            Self::Inverted(value) => write!(f, "range end precedes start in `{value}`"),
        }
    }
}

impl Error for RangeError {}

impl A1Range {
    /// The whole tab.
    pub fn whole(tab: impl Into<String>) -> Self {
        Self {
            tab: tab.into(),
            first_col: 0,
            first_row: 1,
            last_col: None,
            last_row: None,
        }
    }

    /// Exactly one cell.
    pub fn cell(tab: impl Into<String>, col: u32, row: u32) -> Self {
        Self {
            tab: tab.into(),
            first_col: col,
            first_row: row,
            last_col: Some(col),
            last_row: Some(row),
        }
    }

    /// Columns `first_col..=last_col`, rows `first_row..` with no lower end.
    pub fn rows_from(tab: impl Into<String>, first_col: u32, last_col: u32, first_row: u32) -> Self {
        Self {
            tab: tab.into(),
            first_col,
            first_row,
            last_col: Some(last_col),
            last_row: None,
        }
    }

    /// Closed rectangle.
    pub fn block(
        tab: impl Into<String>,
        first_col: u32,
        last_col: u32,
        first_row: u32,
        last_row: u32,
    ) -> Self {
        Self {
            tab: tab.into(),
            first_col,
            first_row,
            last_col: Some(last_col),
            last_row: Some(last_row),
        }
    }

    /// Parses A1 notation, with or without a quoted tab name.
    pub fn parse(value: &str) -> Result<Self, RangeError> {
        let trimmed = value.trim();
        let (tab, cells) = split_tab(trimmed)?;
        if tab.is_empty() {
            return Err(RangeError::EmptyTab);
        }

        let Some(cells) = cells else {
            return Ok(Self::whole(tab));
        };

        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (start, Some(end)),
            None => (cells, None),
        };
        let (start_col, start_row) = parse_cell(start)?;
        let mut range = Self {
            tab,
            first_col: start_col.unwrap_or(0),
            first_row: start_row.unwrap_or(1),
            last_col: None,
            last_row: None,
        };

        match end {
            None => {
                if start_col.is_none() || start_row.is_none() {
                    return Err(RangeError::InvalidCell(start.to_string()));
                }
                range.last_col = start_col;
                range.last_row = start_row;
            }
            Some(end) => {
                let (end_col, end_row) = parse_cell(end)?;
                range.last_col = end_col;
                range.last_row = end_row;
            }
        }

        let inverted_col = range.last_col.is_some_and(|col| col < range.first_col);
        let inverted_row = range.last_row.is_some_and(|row| row < range.first_row);
        if inverted_col || inverted_row {
            return Err(RangeError::Inverted(trimmed.to_string()));
        }

        Ok(range)
    }
}

impl Display for A1Range {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", quote_tab(&self.tab))?;
        let whole_tab = self.first_col == 0
            && self.first_row == 1
            && self.last_col.is_none()
            && self.last_row.is_none();
        if whole_tab {
            return Ok(());
        }

        write!(f, "!{}{}", column_letters(self.first_col), self.first_row)?;
        let single =
            self.last_col == Some(self.first_col) && self.last_row == Some(self.first_row);
        if single {
            return Ok(());
        }

        write!(f, ":")?;
        if let Some(col) = self.last_col {
            write!(f, "{}", column_letters(col))?;
        }
        if let Some(row) = self.last_row {
            write!(f, "{row}")?;
        }
        Ok(())
    }
}

/// Converts a 0-based column index into letters (`0` -> `A`, `26` -> `AA`).
pub fn column_letters(index: u32) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Converts column letters into a 0-based index.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut value: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = u32::from(c.to_ascii_uppercase() as u8 - b'A') + 1;
        value = value.checked_mul(26)?.checked_add(digit)?;
    }
    Some(value - 1)
}

/// Quotes a tab name when A1 notation requires it.
pub fn quote_tab(tab: &str) -> String {
    let plain = !tab.is_empty()
        && tab.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !tab.starts_with(|c: char| c.is_ascii_digit());
    if plain {
        tab.to_string()
    } else {
        format!("'{}'", tab.replace('\'', "''"))
    }
}

fn split_tab(value: &str) -> Result<(String, Option<&str>), RangeError> {
    if let Some(rest) = value.strip_prefix('\'') {
        let mut tab = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((idx, c)) = chars.next() {
            if c != '\'' {
                tab.push(c);
                continue;
            }
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                tab.push('\'');
                continue;
            }
            let tail = &rest[idx + 1..];
            return match tail.strip_prefix('!') {
                Some(cells) => Ok((tab, Some(cells))),
                None if tail.is_empty() => Ok((tab, None)),
                None => Err(RangeError::InvalidCell(tail.to_string())),
            };
        }
        return Err(RangeError::UnterminatedQuote(value.to_string()));
    }

    match value.split_once('!') {
        Some((tab, cells)) => Ok((tab.to_string(), Some(cells))),
        None => Ok((value.to_string(), None)),
    }
}

fn parse_cell(value: &str) -> Result<(Option<u32>, Option<u32>), RangeError> {
    let invalid = || RangeError::InvalidCell(value.to_string());
    let captures = CELL_RE.captures(value).ok_or_else(invalid)?;
    let letters = captures.get(1).map_or("", |m| m.as_str());
    let digits = captures.get(2).map_or("", |m| m.as_str());
    if letters.is_empty() && digits.is_empty() {
        return Err(invalid());
    }

    let col = if letters.is_empty() {
        None
    } else {
        Some(column_index(letters).ok_or_else(invalid)?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }
        Some(row)
    };
    Ok((col, row))
}

#[cfg(test)]
mod tests {
    use super::{column_index, column_letters, quote_tab, A1Range, RangeError};

    #[test]
    fn column_letters_round_trip_past_z() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("e"), Some(4));
        assert_eq!(column_index(""), None);
    }

    #[test]
    fn parses_open_ended_task_block() {
        let range = A1Range::parse("行動管理!A6:E").expect("task range should parse");
        assert_eq!(range, A1Range::rows_from("行動管理", 0, 4, 6));
    }

    #[test]
    fn parses_quoted_tab_with_space_and_escaped_quote() {
        let range = A1Range::parse("'行動管理① のコピー'!D7").expect("quoted range should parse");
        assert_eq!(range, A1Range::cell("行動管理① のコピー", 3, 7));

        let range = A1Range::parse("'Bob''s tab'!A:C").expect("escaped quote should parse");
        assert_eq!(range.tab, "Bob's tab");
        assert_eq!(range.first_row, 1);
        assert_eq!(range.last_col, Some(2));
        assert_eq!(range.last_row, None);
    }

    #[test]
    fn bare_tab_is_whole_tab() {
        assert_eq!(A1Range::parse("Master").unwrap(), A1Range::whole("Master"));
    }

    #[test]
    fn rejects_bad_references() {
        assert_eq!(A1Range::parse("!A1"), Err(RangeError::EmptyTab));
        assert!(matches!(
            A1Range::parse("'open!A1"),
            Err(RangeError::UnterminatedQuote(_))
        ));
        assert!(matches!(
            A1Range::parse("Master!A0"),
            Err(RangeError::InvalidCell(_))
        ));
        assert!(matches!(
            A1Range::parse("Master!C5:A1"),
            Err(RangeError::Inverted(_))
        ));
    }

    #[test]
    fn display_quotes_only_when_needed() {
        assert_eq!(quote_tab("Master"), "Master");
        assert_eq!(quote_tab("質問"), "'質問'");
        assert_eq!(A1Range::cell("Master", 3, 7).to_string(), "Master!D7");
        assert_eq!(
            A1Range::rows_from("行動管理①", 0, 4, 6).to_string(),
            "'行動管理①'!A6:E"
        );
        assert_eq!(A1Range::block("Master", 1, 3, 2, 2).to_string(), "Master!B2:D2");
        assert_eq!(A1Range::whole("Master").to_string(), "Master");
    }

    #[test]
    fn display_output_parses_back() {
        let range = A1Range::block("It's", 0, 4, 1, 5);
        assert_eq!(A1Range::parse(&range.to_string()).unwrap(), range);
    }
}
