//! Header block of a student tab.
//!
//! The block is positional: monthly goal `A2`, bottleneck `C2`, mentor
//! `E2`, current week `E4`, weekly focus `A5`. Labels in rows 1 and 4 are
//! for humans only and are not checked.

use crate::model::student::{DirectoryEntry, GoalInfo};
use crate::repo::SheetResult;
use crate::store::{cell_at, A1Range, CellRows, TabularStore};
use std::sync::Arc;

pub struct GoalInfoRepository {
    store: Arc<dyn TabularStore>,
}

impl GoalInfoRepository {
    pub fn new(store: Arc<dyn TabularStore>) -> Self {
        Self { store }
    }

    /// Reads `A1:E5` of the student's tab.
    pub fn read(&self, entry: &DirectoryEntry) -> SheetResult<GoalInfo> {
        let range = A1Range::block(&entry.tab_name, 0, 4, 1, 5);
        let rows = self.store.get_range(&entry.spreadsheet_id, &range)?;
        Ok(parse_goal_block(&rows))
    }
}

/// Missing cells read as empty strings.
pub fn parse_goal_block(rows: &CellRows) -> GoalInfo {
    let cell = |row: usize, col: usize| cell_at(rows, row, col).trim().to_string();
    GoalInfo {
        monthly_goal: cell(1, 0),
        bottleneck: cell(1, 2),
        mentor: cell(1, 4),
        current_week: cell(3, 4),
        weekly_focus: cell(4, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_goal_block;
    use crate::model::student::GoalInfo;

    #[test]
    fn reads_positional_cells() {
        let block: Vec<Vec<String>> = [
            vec!["今月の目標", "", "課題・ボトルネック", "", "メンター"],
            vec!["売上10万", "", "時間が足りない", "", "TestMentor"],
            vec![],
            vec!["今週の注力", "", "", "Current Week", "Week1"],
            vec!["集客"],
        ]
        .into_iter()
        .map(|row| row.into_iter().map(String::from).collect())
        .collect();

        let info = parse_goal_block(&block);
        assert_eq!(info.monthly_goal, "売上10万");
        assert_eq!(info.bottleneck, "時間が足りない");
        assert_eq!(info.mentor, "TestMentor");
        assert_eq!(info.current_week, "Week1");
        assert_eq!(info.weekly_focus, "集客");
    }

    #[test]
    fn empty_block_yields_defaults() {
        assert_eq!(parse_goal_block(&Vec::new()), GoalInfo::default());
    }
}
