//! Sales tab used by the dashboard.
//!
//! The tab is seeded with placeholder months the first time it is read so a
//! fresh workspace renders a chart instead of an error.

use crate::config::WorkspaceConfig;
use crate::model::metrics::SalesMetric;
use crate::model::student::RowAddress;
use crate::repo::SheetResult;
use crate::store::{cell_at, find_tab, A1Range, CellRows, TabularStore};
use log::info;
use std::sync::Arc;

const SALES_HEADER: [&str; 3] = ["月", "売上", "目標"];
const PLACEHOLDER_MONTHS: [&str; 5] = ["1月", "2月", "3月", "4月", "5月"];
const SALES_FIRST_ROW: RowAddress = 2;

pub struct SalesRepository {
    store: Arc<dyn TabularStore>,
    spreadsheet_id: String,
    tab: String,
}

impl SalesRepository {
    pub fn new(store: Arc<dyn TabularStore>, config: &WorkspaceConfig) -> Self {
        Self {
            store,
            spreadsheet_id: config.master_spreadsheet_id.clone(),
            tab: config.layout.sales_tab.clone(),
        }
    }

    /// Month rows in sheet order; blank-month rows are skipped.
    pub fn load(&self) -> SheetResult<Vec<SalesMetric>> {
        self.ensure_seeded()?;
        let range = A1Range::rows_from(&self.tab, 0, 2, SALES_FIRST_ROW);
        let rows = self.store.get_range(&self.spreadsheet_id, &range)?;
        Ok(parse_sales_rows(&rows))
    }

    fn ensure_seeded(&self) -> SheetResult<()> {
        let tabs = self.store.list_tabs(&self.spreadsheet_id)?;
        if find_tab(&tabs, &self.tab).is_some() {
            return Ok(());
        }

        self.store.add_tab(&self.spreadsheet_id, &self.tab)?;
        let mut seed: CellRows = vec![SALES_HEADER.iter().map(|h| h.to_string()).collect()];
        seed.extend(
            PLACEHOLDER_MONTHS
                .iter()
                .map(|month| vec![month.to_string(), "0".to_string(), "0".to_string()]),
        );
        self.store
            .update_range(&self.spreadsheet_id, &A1Range::cell(&self.tab, 0, 1), &seed)?;
        info!(
            "event=sales_tab_seed module=repo status=ok rows={}",
            PLACEHOLDER_MONTHS.len()
        );
        Ok(())
    }
}

fn parse_sales_rows(rows: &CellRows) -> Vec<SalesMetric> {
    (0..rows.len())
        .filter_map(|idx| {
            let month = cell_at(rows, idx, 0).trim();
            if month.is_empty() {
                return None;
            }
            Some(SalesMetric {
                month: month.to_string(),
                revenue: parse_amount(cell_at(rows, idx, 1)),
                target: parse_amount(cell_at(rows, idx, 2)),
            })
        })
        .collect()
}

/// Reads `¥1,200` / `1200円` style cells; anything unparseable is `0`.
pub fn parse_amount(cell: &str) -> f64 {
    let cleaned: String = cell
        .chars()
        .filter(|c| !matches!(c, ',' | '¥' | '￥' | '円') && !c.is_whitespace())
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}
