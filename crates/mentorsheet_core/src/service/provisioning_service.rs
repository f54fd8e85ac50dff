//! Student provisioning and removal.
//!
//! # Responsibility
//! - Clone the template tab, name the copy with the next free sequence
//!   name, and register the student in the directory.
//! - Remove every directory row of a student without touching their tab.
//!
//! # Invariants
//! - Sequence names are `<prefix>①` .. `<prefix>⑳`, then `<prefix>21`,
//!   `<prefix>22`, ... (max existing index + 1).
//! - A missing template fails before any write.
//! - The copy -> rename -> register steps are not rolled back; a failure after
//!   the copy leaves an unregistered tab behind.
//! - "Scan names, then create" and directory row deletes run under one
//!   process-local lock.

use crate::config::WorkspaceConfig;
use crate::model::student::DirectoryEntry;
use crate::repo::directory_repo::DirectoryResolver;
use crate::repo::{required, SheetError, SheetResult};
use crate::store::{find_tab, StoreError, TabId, TabInfo, TabularStore};
use log::{info, warn};
use std::sync::{Arc, Mutex, PoisonError};

/// Ordered glyphs for sequence indices 1..=20.
pub const CIRCLED_NUMBERS: [char; 20] = [
    '①', '②', '③', '④', '⑤', '⑥', '⑦', '⑧', '⑨', '⑩', '⑪', '⑫', '⑬', '⑭', '⑮', '⑯', '⑰', '⑱',
    '⑲', '⑳',
];

/// Result of a successful provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedStudent {
    pub entry: DirectoryEntry,
    pub tab_id: TabId,
}

pub struct ProvisioningEngine {
    store: Arc<dyn TabularStore>,
    resolver: Arc<DirectoryResolver>,
    template_tab: String,
    tab_prefix: String,
    directory_lock: Mutex<()>,
}

impl ProvisioningEngine {
    pub fn new(
        store: Arc<dyn TabularStore>,
        resolver: Arc<DirectoryResolver>,
        config: &WorkspaceConfig,
    ) -> Self {
        Self {
            store,
            resolver,
            template_tab: config.layout.template_tab.clone(),
            tab_prefix: config.layout.student_tab_prefix.clone(),
            directory_lock: Mutex::new(()),
        }
    }

    /// Creates a student tab from the template and registers it.
    ///
    /// # Errors
    /// - `InvalidInput` for a blank name or id.
    /// - `TemplateNotFound` when neither the template title nor any
    ///   prefixed tab exists; nothing is written in that case.
    pub fn create_student(
        &self,
        display_name: &str,
        student_id: &str,
    ) -> SheetResult<ProvisionedStudent> {
        let display_name = required("display_name", display_name)?;
        let student_id = required("student_id", student_id)?;
        let _guard = self
            .directory_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let spreadsheet_id = self.resolver.master_spreadsheet_id().to_string();
        let tabs = self.store.list_tabs(&spreadsheet_id)?;
        let template = find_template(&tabs, &self.template_tab, &self.tab_prefix)
            .ok_or_else(|| SheetError::TemplateNotFound(self.template_tab.clone()))?;
        let tab_name = next_tab_name(&self.tab_prefix, tabs.iter().map(|t| t.title.as_str()));

        let tab_id = self.store.copy_tab(&spreadsheet_id, template.tab_id)?;
        if let Err(err) = self.store.rename_tab(&spreadsheet_id, tab_id, &tab_name) {
            warn!(
                "event=student_provision module=service status=error error_code=rename_failed orphan_tab_id={tab_id}"
            );
            return Err(err.into());
        }

        let entry = DirectoryEntry {
            student_id,
            spreadsheet_id,
            display_name,
            tab_name,
        };
        self.resolver.register(&entry, tab_id)?;

        info!(
            "event=student_provision module=service status=ok template_tab_id={} tab_id={tab_id}",
            template.tab_id
        );
        Ok(ProvisionedStudent { entry, tab_id })
    }

    /// Deletes every directory row for `student_id` and evicts the cache.
    ///
    /// Returns the number of rows removed. The student's tab is kept.
    pub fn delete_student(&self, student_id: &str) -> SheetResult<usize> {
        let student_id = required("student_id", student_id)?;
        let _guard = self
            .directory_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let result = self.delete_directory_rows(&student_id);
        self.resolver.invalidate(&student_id);

        let removed = result?;
        if removed == 0 {
            return Err(SheetError::StudentNotFound(student_id));
        }
        info!("event=student_delete module=service status=ok rows_removed={removed}");
        Ok(removed)
    }

    fn delete_directory_rows(&self, student_id: &str) -> SheetResult<usize> {
        let spreadsheet_id = self.resolver.master_spreadsheet_id();
        let tabs = self.store.list_tabs(spreadsheet_id)?;
        let directory = find_tab(&tabs, self.resolver.directory_tab()).ok_or_else(|| {
            StoreError::TabNotFound(self.resolver.directory_tab().to_string())
        })?;

        let rows = self.resolver.matching_rows(student_id)?;
        // Bottom-up so earlier row addresses stay valid.
        for row in rows.iter().rev() {
            let index = row - 1;
            self.store
                .delete_rows(spreadsheet_id, directory.tab_id, index, index + 1)?;
        }
        Ok(rows.len())
    }
}

/// Exact template title first, then the first tab containing the prefix.
pub fn find_template<'a>(tabs: &'a [TabInfo], template: &str, prefix: &str) -> Option<&'a TabInfo> {
    find_tab(tabs, template).or_else(|| tabs.iter().find(|tab| tab.title.contains(prefix)))
}

/// Index encoded in a tab title, if it is `<prefix><glyph>` or `<prefix><digits>`.
pub fn tab_sequence_index(prefix: &str, title: &str) -> Option<u32> {
    let rest = title.strip_prefix(prefix)?.trim();
    let mut chars = rest.chars();
    if let (Some(glyph), None) = (chars.next(), chars.next()) {
        if let Some(position) = CIRCLED_NUMBERS.iter().position(|c| *c == glyph) {
            return u32::try_from(position + 1).ok();
        }
    }
    if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
        return rest.parse().ok();
    }
    None
}

/// Tab title for a sequence index.
pub fn sequence_name(prefix: &str, index: u32) -> String {
    match usize::try_from(index).ok().filter(|i| (1..=CIRCLED_NUMBERS.len()).contains(i)) {
        Some(i) => format!("{prefix}{}", CIRCLED_NUMBERS[i - 1]),
        None => format!("{prefix}{index}"),
    }
}

/// Next free name: one past the highest index among `titles`.
pub fn next_tab_name<'a>(prefix: &str, titles: impl IntoIterator<Item = &'a str>) -> String {
    let highest = titles
        .into_iter()
        .filter_map(|title| tab_sequence_index(prefix, title))
        .max()
        .unwrap_or(0);
    sequence_name(prefix, highest + 1)
}

#[cfg(test)]
mod tests {
    use super::{find_template, next_tab_name, sequence_name, tab_sequence_index};
    use crate::store::TabInfo;

    const PREFIX: &str = "行動管理";

    #[test]
    fn next_name_follows_circled_sequence() {
        let titles = ["Master", "行動管理①", "行動管理②", "行動管理③"];
        assert_eq!(next_tab_name(PREFIX, titles), "行動管理④");
        assert_eq!(next_tab_name(PREFIX, ["Master"]), "行動管理①");
    }

    #[test]
    fn next_name_falls_back_to_decimal_after_twenty() {
        let titles: Vec<String> = (1..=20).map(|i| sequence_name(PREFIX, i)).collect();
        assert_eq!(titles.last().map(String::as_str), Some("行動管理⑳"));
        assert_eq!(
            next_tab_name(PREFIX, titles.iter().map(String::as_str)),
            "行動管理21"
        );
        assert_eq!(next_tab_name(PREFIX, ["行動管理21", "行動管理⑤"]), "行動管理22");
    }

    #[test]
    fn copies_and_unrelated_titles_do_not_count() {
        assert_eq!(tab_sequence_index(PREFIX, "行動管理① のコピー"), None);
        assert_eq!(tab_sequence_index(PREFIX, "行動管理"), None);
        assert_eq!(tab_sequence_index(PREFIX, "質問"), None);
        assert_eq!(tab_sequence_index(PREFIX, "行動管理⑦"), Some(7));
        assert_eq!(next_tab_name(PREFIX, ["行動管理② のコピー", "行動管理①"]), "行動管理②");
    }

    #[test]
    fn template_lookup_prefers_exact_title() {
        let tabs = vec![
            TabInfo { tab_id: 0, title: "Master".to_string() },
            TabInfo { tab_id: 1, title: "行動管理③".to_string() },
            TabInfo { tab_id: 2, title: "行動管理①".to_string() },
        ];
        assert_eq!(find_template(&tabs, "行動管理①", PREFIX).map(|t| t.tab_id), Some(2));
        assert_eq!(find_template(&tabs, "テンプレート", PREFIX).map(|t| t.tab_id), Some(1));
        assert!(find_template(&tabs[..1], "テンプレート", PREFIX).is_none());
    }
}
