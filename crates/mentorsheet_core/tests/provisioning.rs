use mentorsheet_core::service::provisioning_service::sequence_name;
use mentorsheet_core::{
    A1Range, CellRows, DirectoryResolver, ProvisioningEngine, SheetError, SqliteTabularStore,
    StoreError, StoreResult, TabId, TabInfo, TabularStore, WorkspaceConfig,
};
use std::sync::Arc;

const MASTER: &str = "master-sheet";
const TEMPLATE: &str = "行動管理①";

fn rows(values: &[&[&str]]) -> CellRows {
    values
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect()
}

struct Workspace {
    store: Arc<SqliteTabularStore>,
    resolver: Arc<DirectoryResolver>,
    engine: ProvisioningEngine,
}

impl Workspace {
    fn titles(&self) -> Vec<String> {
        self.store
            .list_tabs(MASTER)
            .unwrap()
            .into_iter()
            .map(|tab| tab.title)
            .collect()
    }

    fn directory(&self) -> CellRows {
        self.store
            .get_range(MASTER, &A1Range::rows_from("Master", 0, 3, 2))
            .unwrap()
    }
}

fn workspace(extra_tabs: &[&str]) -> Workspace {
    let store = Arc::new(SqliteTabularStore::open_in_memory().unwrap());
    store.create_spreadsheet(MASTER).unwrap();
    store.add_tab(MASTER, "Master").unwrap();
    store
        .update_range(
            MASTER,
            &A1Range::cell("Master", 0, 1),
            &rows(&[&["student_id", "spreadsheet_id", "name", "tab"]]),
        )
        .unwrap();
    for title in extra_tabs {
        store.add_tab(MASTER, title).unwrap();
    }

    let config = WorkspaceConfig::for_spreadsheet(MASTER);
    let shared: Arc<dyn TabularStore> = store.clone();
    let resolver = Arc::new(DirectoryResolver::new(Arc::clone(&shared), &config));
    let engine = ProvisioningEngine::new(shared, Arc::clone(&resolver), &config);
    Workspace {
        store,
        resolver,
        engine,
    }
}

#[test]
fn create_student_copies_template_and_registers_directory_row() {
    let ws = workspace(&[TEMPLATE]);
    ws.store
        .update_range(
            MASTER,
            &A1Range::cell(TEMPLATE, 0, 1),
            &rows(&[&["今月の目標"], &[], &[], &[], &[], &["Week1", "初回面談"]]),
        )
        .unwrap();

    let created = ws.engine.create_student(" Aiko ", "s1").unwrap();

    assert_eq!(created.entry.tab_name, "行動管理②");
    assert_eq!(created.entry.display_name, "Aiko");
    assert_eq!(ws.titles(), vec!["Master", TEMPLATE, "行動管理②"]);

    let copied = ws
        .store
        .get_range(MASTER, &A1Range::rows_from("行動管理②", 0, 4, 6))
        .unwrap();
    assert_eq!(copied, rows(&[&["Week1", "初回面談"]]));

    let link = format!("=HYPERLINK(\"#gid={}\",\"行動管理②\")", created.tab_id);
    assert_eq!(ws.directory(), rows(&[&["s1", MASTER, "Aiko", link.as_str()]]));

    let resolved = ws.resolver.resolve("s1").unwrap();
    assert_eq!(resolved, created.entry);
}

#[test]
fn next_name_continues_after_highest_existing_tab() {
    let ws = workspace(&[TEMPLATE, "行動管理②", "行動管理③"]);
    let created = ws.engine.create_student("Ben", "s2").unwrap();
    assert_eq!(created.entry.tab_name, "行動管理④");
}

#[test]
fn names_switch_to_decimal_after_twenty() {
    let titles: Vec<String> = (1..=20).map(|i| sequence_name("行動管理", i)).collect();
    let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
    let ws = workspace(&refs);

    let created = ws.engine.create_student("Chika", "s3").unwrap();
    assert_eq!(created.entry.tab_name, "行動管理21");
}

#[test]
fn prefixed_tab_stands_in_for_missing_template() {
    let ws = workspace(&["行動管理⑤"]);
    let created = ws.engine.create_student("Dai", "s4").unwrap();

    assert_eq!(created.entry.tab_name, "行動管理⑥");
    assert!(ws.titles().contains(&"行動管理⑥".to_string()));
}

#[test]
fn missing_template_fails_without_side_effects() {
    let ws = workspace(&["質問"]);

    let err = ws.engine.create_student("Eri", "s5").unwrap_err();
    assert!(matches!(err, SheetError::TemplateNotFound(_)));
    assert_eq!(ws.titles(), vec!["Master", "質問"]);
    assert!(ws.directory().is_empty());
}

#[test]
fn blank_name_or_id_is_rejected_before_any_write() {
    let ws = workspace(&[TEMPLATE]);

    assert!(matches!(
        ws.engine.create_student(" ", "s1").unwrap_err(),
        SheetError::InvalidInput(_)
    ));
    assert!(matches!(
        ws.engine.create_student("Aiko", "").unwrap_err(),
        SheetError::InvalidInput(_)
    ));
    assert_eq!(ws.titles(), vec!["Master", TEMPLATE]);
}

#[test]
fn delete_student_removes_every_row_but_keeps_the_tab() {
    let ws = workspace(&[TEMPLATE]);
    ws.engine.create_student("Aiko", "s1").unwrap();
    ws.engine.create_student("Ben", "s2").unwrap();
    ws.store
        .append_rows(
            MASTER,
            &A1Range::rows_from("Master", 0, 3, 1),
            &rows(&[&["s1", "", "Aiko (dup)", "行動管理②"]]),
        )
        .unwrap();

    assert_eq!(ws.resolver.resolve("s1").unwrap().display_name, "Aiko");

    let removed = ws.engine.delete_student("s1").unwrap();
    assert_eq!(removed, 2);

    let remaining = ws.directory();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0][0], "s2");
    assert!(ws.titles().contains(&"行動管理②".to_string()));

    assert!(ws.resolver.resolve("s1").unwrap_err().is_not_found());
    assert_eq!(ws.resolver.resolve("s2").unwrap().tab_name, "行動管理③");
}

#[test]
fn deleting_unknown_student_is_not_found() {
    let ws = workspace(&[TEMPLATE]);
    let err = ws.engine.delete_student("ghost").unwrap_err();
    assert!(matches!(err, SheetError::StudentNotFound(_)));
}

/// Delegates to SQLite but refuses every rename.
struct RenameRejectingStore {
    inner: SqliteTabularStore,
}

impl TabularStore for RenameRejectingStore {
    fn get_range(&self, spreadsheet_id: &str, range: &A1Range) -> StoreResult<CellRows> {
        self.inner.get_range(spreadsheet_id, range)
    }

    fn update_range(
        &self,
        spreadsheet_id: &str,
        range: &A1Range,
        rows: &CellRows,
    ) -> StoreResult<()> {
        self.inner.update_range(spreadsheet_id, range, rows)
    }

    fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &A1Range,
        rows: &CellRows,
    ) -> StoreResult<()> {
        self.inner.append_rows(spreadsheet_id, range, rows)
    }

    fn delete_rows(
        &self,
        spreadsheet_id: &str,
        tab_id: TabId,
        start: u32,
        end: u32,
    ) -> StoreResult<()> {
        self.inner.delete_rows(spreadsheet_id, tab_id, start, end)
    }

    fn list_tabs(&self, spreadsheet_id: &str) -> StoreResult<Vec<TabInfo>> {
        self.inner.list_tabs(spreadsheet_id)
    }

    fn add_tab(&self, spreadsheet_id: &str, title: &str) -> StoreResult<TabId> {
        self.inner.add_tab(spreadsheet_id, title)
    }

    fn rename_tab(&self, _: &str, _: TabId, _: &str) -> StoreResult<()> {
        Err(StoreError::Unavailable("rename quota exceeded".to_string()))
    }

    fn copy_tab(&self, spreadsheet_id: &str, tab_id: TabId) -> StoreResult<TabId> {
        self.inner.copy_tab(spreadsheet_id, tab_id)
    }
}

#[test]
fn rename_failure_leaves_copy_behind_without_directory_row() {
    let inner = SqliteTabularStore::open_in_memory().unwrap();
    inner.create_spreadsheet(MASTER).unwrap();
    inner.add_tab(MASTER, "Master").unwrap();
    inner.add_tab(MASTER, TEMPLATE).unwrap();
    let store = Arc::new(RenameRejectingStore { inner });

    let config = WorkspaceConfig::for_spreadsheet(MASTER);
    let shared: Arc<dyn TabularStore> = store.clone();
    let resolver = Arc::new(DirectoryResolver::new(Arc::clone(&shared), &config));
    let engine = ProvisioningEngine::new(shared, Arc::clone(&resolver), &config);

    let err = engine.create_student("Aiko", "s1").unwrap_err();
    assert!(matches!(err, SheetError::Store(StoreError::Unavailable(_))));

    let titles: Vec<String> = store
        .list_tabs(MASTER)
        .unwrap()
        .into_iter()
        .map(|tab| tab.title)
        .collect();
    assert_eq!(titles.len(), 3);
    assert!(titles.iter().any(|t| t == "行動管理① のコピー"));
    assert!(resolver.list_entries().unwrap().is_empty());
    assert!(resolver.resolve("s1").unwrap_err().is_not_found());
}

#[test]
fn concurrent_provisioning_assigns_distinct_tabs() {
    const STUDENTS: usize = 8;
    let ws = workspace(&[TEMPLATE]);

    let created: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..STUDENTS)
            .map(|i| {
                let engine = &ws.engine;
                scope.spawn(move || {
                    engine
                        .create_student(&format!("Student {i}"), &format!("s{i}"))
                        .unwrap()
                        .entry
                        .tab_name
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut distinct = created;
    distinct.sort();
    distinct.dedup();
    assert_eq!(distinct.len(), STUDENTS);

    let expected: Vec<String> = (2..=STUDENTS as u32 + 1)
        .map(|i| sequence_name("行動管理", i))
        .collect();
    let mut sorted_expected = expected.clone();
    sorted_expected.sort();
    assert_eq!(distinct, sorted_expected);
    assert_eq!(ws.directory().len(), STUDENTS);
}
