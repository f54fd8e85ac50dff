use mentorsheet_core::{
    A1Range, CellRows, DirectoryResolver, GoalInfoRepository, MetricsAggregator,
    NewScheduleEvent, QuestionQueue, SalesRepository, ScheduleStore, SqliteTabularStore,
    TabularStore, WorkspaceConfig, ERROR_SENTINEL, UNSTARTED_BUCKET,
};
use std::sync::Arc;

const MASTER: &str = "master-sheet";

fn rows(values: &[&[&str]]) -> CellRows {
    values
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect()
}

fn student_tab(store: &SqliteTabularStore, title: &str, mentor: &str, week: &str) {
    store.add_tab(MASTER, title).unwrap();
    store
        .update_range(
            MASTER,
            &A1Range::cell(title, 0, 1),
            &rows(&[
                &["今月の目標", "", "課題", "", "メンター"],
                &["goal", "", "", "", mentor],
                &[],
                &["", "", "", "現在", week],
            ]),
        )
        .unwrap();
}

struct Fixture {
    store: Arc<SqliteTabularStore>,
    questions: Arc<QuestionQueue>,
    schedule: Arc<ScheduleStore>,
    metrics: MetricsAggregator,
}

fn fixture() -> Fixture {
    let store = Arc::new(SqliteTabularStore::open_in_memory().unwrap());
    store.create_spreadsheet(MASTER).unwrap();
    store.add_tab(MASTER, "Master").unwrap();
    store
        .update_range(
            MASTER,
            &A1Range::cell("Master", 0, 1),
            &rows(&[
                &["student_id", "spreadsheet_id", "name", "tab"],
                &["s1", "", "Aiko", "行動管理②"],
                &["s2", "", "Ben", "行動管理③"],
                &["s3", "", "Chika", "行動管理⑨"],
                &["s4", "", "Dai", "行動管理④"],
            ]),
        )
        .unwrap();
    student_tab(&store, "行動管理②", "Mentor K", "Week2");
    student_tab(&store, "行動管理③", "Mentor K", "Week1");
    student_tab(&store, "行動管理④", "Mentor M", "-");

    let config = WorkspaceConfig::for_spreadsheet(MASTER);
    let shared: Arc<dyn TabularStore> = store.clone();
    let questions = Arc::new(QuestionQueue::new(Arc::clone(&shared), &config));
    let schedule = Arc::new(ScheduleStore::new(Arc::clone(&shared), &config));
    let metrics = MetricsAggregator::new(
        Arc::new(DirectoryResolver::new(Arc::clone(&shared), &config)),
        GoalInfoRepository::new(Arc::clone(&shared)),
        Arc::clone(&questions),
        Arc::clone(&schedule),
        SalesRepository::new(shared, &config),
    );
    Fixture {
        store,
        questions,
        schedule,
        metrics,
    }
}

#[test]
fn dashboard_counts_students_questions_and_events() {
    let fx = fixture();
    let asked = fx.questions.submit("s1", "q1").unwrap();
    fx.questions.submit("s2", "q2").unwrap();
    fx.questions.reply(asked.row, "a1").unwrap();
    fx.schedule
        .create(NewScheduleEvent::new("面談", "2025-02-01", "2025-02-01", "meeting"))
        .unwrap();

    let dashboard = fx.metrics.dashboard().unwrap();

    assert_eq!(dashboard.total_students, 4);
    assert_eq!(dashboard.unanswered_questions, 1);
    assert_eq!(dashboard.schedule_events, 1);
    assert_eq!(dashboard.students[0].mentor, "Mentor K");
    assert_eq!(dashboard.students[0].current_week, "Week2");
}

#[test]
fn unreadable_student_gets_error_sentinel_only() {
    let fx = fixture();
    let dashboard = fx.metrics.dashboard().unwrap();

    let failed: Vec<&str> = dashboard
        .students
        .iter()
        .filter(|s| s.load_failed)
        .map(|s| s.student_id.as_str())
        .collect();
    assert_eq!(failed, vec!["s3"]);
    assert_eq!(dashboard.students[2].monthly_goal, ERROR_SENTINEL);
    assert_eq!(dashboard.students[2].display_name, "Chika");
    assert_eq!(dashboard.students[3].monthly_goal, "goal");
}

#[test]
fn progress_histogram_orders_buckets() {
    let fx = fixture();
    let dashboard = fx.metrics.dashboard().unwrap();

    let buckets: Vec<(&str, usize)> = dashboard
        .progress
        .iter()
        .map(|b| (b.label.as_str(), b.count))
        .collect();
    assert_eq!(
        buckets,
        vec![
            (UNSTARTED_BUCKET, 1),
            ("Week1", 1),
            ("Week2", 1),
            (ERROR_SENTINEL, 1),
        ]
    );
}

#[test]
fn sales_tab_is_seeded_on_first_read() {
    let fx = fixture();
    let dashboard = fx.metrics.dashboard().unwrap();

    let months: Vec<&str> = dashboard.sales.iter().map(|m| m.month.as_str()).collect();
    assert_eq!(months, vec!["1月", "2月", "3月", "4月", "5月"]);
    assert_eq!(dashboard.total_revenue, 0.0);

    let header = fx
        .store
        .get_range(MASTER, &A1Range::block("売上", 0, 2, 1, 1))
        .unwrap();
    assert_eq!(header, rows(&[&["月", "売上", "目標"]]));
}

#[test]
fn sales_amounts_tolerate_currency_formatting() {
    let fx = fixture();
    fx.store.add_tab(MASTER, "売上").unwrap();
    fx.store
        .update_range(
            MASTER,
            &A1Range::cell("売上", 0, 1),
            &rows(&[
                &["月", "売上", "目標"],
                &["1月", "¥1,200", "1000"],
                &["2月", "800円", "n/a"],
            ]),
        )
        .unwrap();

    let dashboard = fx.metrics.dashboard().unwrap();
    assert_eq!(dashboard.sales.len(), 2);
    assert_eq!(dashboard.total_revenue, 2000.0);
    assert_eq!(dashboard.total_target, 1000.0);
}

#[test]
fn empty_directory_yields_empty_dashboard_sections() {
    let store = SqliteTabularStore::open_in_memory().unwrap();
    store.create_spreadsheet(MASTER).unwrap();
    store.add_tab(MASTER, "Master").unwrap();
    let config = WorkspaceConfig::for_spreadsheet(MASTER);
    let shared: Arc<dyn TabularStore> = Arc::new(store);
    let metrics = MetricsAggregator::new(
        Arc::new(DirectoryResolver::new(Arc::clone(&shared), &config)),
        GoalInfoRepository::new(Arc::clone(&shared)),
        Arc::new(QuestionQueue::new(Arc::clone(&shared), &config)),
        Arc::new(ScheduleStore::new(Arc::clone(&shared), &config)),
        SalesRepository::new(shared, &config),
    );

    let dashboard = metrics.dashboard().unwrap();
    assert_eq!(dashboard.total_students, 0);
    assert!(dashboard.progress.is_empty());
    assert_eq!(dashboard.sales.len(), 5);
}

#[test]
fn shadowed_directory_rows_are_not_counted() {
    let fx = fixture();
    student_tab(&fx.store, "行動管理⑤", "Mentor Z", "Week3");
    fx.store
        .append_rows(
            MASTER,
            &A1Range::rows_from("Master", 0, 3, 1),
            &rows(&[&["s1", "", "Aiko (old)", "行動管理⑤"]]),
        )
        .unwrap();

    let dashboard = fx.metrics.dashboard().unwrap();

    assert_eq!(dashboard.total_students, 4);
    let aiko: Vec<_> = dashboard
        .students
        .iter()
        .filter(|s| s.student_id == "s1")
        .collect();
    assert_eq!(aiko.len(), 1);
    assert_eq!(aiko[0].current_week, "Week2");
    assert_eq!(aiko[0].display_name, "Aiko");
    assert!(dashboard.progress.iter().all(|b| b.label != "Week3"));
}
