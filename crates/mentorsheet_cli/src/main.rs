//! CLI smoke entry point.
//!
//! # Responsibility
//! - Seed a demo workspace in a local SQLite store and print its dashboard.
//! - Keep output deterministic apart from generated ids and timestamps.
//!
//! Usage: `mentorsheet_cli [store.db]` (in-memory when no path is given).

use mentorsheet_api::{init_logging, MentorDesk};
use mentorsheet_core::{
    A1Range, CellRows, NewScheduleEvent, SqliteTabularStore, TabularStore, WorkspaceConfig,
    TASK_STATUS_IN_PROGRESS, TASK_STATUS_NOT_STARTED,
};
use std::error::Error;
use std::sync::Arc;

const DEMO_SPREADSHEET_ID: &str = "demo-master";

fn main() -> Result<(), Box<dyn Error>> {
    println!("mentorsheet_core ping={}", mentorsheet_core::ping());
    println!("mentorsheet_core version={}", mentorsheet_core::core_version());

    let mut config = WorkspaceConfig::for_spreadsheet(DEMO_SPREADSHEET_ID);
    config.apply_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    if !config.logging.log_dir.is_empty() {
        let error = init_logging(&config.logging);
        if !error.is_empty() {
            eprintln!("logging disabled: {error}");
        }
    }

    let store = match std::env::args().nth(1) {
        Some(path) => SqliteTabularStore::open(path)?,
        None => SqliteTabularStore::open_in_memory()?,
    };
    store.create_spreadsheet(&config.master_spreadsheet_id)?;
    seed_demo_workspace(&store, &config)?;

    let desk = MentorDesk::new(Arc::new(store), &config)?;
    for (name, id) in [("Aiko", "demo-001"), ("Ben", "demo-002")] {
        let response = desk.create_student(name, id);
        println!("create_student id={id} ok={} message={}", response.ok, response.message);
    }

    if let Some(task) = desk.get_tasks("demo-001").first() {
        desk.set_task_status("demo-001", task.id, TASK_STATUS_IN_PROGRESS);
    }
    desk.submit_question("demo-002", "How should I price my first offer?");
    desk.add_schedule(NewScheduleEvent::new(
        "Kickoff",
        "2025-04-01T10:00",
        "2025-04-01T11:00",
        "meeting",
    ));

    for task in desk.get_tasks("demo-001") {
        println!(
            "task row={} week={} status={} title={}",
            task.id, task.week, task.status, task.title
        );
    }

    let metrics = desk.get_dashboard_metrics();
    println!(
        "dashboard students={} unanswered={} events={} revenue={} target={}",
        metrics.total_students,
        metrics.unanswered_questions,
        metrics.schedule_events,
        metrics.total_revenue,
        metrics.total_target
    );
    for bucket in &metrics.progress {
        println!("progress {}={}", bucket.label, bucket.count);
    }
    Ok(())
}

/// Writes the directory header and a template tab unless they already exist.
fn seed_demo_workspace(
    store: &SqliteTabularStore,
    config: &WorkspaceConfig,
) -> Result<(), Box<dyn Error>> {
    let id = &config.master_spreadsheet_id;
    let layout = &config.layout;
    let existing: Vec<String> = store.list_tabs(id)?.into_iter().map(|t| t.title).collect();

    if !existing.contains(&layout.directory_tab) {
        store.add_tab(id, &layout.directory_tab)?;
        store.update_range(
            id,
            &A1Range::cell(&layout.directory_tab, 0, 1),
            &text_rows(&[&["student_id", "spreadsheet_id", "display_name", "tab"]]),
        )?;
    }

    if !existing.contains(&layout.template_tab) {
        store.add_tab(id, &layout.template_tab)?;
        store.update_range(
            id,
            &A1Range::cell(&layout.template_tab, 0, 1),
            &text_rows(&[
                &["今月の目標", "", "課題・ボトルネック", "", "メンター"],
                &["", "", "", "", "Demo Mentor"],
                &[],
                &["今週の注力", "", "", "Current Week", "Week1"],
                &[],
                &[
                    "Week1",
                    "Define target customer",
                    "Write one persona",
                    TASK_STATUS_NOT_STARTED,
                ],
                &["", "Draft landing page", "", TASK_STATUS_NOT_STARTED],
                &["Week2", "Publish first post", "", TASK_STATUS_NOT_STARTED],
            ]),
        )?;
    }
    Ok(())
}

fn text_rows(values: &[&[&str]]) -> CellRows {
    values
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect()
}
