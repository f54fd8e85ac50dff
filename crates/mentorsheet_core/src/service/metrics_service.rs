//! Administrative dashboard aggregation.
//!
//! # Invariants
//! - Each student appears once, from the directory row `resolve` routes to;
//!   shadowed duplicate rows are ignored.
//! - A student whose tab cannot be read is reported with `ERROR_SENTINEL`
//!   and does not fail the whole dashboard.
//! - Histogram order: `Unstarted`, then `Week<N>` by N ascending, then
//!   any other label (alphabetical).

use crate::model::metrics::{
    DashboardMetrics, ProgressBucket, StudentSnapshot, ERROR_SENTINEL, UNSTARTED_BUCKET,
};
use crate::repo::directory_repo::DirectoryResolver;
use crate::repo::goal_repo::GoalInfoRepository;
use crate::repo::question_repo::QuestionQueue;
use crate::repo::sales_repo::SalesRepository;
use crate::repo::schedule_repo::ScheduleStore;
use crate::repo::SheetResult;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

static WEEK_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Week\s*(\d+)$").expect("valid week label regex"));

pub struct MetricsAggregator {
    resolver: Arc<DirectoryResolver>,
    goals: GoalInfoRepository,
    questions: Arc<QuestionQueue>,
    schedule: Arc<ScheduleStore>,
    sales: SalesRepository,
}

impl MetricsAggregator {
    pub fn new(
        resolver: Arc<DirectoryResolver>,
        goals: GoalInfoRepository,
        questions: Arc<QuestionQueue>,
        schedule: Arc<ScheduleStore>,
        sales: SalesRepository,
    ) -> Self {
        Self {
            resolver,
            goals,
            questions,
            schedule,
            sales,
        }
    }

    /// Builds the full dashboard.
    ///
    /// # Errors
    /// - Fails only when a shared tab (directory, questions, schedule,
    ///   sales) cannot be read.
    pub fn dashboard(&self) -> SheetResult<DashboardMetrics> {
        let started_at = Instant::now();
        let mut seen = HashSet::new();
        let students: Vec<StudentSnapshot> = self
            .resolver
            .list_entries()?
            .into_iter()
            .filter(|entry| seen.insert(entry.student_id.clone()))
            .map(|entry| match self.goals.read(&entry) {
                Ok(info) => StudentSnapshot {
                    student_id: entry.student_id,
                    display_name: entry.display_name,
                    tab_name: entry.tab_name,
                    monthly_goal: info.monthly_goal,
                    mentor: info.mentor,
                    current_week: info.current_week,
                    load_failed: false,
                },
                Err(err) => {
                    warn!(
                        "event=dashboard_student module=service status=error error_code={}",
                        err.code()
                    );
                    StudentSnapshot {
                        student_id: entry.student_id,
                        display_name: entry.display_name,
                        tab_name: entry.tab_name,
                        monthly_goal: ERROR_SENTINEL.to_string(),
                        mentor: ERROR_SENTINEL.to_string(),
                        current_week: ERROR_SENTINEL.to_string(),
                        load_failed: true,
                    }
                }
            })
            .collect();

        let unanswered_questions = self.questions.count_unanswered()?;
        let schedule_events = self.schedule.count()?;
        let sales = self.sales.load()?;
        let progress = progress_histogram(students.iter().map(|s| s.current_week.as_str()));

        let metrics = DashboardMetrics {
            total_students: students.len(),
            total_revenue: sales.iter().map(|m| m.revenue).sum(),
            total_target: sales.iter().map(|m| m.target).sum(),
            students,
            unanswered_questions,
            schedule_events,
            sales,
            progress,
        };
        info!(
            "event=dashboard_build module=service status=ok students={} failed={} duration_ms={}",
            metrics.total_students,
            metrics.students.iter().filter(|s| s.load_failed).count(),
            started_at.elapsed().as_millis()
        );
        Ok(metrics)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum BucketKey {
    Unstarted,
    Week(u64, String),
    Other(String),
}

fn bucket_key(current_week: &str) -> BucketKey {
    let label = current_week.trim();
    if label.is_empty() || label == "-" {
        return BucketKey::Unstarted;
    }
    match WEEK_LABEL_RE
        .captures(label)
        .and_then(|caps| caps.get(1))
        .and_then(|n| n.as_str().parse().ok())
    {
        Some(n) => BucketKey::Week(n, label.to_string()),
        None => BucketKey::Other(label.to_string()),
    }
}

/// Counts students per current-week label in dashboard order.
pub fn progress_histogram<'a>(weeks: impl IntoIterator<Item = &'a str>) -> Vec<ProgressBucket> {
    let mut counts: BTreeMap<BucketKey, usize> = BTreeMap::new();
    for week in weeks {
        *counts.entry(bucket_key(week)).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(key, count)| ProgressBucket {
            label: match key {
                BucketKey::Unstarted => UNSTARTED_BUCKET.to_string(),
                BucketKey::Week(_, label) | BucketKey::Other(label) => label,
            },
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::progress_histogram;

    fn labels_and_counts(weeks: &[&str]) -> (Vec<String>, Vec<usize>) {
        progress_histogram(weeks.iter().copied())
            .into_iter()
            .map(|b| (b.label, b.count))
            .unzip()
    }

    #[test]
    fn unstarted_first_then_weeks_ascending() {
        let (labels, counts) = labels_and_counts(&["-", "Week2", "Week1", "Week1"]);
        assert_eq!(labels, vec!["Unstarted", "Week1", "Week2"]);
        assert_eq!(counts, vec![1, 2, 1]);
    }

    #[test]
    fn weeks_sort_numerically_and_unknown_labels_go_last() {
        let (labels, counts) =
            labels_and_counts(&["Week10", "Error", "", "Week2", "卒業", "Week10"]);
        assert_eq!(labels, vec!["Unstarted", "Week2", "Week10", "Error", "卒業"]);
        assert_eq!(counts, vec![1, 1, 2, 1, 1]);
    }

    #[test]
    fn empty_input_has_no_buckets() {
        assert!(progress_histogram(std::iter::empty::<&str>()).is_empty());
    }
}
