//! Dashboard aggregation output.

use serde::{Deserialize, Serialize};

/// Current-week value shown for a student whose tab could not be read.
pub const ERROR_SENTINEL: &str = "Error";
/// Histogram label for students without a week yet.
pub const UNSTARTED_BUCKET: &str = "Unstarted";

/// One month row of the sales tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesMetric {
    pub month: String,
    pub revenue: f64,
    pub target: f64,
}

/// Per-student dashboard line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSnapshot {
    pub student_id: String,
    pub display_name: String,
    pub tab_name: String,
    pub monthly_goal: String,
    pub mentor: String,
    /// Week label, or `ERROR_SENTINEL` when `load_failed`.
    pub current_week: String,
    pub load_failed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressBucket {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub students: Vec<StudentSnapshot>,
    pub total_students: usize,
    pub unanswered_questions: usize,
    pub schedule_events: usize,
    pub sales: Vec<SalesMetric>,
    pub total_revenue: f64,
    pub total_target: f64,
    pub progress: Vec<ProgressBucket>,
}
