//! Per-student use cases: tasks and goal header.
//!
//! # Invariants
//! - Every call resolves the student first; an unknown id never reaches the
//!   task or goal repositories.

use crate::model::student::{DirectoryEntry, GoalInfo, RowAddress, Task};
use crate::repo::directory_repo::DirectoryResolver;
use crate::repo::goal_repo::GoalInfoRepository;
use crate::repo::task_repo::TaskSheetRepository;
use crate::repo::SheetResult;
use std::sync::Arc;

pub struct StudentService {
    resolver: Arc<DirectoryResolver>,
    tasks: TaskSheetRepository,
    goals: GoalInfoRepository,
}

impl StudentService {
    pub fn new(
        resolver: Arc<DirectoryResolver>,
        tasks: TaskSheetRepository,
        goals: GoalInfoRepository,
    ) -> Self {
        Self {
            resolver,
            tasks,
            goals,
        }
    }

    /// Directory lookup used by the login gate.
    pub fn directory_entry(&self, student_id: &str) -> SheetResult<DirectoryEntry> {
        self.resolver.resolve(student_id)
    }

    pub fn tasks(&self, student_id: &str) -> SheetResult<Vec<Task>> {
        let entry = self.resolver.resolve(student_id)?;
        self.tasks.list_tasks(&entry)
    }

    pub fn set_task_status(
        &self,
        student_id: &str,
        row: RowAddress,
        status: &str,
    ) -> SheetResult<()> {
        let entry = self.resolver.resolve(student_id)?;
        self.tasks.set_status(&entry, row, status)
    }

    pub fn goal_info(&self, student_id: &str) -> SheetResult<GoalInfo> {
        let entry = self.resolver.resolve(student_id)?;
        self.goals.read(&entry)
    }
}
