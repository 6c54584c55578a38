use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use chrono::Utc;

use crate::models::{NewStudyLog, Student, StudyLog};

/// Storage for students and their study logs.
///
/// Logs are append-only; the only student mutation is the cluster assignment.
#[allow(async_fn_in_trait)]
pub trait StudyStore {
    /// Creates the student if unknown and returns the stored record.
    async fn register_student(&self, student_id: &str, name: &str) -> anyhow::Result<Student>;

    async fn student(&self, student_id: &str) -> anyhow::Result<Option<Student>>;

    async fn students(&self) -> anyhow::Result<Vec<Student>>;

    async fn append_log(&self, log: NewStudyLog) -> anyhow::Result<i64>;

    async fn logs_for_student(&self, student_id: &str) -> anyhow::Result<Vec<StudyLog>>;

    async fn all_logs(&self) -> anyhow::Result<Vec<StudyLog>>;

    async fn set_cluster(&self, student_id: &str, cluster_id: usize) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    students: Vec<Student>,
    logs: Vec<StudyLog>,
}

/// Process-local store; contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

impl StudyStore for MemoryStore {
    async fn register_student(&self, student_id: &str, name: &str) -> anyhow::Result<Student> {
        let mut state = self.lock()?;
        if let Some(existing) = state.students.iter().find(|s| s.student_id == student_id) {
            return Ok(existing.clone());
        }

        let student = Student {
            student_id: student_id.to_string(),
            name: name.to_string(),
            cluster_id: None,
            created_at: Utc::now(),
        };
        state.students.push(student.clone());
        Ok(student)
    }

    async fn student(&self, student_id: &str) -> anyhow::Result<Option<Student>> {
        let state = self.lock()?;
        Ok(state
            .students
            .iter()
            .find(|s| s.student_id == student_id)
            .cloned())
    }

    async fn students(&self) -> anyhow::Result<Vec<Student>> {
        Ok(self.lock()?.students.clone())
    }

    async fn append_log(&self, log: NewStudyLog) -> anyhow::Result<i64> {
        let mut state = self.lock()?;
        let log_id = state.logs.len() as i64 + 1;
        state.logs.push(log.into_log(log_id));
        Ok(log_id)
    }

    async fn logs_for_student(&self, student_id: &str) -> anyhow::Result<Vec<StudyLog>> {
        let state = self.lock()?;
        Ok(state
            .logs
            .iter()
            .filter(|log| log.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn all_logs(&self) -> anyhow::Result<Vec<StudyLog>> {
        Ok(self.lock()?.logs.clone())
    }

    async fn set_cluster(&self, student_id: &str, cluster_id: usize) -> anyhow::Result<()> {
        let mut state = self.lock()?;
        let student = state
            .students
            .iter_mut()
            .find(|s| s.student_id == student_id)
            .ok_or_else(|| anyhow!("unknown student {student_id}"))?;
        student.cluster_id = Some(cluster_id);
        Ok(())
    }
}
