use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::error::PipelineError;

/// A student needs this many logged sessions before a cluster is assigned.
pub const MIN_LOGS_FOR_CLUSTER: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct Student {
    pub student_id: String,
    pub name: String,
    pub cluster_id: Option<usize>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudyLog {
    pub log_id: i64,
    pub student_id: String,
    pub date: NaiveDate,
    pub study_hours: f64,
    pub subject: String,
    pub time_of_day: String,
    pub method: String,
    pub distraction_level: String,
    pub quiz_score: Option<i32>,
}

/// A session as submitted by a caller, before it has a log id.
#[derive(Debug, Clone)]
pub struct NewStudyLog {
    pub student_id: String,
    pub date: NaiveDate,
    pub study_hours: f64,
    pub subject: String,
    pub time_of_day: String,
    pub method: String,
    pub distraction_level: String,
    pub quiz_score: Option<i32>,
}

impl NewStudyLog {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.student_id.trim().is_empty() {
            return Err(PipelineError::EmptyStudentId);
        }
        if !self.study_hours.is_finite() || self.study_hours < 0.0 {
            return Err(PipelineError::InvalidStudyHours(self.study_hours));
        }
        if let Some(score) = self.quiz_score {
            if !(0..=100).contains(&score) {
                return Err(PipelineError::InvalidQuizScore(score));
            }
        }
        Ok(())
    }

    pub fn into_log(self, log_id: i64) -> StudyLog {
        StudyLog {
            log_id,
            student_id: self.student_id,
            date: self.date,
            study_hours: self.study_hours,
            subject: self.subject,
            time_of_day: self.time_of_day,
            method: self.method,
            distraction_level: self.distraction_level,
            quiz_score: self.quiz_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentStats {
    pub total_sessions: usize,
    pub total_hours: f64,
    pub avg_score: f64,
    pub current_streak: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterCount {
    pub cluster_name: String,
    pub students: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    pub total_students: usize,
    pub total_logs: usize,
    pub active_students: usize,
    pub avg_study_hours: f64,
    pub cluster_distribution: Vec<ClusterCount>,
}
