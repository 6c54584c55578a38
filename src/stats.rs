use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDate;

use crate::models::{Analytics, ClusterCount, Student, StudentStats, StudyLog};
use crate::profiles;
use crate::recommend::round_to;

pub fn student_stats(logs: &[StudyLog], today: NaiveDate) -> StudentStats {
    if logs.is_empty() {
        return StudentStats {
            total_sessions: 0,
            total_hours: 0.0,
            avg_score: 0.0,
            current_streak: 0,
        };
    }

    let total_hours: f64 = logs.iter().map(|log| log.study_hours).sum();
    let scores: Vec<f64> = logs
        .iter()
        .filter_map(|log| log.quiz_score)
        .filter(|score| *score > 0)
        .map(f64::from)
        .collect();
    let avg_score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    StudentStats {
        total_sessions: logs.len(),
        total_hours: round_to(total_hours, 1),
        avg_score: round_to(avg_score, 1),
        current_streak: current_streak(logs, today),
    }
}

/// Consecutive days with at least one session, counting back from `today`.
pub fn current_streak(logs: &[StudyLog], today: NaiveDate) -> usize {
    let days: BTreeSet<NaiveDate> = logs.iter().map(|log| log.date).collect();
    let mut streak = 0usize;

    for day in days.iter().rev() {
        if (today - *day).num_days() == streak as i64 {
            streak += 1;
        } else if *day > today {
            continue;
        } else {
            break;
        }
    }

    streak
}

pub fn analytics(students: &[Student], logs: &[StudyLog]) -> Analytics {
    let active: HashSet<&str> = logs.iter().map(|log| log.student_id.as_str()).collect();
    let avg_study_hours = if logs.is_empty() {
        0.0
    } else {
        logs.iter().map(|log| log.study_hours).sum::<f64>() / logs.len() as f64
    };

    let mut distribution: BTreeMap<usize, usize> = BTreeMap::new();
    for cluster_id in students.iter().filter_map(|student| student.cluster_id) {
        *distribution.entry(profiles::lookup(cluster_id).cluster_id).or_insert(0) += 1;
    }

    Analytics {
        total_students: students.len(),
        total_logs: logs.len(),
        active_students: active.len(),
        avg_study_hours: round_to(avg_study_hours, 2),
        cluster_distribution: distribution
            .into_iter()
            .map(|(cluster_id, students)| ClusterCount {
                cluster_name: profiles::lookup(cluster_id).name.to_string(),
                students,
            })
            .collect(),
    }
}
