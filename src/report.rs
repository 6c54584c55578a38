use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{Analytics, StudyLog};
use crate::profiles::CLUSTER_PROFILES;

pub fn build_report(generated_on: NaiveDate, analytics: &Analytics, logs: &[StudyLog]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Study Habits Report");
    let _ = writeln!(output, "Generated on {}", generated_on);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Activity");
    let _ = writeln!(output, "- Students: {}", analytics.total_students);
    let _ = writeln!(output, "- Active students: {}", analytics.active_students);
    let _ = writeln!(output, "- Logged sessions: {}", analytics.total_logs);
    let _ = writeln!(output, "- Average hours per session: {:.2}", analytics.avg_study_hours);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Cluster Distribution");

    if analytics.cluster_distribution.is_empty() {
        let _ = writeln!(output, "No students have been clustered yet.");
    } else {
        for entry in analytics.cluster_distribution.iter() {
            let _ = writeln!(output, "- {}: {} students", entry.cluster_name, entry.students);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Archetypes");
    for profile in CLUSTER_PROFILES.iter() {
        let _ = writeln!(
            output,
            "- {} ({}): {:.1}h/day, breaks every {} min, {}",
            profile.name,
            profile.description,
            profile.recommended_hours,
            profile.break_interval,
            profile.suggested_method
        );
    }

    let mut recent_logs = logs.to_vec();
    recent_logs.sort_by(|a, b| b.date.cmp(&a.date).then(b.log_id.cmp(&a.log_id)));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Sessions");

    if recent_logs.is_empty() {
        let _ = writeln!(output, "No sessions logged yet.");
    } else {
        for log in recent_logs.iter().take(10) {
            let score = log
                .quiz_score
                .map(|score| format!("quiz {score}"))
                .unwrap_or_else(|| "no quiz".to_string());
            let _ = writeln!(
                output,
                "- {} on {}: {:.1}h {} ({}, {})",
                log.student_id, log.date, log.study_hours, log.subject, log.time_of_day, score
            );
        }
    }

    output
}
