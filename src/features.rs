use std::collections::BTreeMap;

use crate::models::StudyLog;

pub const FEATURE_COUNT: usize = 4;

pub const SCORE_COLUMN: usize = 1;

pub type FeatureVector = [f64; FEATURE_COUNT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistractionLevel {
    None,
    Low,
    Medium,
    High,
}

impl DistractionLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn code(self) -> f64 {
        match self {
            Self::None | Self::Low => 0.0,
            Self::Medium => 1.0,
            Self::High => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "morning" => Some(Self::Morning),
            "afternoon" => Some(Self::Afternoon),
            "evening" => Some(Self::Evening),
            "night" => Some(Self::Night),
            _ => None,
        }
    }

    pub fn code(self) -> f64 {
        match self {
            Self::Morning => 0.0,
            Self::Afternoon => 1.0,
            Self::Evening => 2.0,
            Self::Night => 3.0,
        }
    }
}

/// Unknown distraction text encodes as Medium.
pub fn distraction_code(raw: &str) -> f64 {
    DistractionLevel::parse(raw)
        .unwrap_or(DistractionLevel::Medium)
        .code()
}

/// Unknown time-of-day text encodes as Morning.
pub fn time_code(raw: &str) -> f64 {
    TimeOfDay::parse(raw).unwrap_or(TimeOfDay::Morning).code()
}

pub fn encode(
    study_hours: f64,
    quiz_score: f64,
    distraction_level: &str,
    preferred_time: &str,
) -> FeatureVector {
    [
        study_hours,
        quiz_score,
        distraction_code(distraction_level),
        time_code(preferred_time),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub log_count: usize,
    pub avg_hours: f64,
    /// Mean over logs carrying a positive score; `None` when no log has one.
    pub avg_score: Option<f64>,
    pub distraction_level: String,
    pub time_of_day: String,
}

impl HistorySummary {
    pub fn features(&self, fallback_score: f64) -> FeatureVector {
        encode(
            self.avg_hours,
            self.avg_score.unwrap_or(fallback_score),
            &self.distraction_level,
            &self.time_of_day,
        )
    }
}

pub fn summarize(logs: &[StudyLog]) -> Option<HistorySummary> {
    if logs.is_empty() {
        return None;
    }

    let total_hours: f64 = logs.iter().map(|log| log.study_hours).sum();
    let scores: Vec<f64> = logs
        .iter()
        .filter_map(|log| log.quiz_score)
        .filter(|score| *score > 0)
        .map(f64::from)
        .collect();
    let avg_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    Some(HistorySummary {
        log_count: logs.len(),
        avg_hours: total_hours / logs.len() as f64,
        avg_score,
        distraction_level: most_frequent(logs.iter().map(|log| log.distraction_level.as_str())),
        time_of_day: most_frequent(logs.iter().map(|log| log.time_of_day.as_str())),
    })
}

/// Most frequent value after trimming and lowercasing, returned in that
/// normalized form; ties go to the lexically smallest one.
pub fn most_frequent<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value.trim().to_ascii_lowercase()).or_insert(0) += 1;
    }

    let mut best: Option<(String, usize)> = None;
    for (value, count) in counts {
        match best {
            Some((_, best_count)) if best_count >= count => {}
            _ => best = Some((value, count)),
        }
    }

    best.map(|(value, _)| value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn log(hours: f64, score: Option<i32>, distraction: &str, time: &str) -> StudyLog {
        StudyLog {
            log_id: 1,
            student_id: "avery@example.com".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
            study_hours: hours,
            subject: "Chemistry".to_string(),
            time_of_day: time.to_string(),
            method: "Pomodoro".to_string(),
            distraction_level: distraction.to_string(),
            quiz_score: score,
        }
    }

    #[test]
    fn distraction_codes_match_table() {
        assert_eq!(distraction_code("None"), 0.0);
        assert_eq!(distraction_code("Low"), 0.0);
        assert_eq!(distraction_code("Medium"), 1.0);
        assert_eq!(distraction_code("High"), 2.0);
        assert_eq!(distraction_code(" high "), 2.0);
    }

    #[test]
    fn time_codes_match_table() {
        assert_eq!(time_code("Morning"), 0.0);
        assert_eq!(time_code("Afternoon"), 1.0);
        assert_eq!(time_code("Evening"), 2.0);
        assert_eq!(time_code("Night"), 3.0);
    }

    #[test]
    fn unknown_values_fall_back_to_defaults() {
        assert_eq!(distraction_code("Constant"), 1.0);
        assert_eq!(distraction_code(""), 1.0);
        assert_eq!(time_code("Dawn"), 0.0);
        assert_eq!(time_code("Night (8pm-12am)"), 0.0);
    }

    #[test]
    fn encode_orders_columns() {
        assert_eq!(encode(3.5, 88.0, "High", "Evening"), [3.5, 88.0, 2.0, 2.0]);
    }

    #[test]
    fn summary_averages_hours_and_positive_scores() {
        let logs = vec![
            log(3.0, Some(80), "Low", "Morning"),
            log(4.0, Some(85), "Low", "Morning"),
            log(3.5, Some(90), "Low", "Morning"),
            log(1.5, None, "High", "Night"),
            log(2.0, Some(0), "High", "Night"),
        ];
        let summary = summarize(&logs).unwrap();
        assert_eq!(summary.log_count, 5);
        assert!((summary.avg_hours - 2.8).abs() < 1e-9);
        assert!((summary.avg_score.unwrap() - 85.0).abs() < 1e-9);
        assert_eq!(summary.distraction_level, "low");
        assert_eq!(summary.time_of_day, "morning");
    }

    #[test]
    fn summary_without_scores_uses_fallback() {
        let logs = vec![log(2.0, None, "Medium", "Afternoon")];
        let summary = summarize(&logs).unwrap();
        assert_eq!(summary.avg_score, None);
        assert_eq!(summary.features(71.5), [2.0, 71.5, 1.0, 1.0]);
    }

    #[test]
    fn empty_history_has_no_summary() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn ties_break_lexically() {
        assert_eq!(most_frequent(["Night", "Evening", "Night", "Evening"]), "evening");
        assert_eq!(most_frequent(["Low", "High"]), "high");
        assert_eq!(most_frequent(["Low", "High", "Low"]), "low");
    }

    #[test]
    fn spellings_of_one_value_are_counted_together() {
        assert_eq!(most_frequent(["low", "Low", "High"]), "low");
        assert_eq!(most_frequent([" NIGHT", "night ", "Morning"]), "night");

        let logs = vec![
            log(2.0, Some(70), "low", "Evening"),
            log(2.0, Some(70), "Low", "evening"),
            log(2.0, Some(70), "High", "Night"),
        ];
        let summary = summarize(&logs).unwrap();
        assert_eq!(summary.distraction_level, "low");
        assert_eq!(summary.features(0.0)[2], 0.0);
        assert_eq!(summary.features(0.0)[3], 2.0);
    }
}
