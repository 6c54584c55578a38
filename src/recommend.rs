use chrono::NaiveDate;
use rand::Rng;
use serde::Serialize;

use crate::models::StudyLog;
use crate::profiles::{self, ClusterProfile};

pub const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
pub const PERFORMANCE_WINDOW: usize = 7;
pub const PENDING_MESSAGE: &str =
    "Log at least 3 study sessions to get personalized recommendations";

const MIN_DAILY_HOURS: f64 = 1.0;
const SCHEDULE_JITTER: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleDay {
    pub day: &'static str,
    pub hours: f64,
}

/// Recent sessions, oldest first. Scores line up with dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceData {
    pub dates: Vec<NaiveDate>,
    pub study_hours: Vec<f64>,
    pub quiz_scores: Vec<Option<i32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationDetails {
    pub cluster_id: usize,
    pub cluster_name: &'static str,
    pub cluster_description: &'static str,
    pub recommended_hours: f64,
    pub break_interval: u32,
    pub suggested_method: &'static str,
    pub recommended_tools: &'static [&'static str],
    pub preferred_time: &'static str,
    pub performance_data: PerformanceData,
    pub weekly_schedule: Vec<ScheduleDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub has_recommendations: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(flatten)]
    pub details: Option<RecommendationDetails>,
}

impl Recommendation {
    pub fn pending() -> Self {
        Self {
            has_recommendations: false,
            message: Some(PENDING_MESSAGE),
            details: None,
        }
    }

    pub fn ready(details: RecommendationDetails) -> Self {
        Self {
            has_recommendations: true,
            message: None,
            details: Some(details),
        }
    }
}

pub fn build<R: Rng + ?Sized>(cluster_id: usize, logs: &[StudyLog], rng: &mut R) -> RecommendationDetails {
    let profile = profiles::lookup(cluster_id);

    RecommendationDetails {
        cluster_id: profile.cluster_id,
        cluster_name: profile.name,
        cluster_description: profile.description,
        recommended_hours: profile.recommended_hours,
        break_interval: profile.break_interval,
        suggested_method: profile.suggested_method,
        recommended_tools: profile.recommended_tools,
        preferred_time: profile.preferred_time,
        performance_data: performance_series(logs),
        weekly_schedule: weekly_schedule(profile, rng),
    }
}

/// The last `PERFORMANCE_WINDOW` sessions by date, returned in ascending order.
pub fn performance_series(logs: &[StudyLog]) -> PerformanceData {
    let mut ordered: Vec<&StudyLog> = logs.iter().collect();
    ordered.sort_by_key(|log| (log.date, log.log_id));
    let recent = &ordered[ordered.len().saturating_sub(PERFORMANCE_WINDOW)..];

    PerformanceData {
        dates: recent.iter().map(|log| log.date).collect(),
        study_hours: recent.iter().map(|log| log.study_hours).collect(),
        quiz_scores: recent.iter().map(|log| log.quiz_score).collect(),
    }
}

/// Base hours jittered by up to half an hour per day, never under one hour.
pub fn weekly_schedule<R: Rng + ?Sized>(profile: &ClusterProfile, rng: &mut R) -> Vec<ScheduleDay> {
    WEEKDAYS
        .iter()
        .map(|&day| {
            let variation = rng.random_range(-SCHEDULE_JITTER..SCHEDULE_JITTER);
            let hours = (profile.recommended_hours + variation).max(MIN_DAILY_HOURS);
            ScheduleDay {
                day,
                hours: round_to(hours, 1),
            }
        })
        .collect()
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
