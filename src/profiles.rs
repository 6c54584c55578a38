use serde::Serialize;

pub const CLUSTER_COUNT: usize = 4;

/// Hand-authored description of one behavioral archetype.
#[derive(Debug, Serialize)]
pub struct ClusterProfile {
    pub cluster_id: usize,
    pub name: &'static str,
    pub description: &'static str,
    pub avg_study_duration: f64,
    pub preferred_time: &'static str,
    pub distraction_level: &'static str,
    pub quiz_performance: u32,
    pub common_tools: &'static [&'static str],
    pub recommended_hours: f64,
    /// Minutes between breaks.
    pub break_interval: u32,
    pub suggested_method: &'static str,
    pub recommended_tools: &'static [&'static str],
}

pub static CLUSTER_PROFILES: [ClusterProfile; CLUSTER_COUNT] = [
    ClusterProfile {
        cluster_id: 0,
        name: "Focused Studiers",
        description: "Long sessions, few distractions",
        avg_study_duration: 4.2,
        preferred_time: "Morning (8am-12pm)",
        distraction_level: "Low",
        quiz_performance: 88,
        common_tools: &["Pomodoro", "Notes"],
        recommended_hours: 3.5,
        break_interval: 25,
        suggested_method: "Pomodoro Technique",
        recommended_tools: &["Pomodoro Timer", "Focus Music", "Digital Notes"],
    },
    ClusterProfile {
        cluster_id: 1,
        name: "Short Burst Learners",
        description: "Brief, frequent sessions",
        avg_study_duration: 1.8,
        preferred_time: "Afternoon (2pm-6pm)",
        distraction_level: "Medium",
        quiz_performance: 75,
        common_tools: &["Flashcards", "Videos"],
        recommended_hours: 2.0,
        break_interval: 15,
        suggested_method: "Spaced Repetition",
        recommended_tools: &["Flashcard Apps", "Video Tutorials", "Quick Quizzes"],
    },
    ClusterProfile {
        cluster_id: 2,
        name: "Night Owls",
        description: "Late night study sessions",
        avg_study_duration: 3.5,
        preferred_time: "Night (8pm-12am)",
        distraction_level: "Low",
        quiz_performance: 82,
        common_tools: &["Reading", "Practice"],
        recommended_hours: 3.0,
        break_interval: 30,
        suggested_method: "Deep Work Sessions",
        recommended_tools: &["Site Blocker", "Ambient Sounds", "Practice Problems"],
    },
    ClusterProfile {
        cluster_id: 3,
        name: "Distracted Learners",
        description: "High interruption frequency",
        avg_study_duration: 2.2,
        preferred_time: "Evening (6pm-8pm)",
        distraction_level: "High",
        quiz_performance: 68,
        common_tools: &["Apps", "Groups"],
        recommended_hours: 1.5,
        break_interval: 10,
        suggested_method: "Structured Environment",
        recommended_tools: &["Website Blockers", "Study Groups", "Accountability Apps"],
    },
];

/// Profile for `cluster_id`, or the first profile when the id is unknown.
pub fn lookup(cluster_id: usize) -> &'static ClusterProfile {
    CLUSTER_PROFILES
        .get(cluster_id)
        .unwrap_or(&CLUSTER_PROFILES[0])
}

#[derive(Debug, Serialize)]
pub struct ClusterInsights {
    pub cluster_profiles: &'static [ClusterProfile],
    /// Rows in the reference dataset on disk; `None` when there is no usable one yet.
    pub reference_samples: Option<usize>,
}

pub fn insights(reference_samples: Option<usize>) -> ClusterInsights {
    ClusterInsights {
        cluster_profiles: &CLUSTER_PROFILES,
        reference_samples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_positions() {
        for (index, profile) in CLUSTER_PROFILES.iter().enumerate() {
            assert_eq!(profile.cluster_id, index);
        }
    }

    #[test]
    fn known_ids_resolve() {
        assert_eq!(lookup(2).name, "Night Owls");
        assert_eq!(lookup(3).break_interval, 10);
    }

    #[test]
    fn insights_carry_profiles_and_sample_count() {
        let value = serde_json::to_value(insights(Some(1248))).unwrap();
        assert_eq!(value["reference_samples"], 1248);
        assert_eq!(value["cluster_profiles"].as_array().unwrap().len(), CLUSTER_COUNT);
        assert_eq!(value["cluster_profiles"][3]["name"], "Distracted Learners");

        let empty = serde_json::to_value(insights(None)).unwrap();
        assert!(empty["reference_samples"].is_null());
    }

    #[test]
    fn unknown_id_falls_back_to_first_profile() {
        assert_eq!(lookup(4).name, "Focused Studiers");
        assert_eq!(lookup(usize::MAX).cluster_id, 0);
    }
}
