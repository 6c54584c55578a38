use std::path::PathBuf;

use anyhow::Context;
use tracing::Level;

const DEFAULT_MODEL_DIR: &str = "models";
const DEFAULT_DATASET_PATH: &str = "data/sample_student_data.csv";

/// Settings read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub model_dir: PathBuf,
    pub dataset_path: PathBuf,
    pub log_level: Level,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let log_level = match lookup("STUDY_LOG_LEVEL") {
            Some(raw) => raw
                .parse::<Level>()
                .ok()
                .with_context(|| format!("STUDY_LOG_LEVEL has unknown level {raw:?}"))?,
            None => Level::INFO,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            model_dir: lookup("STUDY_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR)),
            dataset_path: lookup("STUDY_DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_PATH)),
            log_level,
        })
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a Postgres instance")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).unwrap();
        assert!(config.database_url().is_err());
        assert_eq!(config.model_dir, PathBuf::from("models"));
        assert_eq!(config.dataset_path, PathBuf::from("data/sample_student_data.csv"));
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/study"),
            ("STUDY_MODEL_DIR", "/var/lib/study/models"),
            ("STUDY_LOG_LEVEL", "debug"),
        ])
        .unwrap();
        assert_eq!(config.database_url().unwrap(), "postgres://localhost/study");
        assert_eq!(config.model_dir, PathBuf::from("/var/lib/study/models"));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        assert!(config(&[("STUDY_LOG_LEVEL", "chatty")]).is_err());
    }
}
