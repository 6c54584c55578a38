use thiserror::Error;

/// Errors raised by the clustering pipeline itself.
///
/// Store and IO failures travel as `anyhow::Error`; these are the cases the
/// pipeline can name precisely.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("student id must not be empty")]
    EmptyStudentId,

    #[error("study hours must be a finite value >= 0, got {0}")]
    InvalidStudyHours(f64),

    #[error("quiz score must be between 0 and 100, got {0}")]
    InvalidQuizScore(i32),

    #[error("cannot fit on an empty feature matrix")]
    EmptyDataset,

    #[error("need at least {clusters} samples to fit {clusters} clusters, got {samples}")]
    TooFewSamples { samples: usize, clusters: usize },

    #[error("feature row {row} has {found} columns, expected {expected}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("trained model is inconsistent: {0}")]
    InvalidModel(String),
}
