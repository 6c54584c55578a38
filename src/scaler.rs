use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Per-column standardization fit on a reference matrix.
///
/// Uses the population standard deviation. A column without variance keeps
/// a scale of 1.0, so it transforms to `x - mean` instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    pub samples: usize,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, PipelineError> {
        let first = rows.first().ok_or(PipelineError::EmptyDataset)?;
        let columns = first.len();
        check_dimensions(rows, columns)?;

        let n = rows.len() as f64;
        let mut mean = vec![0.0; columns];
        for row in rows {
            for (acc, value) in mean.iter_mut().zip(row) {
                *acc += value;
            }
        }
        mean.iter_mut().for_each(|acc| *acc /= n);

        let mut variance = vec![0.0; columns];
        for row in rows {
            for ((acc, value), m) in variance.iter_mut().zip(row).zip(&mean) {
                *acc += (value - m).powi(2);
            }
        }

        let scale = variance
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > f64::EPSILON {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self {
            mean,
            scale,
            samples: rows.len(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect()
    }

    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}

pub(crate) fn check_dimensions(rows: &[Vec<f64>], expected: usize) -> Result<(), PipelineError> {
    match rows.iter().position(|row| row.len() != expected) {
        Some(row) => Err(PipelineError::DimensionMismatch {
            row,
            expected,
            found: rows[row].len(),
        }),
        None => Ok(()),
    }
}
