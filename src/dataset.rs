use std::path::Path;

use anyhow::{bail, Context};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::features::{encode, FeatureVector};
use crate::profiles::CLUSTER_COUNT;

pub const SYNTHETIC_SEED: u64 = 42;
pub const SYNTHETIC_SAMPLES: usize = 1248;

const DISTRACTIONS: [&str; 3] = ["Low", "Medium", "High"];
const TIMES: [&str; 4] = ["Morning", "Afternoon", "Evening", "Night"];
const METHODS: [&str; 4] = ["Pomodoro", "Continuous", "Spaced", "Intensive"];

/// One row of the reference dataset the model is trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub student_id: String,
    pub study_hours: f64,
    pub quiz_score: f64,
    pub distraction_frequency: String,
    pub preferred_time: String,
    pub study_method: String,
}

impl ReferenceRecord {
    pub fn features(&self) -> FeatureVector {
        encode(
            self.study_hours,
            self.quiz_score,
            &self.distraction_frequency,
            &self.preferred_time,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSource {
    Loaded,
    Synthesized,
}

pub fn load(path: &Path) -> anyhow::Result<Vec<ReferenceRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open dataset {}", path.display()))?;
    let mut records = Vec::new();

    for (index, result) in reader.deserialize::<ReferenceRecord>().enumerate() {
        let record =
            result.with_context(|| format!("invalid dataset row {} in {}", index + 1, path.display()))?;
        if !record.study_hours.is_finite() || !record.quiz_score.is_finite() {
            bail!("non-numeric feature in dataset row {}", index + 1);
        }
        records.push(record);
    }

    if records.len() < CLUSTER_COUNT {
        bail!(
            "dataset {} has {} rows, need at least {CLUSTER_COUNT}",
            path.display(),
            records.len()
        );
    }

    Ok(records)
}

pub fn write(path: &Path, records: &[ReferenceRecord]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create dataset {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Deterministic stand-in for a real cohort export.
pub fn synthesize(seed: u64, samples: usize) -> Vec<ReferenceRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    (1..=samples)
        .map(|student_id| ReferenceRecord {
            student_id: student_id.to_string(),
            study_hours: rng.random_range(1.0..8.0),
            quiz_score: f64::from(rng.random_range(50u32..100)),
            distraction_frequency: pick(&mut rng, &DISTRACTIONS),
            preferred_time: pick(&mut rng, &TIMES),
            study_method: pick(&mut rng, &METHODS),
        })
        .collect()
}

fn pick<R: Rng + ?Sized>(rng: &mut R, values: &[&str]) -> String {
    values[rng.random_range(0..values.len())].to_string()
}

/// Reads the dataset at `path`, synthesizing (and saving) one when it is
/// missing or unusable.
pub fn load_or_synthesize(path: &Path) -> (Vec<ReferenceRecord>, DatasetSource) {
    match load(path) {
        Ok(records) => return (records, DatasetSource::Loaded),
        Err(err) => tracing::warn!(
            path = %path.display(),
            error = %err,
            "reference dataset unavailable, synthesizing one"
        ),
    }

    let records = synthesize(SYNTHETIC_SEED, SYNTHETIC_SAMPLES);
    if let Err(err) = write(path, &records) {
        tracing::warn!(path = %path.display(), error = %err, "could not save synthesized dataset");
    }
    (records, DatasetSource::Synthesized)
}

/// Validates `source` as a reference dataset and copies it to `dest`.
pub fn import(source: &Path, dest: &Path) -> anyhow::Result<usize> {
    let records = load(source)?;
    write(dest, &records)?;
    tracing::info!(
        source = %source.display(),
        dest = %dest.display(),
        rows = records.len(),
        "imported reference dataset"
    );
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesis_is_deterministic_and_in_range() {
        let first = synthesize(SYNTHETIC_SEED, 200);
        let second = synthesize(SYNTHETIC_SEED, 200);
        assert_eq!(first, second);
        assert_eq!(first.len(), 200);
        assert_eq!(first[0].student_id, "1");
        assert_eq!(first[199].student_id, "200");

        for record in &first {
            assert!((1.0..8.0).contains(&record.study_hours));
            assert!((50.0..100.0).contains(&record.quiz_score));
            assert!(DISTRACTIONS.contains(&record.distraction_frequency.as_str()));
            assert!(TIMES.contains(&record.preferred_time.as_str()));
            assert!(METHODS.contains(&record.study_method.as_str()));
        }
    }

    #[test]
    fn different_seeds_differ() {
        assert_ne!(synthesize(1, 50), synthesize(2, 50));
    }

    #[test]
    fn written_dataset_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("students.csv");
        let records = synthesize(7, 25);
        write(&path, &records).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.len(), 25);
        assert_eq!(loaded[3].preferred_time, records[3].preferred_time);
    }

    #[test]
    fn missing_dataset_is_synthesized_and_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample_student_data.csv");

        let (records, source) = load_or_synthesize(&path);
        assert_eq!(source, DatasetSource::Synthesized);
        assert_eq!(records.len(), SYNTHETIC_SAMPLES);
        assert!(path.exists());

        let (reloaded, source) = load_or_synthesize(&path);
        assert_eq!(source, DatasetSource::Loaded);
        assert_eq!(reloaded.len(), SYNTHETIC_SAMPLES);
    }

    #[test]
    fn malformed_dataset_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.csv");
        std::fs::write(&path, "student_id,study_hours\n1,abc\n").unwrap();

        assert!(load(&path).is_err());
        let (_, source) = load_or_synthesize(&path);
        assert_eq!(source, DatasetSource::Synthesized);
    }

    #[test]
    fn import_rejects_header_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("upload.csv");
        std::fs::write(
            &source,
            "student_id,study_hours,quiz_score,distraction_frequency,preferred_time,study_method\n",
        )
        .unwrap();
        assert!(import(&source, &dir.path().join("dest.csv")).is_err());
    }

    #[test]
    fn dataset_smaller_than_cluster_count_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.csv");
        write(&path, &synthesize(3, CLUSTER_COUNT - 2)).unwrap();

        assert!(load(&path).is_err());
        assert!(import(&path, &dir.path().join("dest.csv")).is_err());
        assert!(!dir.path().join("dest.csv").exists());

        let (records, source) = load_or_synthesize(&path);
        assert_eq!(source, DatasetSource::Synthesized);
        assert_eq!(records.len(), SYNTHETIC_SAMPLES);
    }

    #[test]
    fn import_copies_valid_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("upload.csv");
        std::fs::write(
            &source,
            "student_id,study_hours,quiz_score,distraction_frequency,preferred_time,study_method\n\
             s1,2.5,77,Low,Night,Spaced\n\
             s2,4.0,91,High,Morning,Pomodoro\n\
             s3,1.0,64,Medium,Evening,Continuous\n\
             s4,6.5,88,Low,Afternoon,Intensive\n",
        )
        .unwrap();
        let dest = dir.path().join("data").join("sample_student_data.csv");

        assert_eq!(import(&source, &dest).unwrap(), 4);
        let loaded = load(&dest).unwrap();
        assert_eq!(loaded[1].features(), [4.0, 91.0, 2.0, 0.0]);
    }
}
