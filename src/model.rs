use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::{self, DatasetSource, ReferenceRecord};
use crate::error::PipelineError;
use crate::features::{FeatureVector, HistorySummary, FEATURE_COUNT, SCORE_COLUMN};
use crate::kmeans::{KMeans, KMeansConfig};
use crate::profiles::CLUSTER_COUNT;
use crate::scaler::StandardScaler;

pub const SCALER_FILE: &str = "scaler.json";
pub const KMEANS_FILE: &str = "kmeans.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterArtifact {
    pub kmeans: KMeans,
    pub seed: u64,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    pub scaler: StandardScaler,
    pub clusters: ClusterArtifact,
}

impl TrainedModel {
    pub fn train(records: &[ReferenceRecord], config: &KMeansConfig) -> Result<Self, PipelineError> {
        let features: Vec<Vec<f64>> = records
            .iter()
            .map(|record| record.features().to_vec())
            .collect();
        let scaler = StandardScaler::fit(&features)?;
        let scaled = scaler.transform_all(&features);
        let kmeans = KMeans::fit(&scaled, config)?;

        Ok(Self {
            scaler,
            clusters: ClusterArtifact {
                kmeans,
                seed: config.seed,
                trained_at: Utc::now(),
            },
        })
    }

    pub fn samples(&self) -> usize {
        self.scaler.samples
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.scaler.dimension() != FEATURE_COUNT || self.scaler.scale.len() != FEATURE_COUNT {
            return Err(PipelineError::InvalidModel(format!(
                "scaler has {} columns, expected {FEATURE_COUNT}",
                self.scaler.dimension()
            )));
        }
        if self.scaler.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(PipelineError::InvalidModel("scaler has a degenerate scale".into()));
        }

        let kmeans = &self.clusters.kmeans;
        if kmeans.dimension() != FEATURE_COUNT {
            return Err(PipelineError::InvalidModel(format!(
                "centroids have {} columns, expected {FEATURE_COUNT}",
                kmeans.dimension()
            )));
        }
        if kmeans.k() != CLUSTER_COUNT {
            return Err(PipelineError::InvalidModel(format!(
                "model has {} centroids, expected {CLUSTER_COUNT}",
                kmeans.k()
            )));
        }
        let malformed = kmeans
            .centroids
            .iter()
            .any(|c| c.len() != FEATURE_COUNT || c.iter().any(|v| !v.is_finite()));
        if malformed {
            return Err(PipelineError::InvalidModel("centroid shape mismatch".into()));
        }
        Ok(())
    }

    pub fn predict(&self, features: &FeatureVector) -> usize {
        let scaled = self.scaler.transform(features);
        self.clusters.kmeans.predict(&scaled)
    }

    /// A missing score is imputed with the training mean, which scales to 0.
    pub fn predict_summary(&self, summary: &HistorySummary) -> usize {
        self.predict(&summary.features(self.scaler.mean[SCORE_COLUMN]))
    }
}

/// Which path produced the model that served a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Cached,
    Loaded,
    Retrained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    pub cluster_id: usize,
    pub source: ModelSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrainOutcome {
    pub clusters: usize,
    pub samples: usize,
    pub dataset: DatasetSource,
}

#[derive(Debug)]
pub struct ModelRegistry {
    model_dir: PathBuf,
    dataset_path: PathBuf,
    config: KMeansConfig,
    current: Option<TrainedModel>,
}

impl ModelRegistry {
    pub fn new(model_dir: impl Into<PathBuf>, dataset_path: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            dataset_path: dataset_path.into(),
            config: KMeansConfig::default(),
            current: None,
        }
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    pub fn current(&self) -> Option<&TrainedModel> {
        self.current.as_ref()
    }

    pub fn ensure_model(&mut self) -> anyhow::Result<ModelSource> {
        if self.current.is_some() {
            return Ok(ModelSource::Cached);
        }

        match self.load() {
            Ok(Some(model)) => {
                tracing::debug!(dir = %self.model_dir.display(), "loaded persisted model");
                self.current = Some(model);
                return Ok(ModelSource::Loaded);
            }
            Ok(None) => tracing::info!("no persisted model, training from reference data"),
            Err(err) => tracing::warn!(error = %err, "persisted model unusable, retraining"),
        }

        let model = self.train_with_fallback()?;
        if let Err(err) = self.save(&model) {
            tracing::warn!(error = %err, "could not persist retrained model");
        }
        self.current = Some(model);
        Ok(ModelSource::Retrained)
    }

    /// A loaded dataset that cannot be trained on is replaced by the synthetic one.
    fn train_with_fallback(&self) -> anyhow::Result<TrainedModel> {
        let (records, source) = dataset::load_or_synthesize(&self.dataset_path);
        match TrainedModel::train(&records, &self.config) {
            Ok(model) => Ok(model),
            Err(err) if source == DatasetSource::Loaded => {
                tracing::warn!(error = %err, "reference dataset unusable for training, synthesizing one");
                let records = dataset::synthesize(dataset::SYNTHETIC_SEED, dataset::SYNTHETIC_SAMPLES);
                Ok(TrainedModel::train(&records, &self.config)?)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn predict(&mut self, summary: &HistorySummary) -> anyhow::Result<Prediction> {
        let source = self.ensure_model()?;
        let model = self
            .current()
            .context("model missing after initialization")?;

        Ok(Prediction {
            cluster_id: model.predict_summary(summary),
            source,
        })
    }

    /// Refits on `dataset` (imported into place first) or on the stored
    /// reference dataset, replacing the persisted model.
    pub fn retrain(&mut self, dataset: Option<&Path>) -> anyhow::Result<RetrainOutcome> {
        if let Some(source) = dataset {
            dataset::import(source, &self.dataset_path)?;
        }

        let (records, source) = dataset::load_or_synthesize(&self.dataset_path);
        let model = TrainedModel::train(&records, &self.config)?;
        self.save(&model)?;

        let outcome = RetrainOutcome {
            clusters: model.clusters.kmeans.k(),
            samples: model.samples(),
            dataset: source,
        };
        tracing::info!(
            samples = outcome.samples,
            inertia = model.clusters.kmeans.inertia,
            "model retrained"
        );
        self.current = Some(model);
        Ok(outcome)
    }

    pub fn save(&self, model: &TrainedModel) -> anyhow::Result<()> {
        fs::create_dir_all(&self.model_dir)
            .with_context(|| format!("failed to create {}", self.model_dir.display()))?;
        write_json(&self.model_dir.join(SCALER_FILE), &model.scaler)?;
        write_json(&self.model_dir.join(KMEANS_FILE), &model.clusters)?;
        Ok(())
    }

    /// `Ok(None)` when no artifacts exist; an error when they exist but are unusable.
    pub fn load(&self) -> anyhow::Result<Option<TrainedModel>> {
        let scaler_path = self.model_dir.join(SCALER_FILE);
        let kmeans_path = self.model_dir.join(KMEANS_FILE);
        if !scaler_path.exists() || !kmeans_path.exists() {
            return Ok(None);
        }

        let model = TrainedModel {
            scaler: read_json(&scaler_path)?,
            clusters: read_json(&kmeans_path)?,
        };
        model.validate()?;
        Ok(Some(model))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> anyhow::Result<T> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&body).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synthesize;

    fn registry(dir: &Path) -> ModelRegistry {
        ModelRegistry::new(dir.join("models"), dir.join("data").join("students.csv"))
    }

    fn summary(hours: f64, score: Option<f64>, distraction: &str, time: &str) -> HistorySummary {
        HistorySummary {
            log_count: 3,
            avg_hours: hours,
            avg_score: score,
            distraction_level: distraction.to_string(),
            time_of_day: time.to_string(),
        }
    }

    #[test]
    fn training_is_deterministic() {
        let records = synthesize(42, 300);
        let config = KMeansConfig::default();
        let first = TrainedModel::train(&records, &config).unwrap();
        let second = TrainedModel::train(&records, &config).unwrap();
        assert_eq!(first.scaler, second.scaler);
        assert_eq!(first.clusters.kmeans, second.clusters.kmeans);
        assert!(first.validate().is_ok());
    }

    #[test]
    fn predictions_stay_in_cluster_range() {
        let model = TrainedModel::train(&synthesize(42, 300), &KMeansConfig::default()).unwrap();
        let cases = [
            summary(3.5, Some(85.0), "Low", "Morning"),
            summary(0.0, None, "Unknown", "Whenever"),
            summary(12.0, Some(100.0), "High", "Night"),
        ];
        for case in &cases {
            assert!(model.predict_summary(case) < CLUSTER_COUNT);
        }
    }

    #[test]
    fn missing_model_is_retrained_then_cached() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(dir.path());
        let case = summary(3.5, Some(85.0), "Low", "Morning");

        let first = registry.predict(&case).unwrap();
        assert_eq!(first.source, ModelSource::Retrained);
        assert!(first.cluster_id < CLUSTER_COUNT);
        assert!(dir.path().join("models").join(SCALER_FILE).exists());
        assert!(registry.dataset_path().exists());

        let second = registry.predict(&case).unwrap();
        assert_eq!(second.source, ModelSource::Cached);
        assert_eq!(second.cluster_id, first.cluster_id);
    }

    #[test]
    fn persisted_model_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = registry(dir.path());
        let outcome = trainer.retrain(None).unwrap();
        assert_eq!(outcome.clusters, 4);
        assert_eq!(outcome.samples, dataset::SYNTHETIC_SAMPLES);
        assert_eq!(outcome.dataset, DatasetSource::Synthesized);

        let mut fresh = registry(dir.path());
        assert_eq!(fresh.ensure_model().unwrap(), ModelSource::Loaded);
        assert_eq!(
            fresh.current().unwrap().clusters.kmeans,
            trainer.current().unwrap().clusters.kmeans
        );
    }

    #[test]
    fn corrupt_artifact_triggers_retraining() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = registry(dir.path());
        trainer.retrain(None).unwrap();
        fs::write(dir.path().join("models").join(KMEANS_FILE), "{not json").unwrap();

        let mut fresh = registry(dir.path());
        assert!(fresh.load().is_err());
        assert_eq!(fresh.ensure_model().unwrap(), ModelSource::Retrained);
    }

    #[test]
    fn mis_shaped_model_is_rejected() {
        let mut model = TrainedModel::train(&synthesize(42, 100), &KMeansConfig::default()).unwrap();
        model.clusters.kmeans.centroids.pop();
        assert!(matches!(model.validate(), Err(PipelineError::InvalidModel(_))));

        let mut model = TrainedModel::train(&synthesize(42, 100), &KMeansConfig::default()).unwrap();
        model.scaler.mean.push(0.0);
        assert!(model.validate().is_err());
    }

    #[test]
    fn undersized_reference_dataset_is_replaced_by_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(dir.path());
        dataset::write(registry.dataset_path(), &synthesize(5, 2)).unwrap();

        let prediction = registry
            .predict(&summary(3.0, Some(80.0), "Low", "Morning"))
            .unwrap();
        assert_eq!(prediction.source, ModelSource::Retrained);
        assert!(prediction.cluster_id < CLUSTER_COUNT);
        assert_eq!(registry.current().unwrap().samples(), dataset::SYNTHETIC_SAMPLES);

        let upload = dir.path().join("tiny.csv");
        dataset::write(&upload, &synthesize(6, 3)).unwrap();
        assert!(registry.retrain(Some(&upload)).is_err());
        assert_eq!(registry.current().unwrap().samples(), dataset::SYNTHETIC_SAMPLES);
    }

    #[test]
    fn retrain_with_uploaded_dataset_replaces_reference_data() {
        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("upload.csv");
        dataset::write(&upload, &synthesize(9, 60)).unwrap();

        let mut registry = registry(dir.path());
        let outcome = registry.retrain(Some(&upload)).unwrap();
        assert_eq!(outcome.samples, 60);
        assert_eq!(outcome.dataset, DatasetSource::Loaded);
        assert_eq!(dataset::load(registry.dataset_path()).unwrap().len(), 60);
    }
}
