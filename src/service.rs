use chrono::NaiveDate;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::features;
use crate::model::{ModelRegistry, ModelSource};
use crate::models::{Analytics, NewStudyLog, Student, StudentStats, MIN_LOGS_FOR_CLUSTER};
use crate::recommend::{self, Recommendation};
use crate::stats;
use crate::store::StudyStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogReceipt {
    pub log_id: i64,
    pub cluster_id: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_source: Option<ModelSource>,
}

/// Ties the store, the trained model and the recommendation generator together.
pub struct Recommender<S> {
    store: S,
    registry: ModelRegistry,
    rng: ChaCha8Rng,
}

impl<S: StudyStore> Recommender<S> {
    /// Schedules are drawn from a freshly seeded RNG, so they vary between calls.
    pub fn new(store: S, registry: ModelRegistry) -> Self {
        Self::with_seed(store, registry, rand::random())
    }

    pub fn with_seed(store: S, registry: ModelRegistry, seed: u64) -> Self {
        Self {
            store,
            registry,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn register_student(&self, student_id: &str, name: &str) -> anyhow::Result<Student> {
        self.store.register_student(student_id, name).await
    }

    /// Appends the session and, once enough history exists, recomputes the
    /// student's cluster from all of their logs.
    pub async fn record_log(&mut self, log: NewStudyLog) -> anyhow::Result<LogReceipt> {
        log.validate()?;
        let student_id = log.student_id.clone();
        if self.store.student(&student_id).await?.is_none() {
            self.store.register_student(&student_id, &student_id).await?;
        }

        let log_id = self.store.append_log(log).await?;
        let logs = self.store.logs_for_student(&student_id).await?;

        let summary = match features::summarize(&logs) {
            Some(summary) if summary.log_count >= MIN_LOGS_FOR_CLUSTER => summary,
            _ => {
                tracing::debug!(student = %student_id, logs = logs.len(), "not enough logs to cluster");
                return Ok(LogReceipt {
                    log_id,
                    cluster_id: None,
                    model_source: None,
                });
            }
        };

        let prediction = self.registry.predict(&summary)?;
        self.store
            .set_cluster(&student_id, prediction.cluster_id)
            .await?;
        tracing::info!(
            student = %student_id,
            cluster = prediction.cluster_id,
            source = ?prediction.source,
            "cluster assigned"
        );

        Ok(LogReceipt {
            log_id,
            cluster_id: Some(prediction.cluster_id),
            model_source: Some(prediction.source),
        })
    }

    pub async fn get_recommendation(&mut self, student_id: &str) -> anyhow::Result<Recommendation> {
        let cluster_id = match self.store.student(student_id).await? {
            Some(Student {
                cluster_id: Some(cluster_id),
                ..
            }) => cluster_id,
            _ => return Ok(Recommendation::pending()),
        };

        let logs = self.store.logs_for_student(student_id).await?;
        let details = recommend::build(cluster_id, &logs, &mut self.rng);
        Ok(Recommendation::ready(details))
    }

    pub async fn student_stats(&self, student_id: &str, today: NaiveDate) -> anyhow::Result<StudentStats> {
        let logs = self.store.logs_for_student(student_id).await?;
        Ok(stats::student_stats(&logs, today))
    }

    pub async fn analytics(&self) -> anyhow::Result<Analytics> {
        let students = self.store.students().await?;
        let logs = self.store.all_logs().await?;
        Ok(stats::analytics(&students, &logs))
    }
}
