use anyhow::Context;
use chrono::{Duration, NaiveDate};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::models::{NewStudyLog, Student, StudyLog};
use crate::store::StudyStore;

const LOG_COLUMNS: &str = "log_id, student_id, log_date, study_hours, subject, time_of_day, \
     method, distraction_level, quiz_score";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed store under the `study_habits` schema.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn student_from_row(row: &PgRow) -> Student {
    let cluster_id: Option<i32> = row.get("cluster_id");
    Student {
        student_id: row.get("student_id"),
        name: row.get("name"),
        cluster_id: cluster_id.and_then(|id| usize::try_from(id).ok()),
        created_at: row.get("created_at"),
    }
}

fn log_from_row(row: &PgRow) -> StudyLog {
    StudyLog {
        log_id: row.get("log_id"),
        student_id: row.get("student_id"),
        date: row.get("log_date"),
        study_hours: row.get("study_hours"),
        subject: row.get("subject"),
        time_of_day: row.get("time_of_day"),
        method: row.get("method"),
        distraction_level: row.get("distraction_level"),
        quiz_score: row.get("quiz_score"),
    }
}

impl StudyStore for PgStore {
    async fn register_student(&self, student_id: &str, name: &str) -> anyhow::Result<Student> {
        sqlx::query(
            r#"
            INSERT INTO study_habits.students (student_id, name)
            VALUES ($1, $2)
            ON CONFLICT (student_id) DO NOTHING
            "#,
        )
        .bind(student_id)
        .bind(name)
        .execute(&self.pool)
        .await?;

        self.student(student_id)
            .await?
            .with_context(|| format!("student {student_id} missing after insert"))
    }

    async fn student(&self, student_id: &str) -> anyhow::Result<Option<Student>> {
        let row = sqlx::query(
            "SELECT student_id, name, cluster_id, created_at \
             FROM study_habits.students WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(student_from_row))
    }

    async fn students(&self) -> anyhow::Result<Vec<Student>> {
        let rows = sqlx::query(
            "SELECT student_id, name, cluster_id, created_at \
             FROM study_habits.students ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(student_from_row).collect())
    }

    async fn append_log(&self, log: NewStudyLog) -> anyhow::Result<i64> {
        let log_id: i64 = sqlx::query(
            r#"
            INSERT INTO study_habits.study_logs
            (student_id, log_date, study_hours, subject, time_of_day, method,
             distraction_level, quiz_score)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING log_id
            "#,
        )
        .bind(&log.student_id)
        .bind(log.date)
        .bind(log.study_hours)
        .bind(&log.subject)
        .bind(&log.time_of_day)
        .bind(&log.method)
        .bind(&log.distraction_level)
        .bind(log.quiz_score)
        .fetch_one(&self.pool)
        .await?
        .get("log_id");

        Ok(log_id)
    }

    async fn logs_for_student(&self, student_id: &str) -> anyhow::Result<Vec<StudyLog>> {
        let query = format!(
            "SELECT {LOG_COLUMNS} FROM study_habits.study_logs \
             WHERE student_id = $1 ORDER BY log_id"
        );
        let rows = sqlx::query(&query)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(log_from_row).collect())
    }

    async fn all_logs(&self) -> anyhow::Result<Vec<StudyLog>> {
        let query = format!("SELECT {LOG_COLUMNS} FROM study_habits.study_logs ORDER BY log_id");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(log_from_row).collect())
    }

    async fn set_cluster(&self, student_id: &str, cluster_id: usize) -> anyhow::Result<()> {
        let cluster = i32::try_from(cluster_id).context("cluster id out of range")?;
        let result = sqlx::query(
            "UPDATE study_habits.students SET cluster_id = $2 WHERE student_id = $1",
        )
        .bind(student_id)
        .bind(cluster)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("unknown student {student_id}");
        }
        Ok(())
    }
}

/// Demo students with a week of sessions each, dated relative to `today`.
pub fn seed_data(today: NaiveDate) -> Vec<(&'static str, &'static str, Vec<NewStudyLog>)> {
    let profiles = [
        (
            "avery.lee@example.com",
            "Avery Lee",
            [(3.0, Some(80)), (4.0, Some(85)), (3.5, Some(90)), (4.5, Some(88))],
            "Low",
            "Morning",
            "Pomodoro",
        ),
        (
            "jules.moreno@example.com",
            "Jules Moreno",
            [(1.5, Some(72)), (2.0, None), (1.0, Some(70)), (1.5, Some(76))],
            "Medium",
            "Afternoon",
            "Spaced",
        ),
        (
            "kiara.patel@example.com",
            "Kiara Patel",
            [(2.0, Some(65)), (1.5, Some(60)), (2.5, None), (2.0, Some(70))],
            "High",
            "Evening",
            "Continuous",
        ),
    ];

    profiles
        .into_iter()
        .map(|(email, name, sessions, distraction, time, method)| {
            let logs = sessions
                .iter()
                .enumerate()
                .map(|(offset, (hours, score))| NewStudyLog {
                    student_id: email.to_string(),
                    date: today - Duration::days((sessions.len() - offset) as i64),
                    study_hours: *hours,
                    subject: "General".to_string(),
                    time_of_day: time.to_string(),
                    method: method.to_string(),
                    distraction_level: distraction.to_string(),
                    quiz_score: *score,
                })
                .collect();
            (email, name, logs)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_sessions_are_valid_and_in_the_past() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let seed = seed_data(today);
        assert_eq!(seed.len(), 3);

        for (email, _, logs) in &seed {
            assert_eq!(logs.len(), 4);
            for log in logs {
                assert!(log.validate().is_ok());
                assert_eq!(&log.student_id, email);
                assert!(log.date < today);
            }
        }
    }
}
