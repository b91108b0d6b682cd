// crates/jobfilter/src/jobs/repo.rs

use crate::jobs::model::NewJob;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Write access to `jobs`, for seeding and tests. The dashboard itself
/// only reads through `PgStore`.
#[derive(Clone)]
pub struct JobsRepo {
    pool: PgPool,
}

impl JobsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ----------------------------
    // Inserts
    // ----------------------------

    pub async fn insert(&self, job: NewJob) -> anyhow::Result<Uuid> {
        let id = Uuid::now_v7();
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, queue_name, job_type, payload_json, status, scheduled_at,
                cron_key, finished_at,
                last_error_code, last_error_message, dlq_reason_code
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(id)
        .bind(job.queue_name)
        .bind(job.job_type)
        .bind(job.payload_json)
        .bind(job.status.as_str())
        .bind(job.scheduled_at)
        .bind(job.cron_key)
        .bind(job.finished_at)
        .bind(job.last_error_code)
        .bind(job.last_error_message)
        .bind(job.dlq_reason_code)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn insert_at(
        &self,
        queue_name: Option<&str>,
        job_type: &str,
        scheduled_at: DateTime<Utc>,
    ) -> anyhow::Result<Uuid> {
        self.insert(NewJob::queued(queue_name, job_type, scheduled_at))
            .await
    }

    // ----------------------------
    // Maintenance
    // ----------------------------

    pub async fn truncate(&self) -> anyhow::Result<()> {
        sqlx::query("TRUNCATE TABLE jobs")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count_all(&self) -> anyhow::Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}
