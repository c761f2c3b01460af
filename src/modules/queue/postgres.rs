use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use tracing::debug;

use super::{
    ClaimedJob, ExtractionJob, ExtractionStatus, JobQueue, JobState, LOST_CLAIM, LOST_FINAL_CLAIM,
};
use crate::core::error::{AppError, Result};

/// Job queue backed by the `extraction_jobs` table.
///
/// Claims use `FOR UPDATE SKIP LOCKED` so concurrent workers never block on
/// each other. The partial unique index on `(file_id) WHERE status =
/// 'extracting'` guarantees one claim per file; losing that race reads as
/// "nothing to claim".
pub struct PgJobQueue {
    pool: PgPool,
}

impl PgJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ClaimedRow {
    id: i64,
    file_id: i64,
    content_type: String,
    attempts: i32,
}

#[derive(Debug, FromRow)]
struct StateRow {
    id: i64,
    status: ExtractionStatus,
    attempts: i32,
    last_error: Option<String>,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, job: ExtractionJob) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO extraction_jobs (file_id, content_type)
             VALUES ($1, $2)
             RETURNING id",
        )
        .bind(job.file_id)
        .bind(&job.content_type)
        .fetch_one(&self.pool)
        .await?;

        debug!(job_id = id, file_id = job.file_id, "Extraction job enqueued");
        Ok(id)
    }

    async fn dequeue(&self) -> Result<Option<ClaimedJob>> {
        let result = sqlx::query_as::<_, ClaimedRow>(
            "UPDATE extraction_jobs
             SET status = 'extracting'::extraction_status,
                 attempts = attempts + 1,
                 updated_at = NOW()
             WHERE id = (
                 SELECT j.id FROM extraction_jobs j
                 WHERE j.status IN ('pending'::extraction_status, 'failed_transient'::extraction_status)
                   AND j.available_at <= NOW()
                   AND NOT EXISTS (
                       SELECT 1 FROM extraction_jobs x
                       WHERE x.file_id = j.file_id
                         AND x.status = 'extracting'::extraction_status
                   )
                 ORDER BY j.available_at ASC, j.id ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING id, file_id, content_type, attempts",
        )
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.map(|r| ClaimedJob {
                id: r.id,
                file_id: r.file_id,
                content_type: r.content_type,
                attempts: r.attempts,
            })),
            Err(e) => {
                let err = AppError::from(e);
                if err.is_unique_violation() {
                    debug!("Another worker holds the claim for this file");
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn ack(&self, job: &ClaimedJob) -> Result<()> {
        sqlx::query(
            "UPDATE extraction_jobs
             SET status = 'succeeded'::extraction_status, last_error = NULL, updated_at = NOW()
             WHERE id = $1 AND status = 'extracting'::extraction_status",
        )
        .bind(job.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn retry(&self, job: &ClaimedJob, delay: Duration, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE extraction_jobs
             SET status = 'failed_transient'::extraction_status,
                 available_at = NOW() + make_interval(secs => $2),
                 last_error = $3,
                 updated_at = NOW()
             WHERE id = $1 AND status = 'extracting'::extraction_status",
        )
        .bind(job.id)
        .bind(delay.as_secs_f64())
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fail(&self, job: &ClaimedJob, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE extraction_jobs
             SET status = 'failed_terminal'::extraction_status, last_error = $2, updated_at = NOW()
             WHERE id = $1 AND status = 'extracting'::extraction_status",
        )
        .bind(job.id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_for_file(&self, file_id: i64) -> Result<Option<JobState>> {
        let row = sqlx::query_as::<_, StateRow>(
            "SELECT id, status, attempts, last_error, updated_at
             FROM extraction_jobs
             WHERE file_id = $1
             ORDER BY id DESC
             LIMIT 1",
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| JobState {
            job_id: r.id,
            status: r.status,
            attempts: r.attempts,
            last_error: r.last_error,
            updated_at: r.updated_at,
        }))
    }

    async fn release_stale(&self, older_than: Duration, max_attempts: i32) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE extraction_jobs
             SET status = CASE WHEN attempts >= $2
                     THEN 'failed_terminal'::extraction_status
                     ELSE 'failed_transient'::extraction_status
                 END,
                 available_at = NOW(),
                 last_error = CASE WHEN attempts >= $2
                     THEN $3
                     ELSE $4
                 END,
                 updated_at = NOW()
             WHERE status = 'extracting'::extraction_status
               AND updated_at < NOW() - make_interval(secs => $1)",
        )
        .bind(older_than.as_secs_f64())
        .bind(max_attempts)
        .bind(LOST_FINAL_CLAIM)
        .bind(LOST_CLAIM)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
