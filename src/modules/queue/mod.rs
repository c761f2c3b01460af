//! Durable extraction job queue
//!
//! The pipeline only talks to `JobQueue`; the broker behind it can vary.
//! `PgJobQueue` keeps jobs in the `extraction_jobs` table.

mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use std::time::Duration;
use utoipa::ToSchema;

use crate::core::error::Result;

pub use postgres::PgJobQueue;

/// Per-file extraction state. `Pending` also covers "no job row yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "extraction_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Pending,
    Extracting,
    Succeeded,
    FailedTransient,
    FailedTerminal,
}

impl std::fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionStatus::Pending => write!(f, "pending"),
            ExtractionStatus::Extracting => write!(f, "extracting"),
            ExtractionStatus::Succeeded => write!(f, "succeeded"),
            ExtractionStatus::FailedTransient => write!(f, "failed_transient"),
            ExtractionStatus::FailedTerminal => write!(f, "failed_terminal"),
        }
    }
}

/// `last_error` for a claim released by `release_stale`
pub const LOST_CLAIM: &str = "worker lost its claim";
pub const LOST_FINAL_CLAIM: &str = "worker lost its claim on the final attempt";

/// Job message. The content type travels with the job so the worker can
/// branch on it without re-reading the file record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionJob {
    pub file_id: i64,
    pub content_type: String,
}

/// A job a worker has claimed. `attempts` already counts this claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedJob {
    pub id: i64,
    pub file_id: i64,
    pub content_type: String,
    pub attempts: i32,
}

/// Snapshot of the newest job row for a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobState {
    pub job_id: i64,
    pub status: ExtractionStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Queue a job that is ready immediately. Returns the job id.
    async fn enqueue(&self, job: ExtractionJob) -> Result<i64>;

    /// Claim one ready job whose file has no extraction in flight.
    /// Moves it to `Extracting` and increments its attempt count.
    async fn dequeue(&self) -> Result<Option<ClaimedJob>>;

    /// Mark a claimed job `Succeeded`
    async fn ack(&self, job: &ClaimedJob) -> Result<()>;

    /// Mark a claimed job `FailedTransient`, ready again after `delay`
    async fn retry(&self, job: &ClaimedJob, delay: Duration, error: &str) -> Result<()>;

    /// Mark a claimed job `FailedTerminal`. It is never claimed again.
    async fn fail(&self, job: &ClaimedJob, error: &str) -> Result<()>;

    async fn latest_for_file(&self, file_id: i64) -> Result<Option<JobState>>;

    /// Release claims left behind by a crashed worker. Jobs stuck in
    /// `Extracting` longer than `older_than` become ready again, unless the
    /// lost claim was already attempt `max_attempts`: those become `FailedTerminal`.
    async fn release_stale(&self, older_than: Duration, max_attempts: i32) -> Result<u64>;
}
