use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::core::config::ExtractionConfig;
use crate::features::extraction::error::ExtractionError;
use crate::features::extraction::retry::RetryPolicy;
use crate::features::extraction::services::{ExtractionService, ProcessOutcome};
use crate::modules::queue::{ClaimedJob, JobQueue};

/// Slack added on top of the per-job timeouts before a claim counts as abandoned
const STALE_CLAIM_GRACE: Duration = Duration::from_secs(60);

/// Polls the job queue and runs extraction attempts concurrently.
///
/// Cloning is cheap; spawned tasks each hold their own clone.
#[derive(Clone)]
pub struct ExtractionWorker {
    queue: Arc<dyn JobQueue>,
    service: Arc<ExtractionService>,
    policy: RetryPolicy,
    max_concurrent: usize,
    poll_interval: Duration,
    stale_after: Duration,
}

impl ExtractionWorker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        service: Arc<ExtractionService>,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            queue,
            service,
            policy: RetryPolicy::from_config(config),
            max_concurrent: config.max_concurrent.max(1),
            poll_interval: config.poll_interval,
            stale_after: config.fetch_timeout
                + config.convert_timeout
                + config.parse_timeout
                + STALE_CLAIM_GRACE,
        }
    }

    /// Main loop. Returns once `shutdown` flips to true or its sender is dropped,
    /// after the attempts already in flight have finished.
    ///
    /// Keeps up to `max_concurrent` attempts running and claims a new job as
    /// soon as a slot frees up, so one slow conversion never holds back others.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            max_concurrent = self.max_concurrent,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Extraction worker started"
        );

        match self
            .queue
            .release_stale(self.stale_after, self.policy.max_attempts)
            .await
        {
            Ok(0) => {}
            Ok(released) => warn!(released, "Released abandoned extraction claims"),
            Err(e) => error!(error = ?e, "Failed to release abandoned claims"),
        }

        let mut in_flight = JoinSet::new();

        loop {
            if *shutdown.borrow() {
                break;
            }

            while let Some(result) = in_flight.try_join_next() {
                log_join(result);
            }

            if self.fill(&mut in_flight).await > 0 {
                continue;
            }

            // Full or idle: wait for a free slot, the next poll or shutdown
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                Some(result) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_join(result);
                }
                _ = sleep(self.poll_interval) => {}
            }
        }

        while let Some(result) = in_flight.join_next().await {
            log_join(result);
        }

        info!("Extraction worker stopped");
    }

    /// Claim up to `max_concurrent` jobs and wait for all of them to finish.
    /// Returns how many jobs were claimed.
    pub async fn run_once(&self) -> usize {
        let mut tasks = JoinSet::new();
        let claimed = self.fill(&mut tasks).await;

        while let Some(result) = tasks.join_next().await {
            log_join(result);
        }

        claimed
    }

    /// Claim jobs into `tasks` until it holds `max_concurrent` or the queue is empty
    async fn fill(&self, tasks: &mut JoinSet<()>) -> usize {
        let mut claimed = 0;

        while tasks.len() < self.max_concurrent {
            match self.queue.dequeue().await {
                Ok(Some(job)) => {
                    let worker = self.clone();
                    tasks.spawn(async move { worker.handle(job).await });
                    claimed += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    error!(error = ?e, "Failed to claim extraction job");
                    break;
                }
            }
        }

        if claimed > 0 {
            debug!(claimed, in_flight = tasks.len(), "Claimed extraction jobs");
        }
        claimed
    }

    async fn handle(&self, job: ClaimedJob) {
        let outcome = self.service.process(&job).await;

        let recorded = match outcome {
            Ok(ProcessOutcome::Stored(_)) | Ok(ProcessOutcome::FileGone) => {
                self.queue.ack(&job).await
            }
            Err(ExtractionError::Transient(reason)) if self.policy.can_retry(job.attempts) => {
                let delay = self.policy.delay_for(job.attempts);
                warn!(
                    job_id = job.id,
                    file_id = job.file_id,
                    attempt = job.attempts,
                    retry_in_secs = delay.as_secs(),
                    reason = %reason,
                    "Extraction failed, will retry"
                );
                self.queue.retry(&job, delay, &reason).await
            }
            Err(err) => {
                error!(
                    job_id = job.id,
                    file_id = job.file_id,
                    attempt = job.attempts,
                    error = %err,
                    "Extraction failed permanently"
                );
                self.queue.fail(&job, &err.to_string()).await
            }
        };

        if let Err(e) = recorded {
            error!(job_id = job.id, error = ?e, "Failed to record extraction outcome");
        }
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!(error = ?e, "Extraction task panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::core::config::BackoffKind;
    use crate::features::extraction::extractors::pdf::tests::build_pdf;
    use crate::features::extraction::extractors::DocConverter;
    use crate::features::files::models::{CreateFile, Visibility};
    use crate::features::files::repositories::FileRepository;
    use crate::modules::queue::{ExtractionJob, ExtractionStatus};
    use crate::shared::constants::{CONTENT_TYPE_DOC, CONTENT_TYPE_PDF};
    use crate::shared::test_helpers::{
        InMemoryBlobStore, InMemoryFileRepository, InMemoryJobQueue,
    };

    struct NoConverter;

    #[async_trait]
    impl DocConverter for NoConverter {
        async fn to_docx(&self, _doc_bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
            Err(ExtractionError::Transient("no converter".to_string()))
        }
    }

    struct Harness {
        queue: Arc<InMemoryJobQueue>,
        files: Arc<InMemoryFileRepository>,
        blobs: Arc<InMemoryBlobStore>,
        worker: ExtractionWorker,
    }

    fn harness(max_attempts: i32) -> Harness {
        let queue = Arc::new(InMemoryJobQueue::new());
        let files = Arc::new(InMemoryFileRepository::with_jobs(queue.clone()));
        let blobs = Arc::new(InMemoryBlobStore::new());
        let service = Arc::new(ExtractionService::new(
            files.clone(),
            blobs.clone(),
            Arc::new(NoConverter),
            Duration::from_secs(5),
            Duration::from_secs(5),
        ));
        let config = ExtractionConfig {
            max_attempts,
            max_concurrent: 4,
            poll_interval: Duration::from_millis(10),
            backoff: BackoffKind::Fixed,
            ..ExtractionConfig::default()
        };
        let worker = ExtractionWorker::new(queue.clone(), service, &config);
        Harness {
            queue,
            files,
            blobs,
            worker,
        }
    }

    async fn upload_pdf(h: &Harness, bytes: Vec<u8>) -> i64 {
        let key = format!("pdf-{}", h.files.file_count() + 1);
        let file = h
            .files
            .create(CreateFile {
                owner_id: 1,
                department: "eng".to_string(),
                filename: "report.pdf".to_string(),
                content_type: CONTENT_TYPE_PDF.to_string(),
                size_bytes: bytes.len() as i64,
                visibility: Visibility::Private,
                storage_key: key.clone(),
            })
            .await
            .unwrap();
        h.blobs.insert(&key, bytes);
        h.queue
            .enqueue(ExtractionJob {
                file_id: file.id,
                content_type: CONTENT_TYPE_PDF.to_string(),
            })
            .await
            .unwrap();
        file.id
    }

    fn latest_status(h: &Harness, file_id: i64) -> ExtractionStatus {
        h.queue.jobs_for(file_id).last().unwrap().status
    }

    #[tokio::test]
    async fn test_successful_job_is_acked() {
        let h = harness(3);
        let file_id = upload_pdf(&h, build_pdf(2, Vec::new())).await;

        assert_eq!(h.worker.run_once().await, 1);
        assert_eq!(latest_status(&h, file_id), ExtractionStatus::Succeeded);
        assert_eq!(h.files.metadata_count(file_id), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_then_success() {
        let h = harness(3);
        let file_id = upload_pdf(&h, build_pdf(1, Vec::new())).await;
        h.blobs.fail_next_gets(1);

        assert_eq!(h.worker.run_once().await, 1);
        let state = h.queue.jobs_for(file_id).pop().unwrap();
        assert_eq!(state.status, ExtractionStatus::FailedTransient);
        assert_eq!(state.attempts, 1);
        assert!(state.last_error.is_some());

        // Not ready until the retry delay passes
        assert_eq!(h.worker.run_once().await, 0);

        h.queue.expire_delays();
        assert_eq!(h.worker.run_once().await, 1);
        let state = h.queue.jobs_for(file_id).pop().unwrap();
        assert_eq!(state.status, ExtractionStatus::Succeeded);
        assert_eq!(state.attempts, 2);
        assert_eq!(h.files.metadata_count(file_id), 1);
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_is_terminal() {
        let h = harness(3);
        let file_id = upload_pdf(&h, build_pdf(1, Vec::new())).await;
        h.blobs.fail_next_gets(100);

        for _ in 0..3 {
            h.queue.expire_delays();
            assert_eq!(h.worker.run_once().await, 1);
        }

        let state = h.queue.jobs_for(file_id).pop().unwrap();
        assert_eq!(state.status, ExtractionStatus::FailedTerminal);
        assert_eq!(state.attempts, 3);

        h.queue.expire_delays();
        assert_eq!(h.worker.run_once().await, 0);
        assert_eq!(h.files.metadata_count(file_id), 0);
    }

    #[tokio::test]
    async fn test_corrupt_document_fails_without_retry() {
        let h = harness(5);
        let file_id = upload_pdf(&h, b"not a pdf at all".to_vec()).await;

        assert_eq!(h.worker.run_once().await, 1);
        let state = h.queue.jobs_for(file_id).pop().unwrap();
        assert_eq!(state.status, ExtractionStatus::FailedTerminal);
        assert_eq!(state.attempts, 1);
    }

    #[tokio::test]
    async fn test_batch_claims_distinct_files() {
        let h = harness(3);
        let a = upload_pdf(&h, build_pdf(1, Vec::new())).await;
        let b = upload_pdf(&h, build_pdf(3, Vec::new())).await;

        assert_eq!(h.worker.run_once().await, 2);
        assert_eq!(latest_status(&h, a), ExtractionStatus::Succeeded);
        assert_eq!(latest_status(&h, b), ExtractionStatus::Succeeded);
    }

    /// Never finishes, like a LibreOffice process stuck until its timeout
    struct HangingConverter;

    #[async_trait]
    impl DocConverter for HangingConverter {
        async fn to_docx(&self, _doc_bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_slow_job_does_not_hold_back_later_jobs() {
        let queue = Arc::new(InMemoryJobQueue::new());
        let files = Arc::new(InMemoryFileRepository::with_jobs(queue.clone()));
        let blobs = Arc::new(InMemoryBlobStore::new());
        let service = Arc::new(ExtractionService::new(
            files.clone(),
            blobs.clone(),
            Arc::new(HangingConverter),
            Duration::from_secs(5),
            Duration::from_secs(5),
        ));
        let config = ExtractionConfig {
            max_concurrent: 2,
            poll_interval: Duration::from_millis(10),
            ..ExtractionConfig::default()
        };
        let h = Harness {
            worker: ExtractionWorker::new(queue.clone(), service, &config),
            queue,
            files,
            blobs,
        };

        let doc = h
            .files
            .create(CreateFile {
                owner_id: 1,
                department: "eng".to_string(),
                filename: "legacy.doc".to_string(),
                content_type: CONTENT_TYPE_DOC.to_string(),
                size_bytes: 4,
                visibility: Visibility::Private,
                storage_key: "legacy-doc".to_string(),
            })
            .await
            .unwrap();
        h.blobs.insert("legacy-doc", b"\xD0\xCF\x11\xE0".to_vec());
        h.queue
            .enqueue(ExtractionJob {
                file_id: doc.id,
                content_type: CONTENT_TYPE_DOC.to_string(),
            })
            .await
            .unwrap();

        let (_tx, rx) = watch::channel(false);
        let handle = tokio::spawn(h.worker.clone().run(rx));

        tokio::time::timeout(Duration::from_secs(5), async {
            while latest_status(&h, doc.id) != ExtractionStatus::Extracting {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        // Queued after the conversion is already stuck
        let pdf_id = upload_pdf(&h, build_pdf(1, Vec::new())).await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while latest_status(&h, pdf_id) != ExtractionStatus::Succeeded {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(latest_status(&h, doc.id), ExtractionStatus::Extracting);
        handle.abort();
    }

    #[tokio::test]
    async fn test_run_fails_claim_lost_on_final_attempt() {
        let h = harness(1);
        let file_id = upload_pdf(&h, build_pdf(1, Vec::new())).await;

        // Simulate a crash mid-attempt: claimed, never finished
        let claimed = h.queue.dequeue().await.unwrap().unwrap();
        assert_eq!(claimed.attempts, 1);
        h.queue.age_claims(Duration::from_secs(3600));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(h.worker.clone().run(rx));
        sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        let state = h.queue.jobs_for(file_id).pop().unwrap();
        assert_eq!(state.status, ExtractionStatus::FailedTerminal);
        assert_eq!(state.attempts, 1);
        assert_eq!(h.files.metadata_count(file_id), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let h = harness(3);
        let file_id = upload_pdf(&h, build_pdf(1, Vec::new())).await;
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(h.worker.clone().run(rx));
        tokio::time::timeout(Duration::from_secs(5), async {
            while latest_status(&h, file_id) != ExtractionStatus::Succeeded {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
