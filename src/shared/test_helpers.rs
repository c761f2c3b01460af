//! In-memory fakes for the repository, storage and queue seams, plus
//! request helpers that inject an authenticated user.

use async_trait::async_trait;
use axum::{extract::Request, middleware::Next, Router};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::models::{CreateFile, File, FileMetadata};
use crate::features::files::policy::ReadScope;
use crate::features::files::repositories::FileRepository;
use crate::features::users::models::{CreateUser, Role, User};
use crate::features::users::repositories::UserRepository;
use crate::modules::queue::{
    ClaimedJob, ExtractionJob, ExtractionStatus, JobQueue, JobState, LOST_CLAIM, LOST_FINAL_CLAIM,
};
use crate::modules::storage::BlobStore;
use crate::shared::constants::{MAX_CONTENT_TYPE_CHARS, MAX_FILENAME_CHARS};

// =============================================================================
// AUTH
// =============================================================================

pub fn auth_user(id: i64, role: Role, department: &str) -> AuthenticatedUser {
    AuthenticatedUser {
        id,
        email: format!("user{}@example.com", id),
        role,
        department: department.to_string(),
    }
}

/// Make every request through `router` arrive as `user`
pub fn with_auth(router: Router, user: AuthenticatedUser) -> Router {
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| {
            let user = user.clone();
            async move {
                request.extensions_mut().insert(user);
                next.run(request).await
            }
        },
    ))
}

// =============================================================================
// USERS
// =============================================================================

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user and return its id
    pub fn seed(&self, email: &str, role: Role, department: &str) -> i64 {
        let mut users = self.users.lock().unwrap();
        let id = users.len() as i64 + 1;
        let now = Utc::now();
        users.push(User {
            id,
            email: email.to_string(),
            full_name: String::new(),
            department: department.to_string(),
            role,
            created_at: now,
            updated_at: now,
        });
        id
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create(&self, user: CreateUser) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(AppError::Conflict(format!(
                "User with email '{}' already exists",
                user.email
            )));
        }
        let now = Utc::now();
        let created = User {
            id: users.len() as i64 + 1,
            email: user.email,
            full_name: user.full_name,
            department: user.department,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn update_role(&self, id: i64, role: Role) -> Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            u.role = role;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn list(
        &self,
        department: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64)> {
        let users = self.users.lock().unwrap();
        let matching: Vec<User> = users
            .iter()
            .filter(|u| department.map_or(true, |d| u.department == d))
            .cloned()
            .collect();
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }
}

// =============================================================================
// FILES
// =============================================================================

#[derive(Default)]
struct FileState {
    files: BTreeMap<i64, File>,
    metadata: BTreeMap<i64, FileMetadata>,
    next_file_id: i64,
    next_metadata_id: i64,
}

#[derive(Default)]
pub struct InMemoryFileRepository {
    state: Mutex<FileState>,
    fail_creates: AtomicBool,
    jobs: Option<Arc<InMemoryJobQueue>>,
}

impl InMemoryFileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deleting a file also drops its jobs from `queue`, like the FK cascade does
    pub fn with_jobs(queue: Arc<InMemoryJobQueue>) -> Self {
        Self {
            jobs: Some(queue),
            ..Self::default()
        }
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn file_count(&self) -> usize {
        self.state.lock().unwrap().files.len()
    }

    pub fn metadata_count(&self, file_id: i64) -> usize {
        self.state
            .lock()
            .unwrap()
            .metadata
            .values()
            .filter(|m| m.file_id == file_id)
            .count()
    }
}

#[async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn create(&self, file: CreateFile) -> Result<File> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(AppError::Internal("record store unavailable".to_string()));
        }
        // Same widths as the `files` columns
        if file.filename.chars().count() > MAX_FILENAME_CHARS
            || file.content_type.chars().count() > MAX_CONTENT_TYPE_CHARS
        {
            return Err(AppError::Internal("value too long for column".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        if state
            .files
            .values()
            .any(|f| f.storage_key == file.storage_key)
        {
            return Err(AppError::Conflict("storage key already used".to_string()));
        }
        state.next_file_id += 1;
        let created = File {
            id: state.next_file_id,
            owner_id: file.owner_id,
            department: file.department,
            filename: file.filename,
            content_type: file.content_type,
            size_bytes: file.size_bytes,
            visibility: file.visibility,
            storage_key: file.storage_key,
            downloads: 0,
            created_at: Utc::now(),
        };
        state.files.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<File>> {
        Ok(self.state.lock().unwrap().files.get(&id).cloned())
    }

    async fn list_readable(
        &self,
        scope: &ReadScope,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<File>, i64)> {
        let state = self.state.lock().unwrap();
        let matching: Vec<File> = state
            .files
            .values()
            .rev()
            .filter(|f| scope.permits(f))
            .cloned()
            .collect();
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn increment_downloads(&self, id: i64) -> Result<Option<File>> {
        let mut state = self.state.lock().unwrap();
        Ok(state.files.get_mut(&id).map(|f| {
            f.downloads += 1;
            f.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let removed = {
            let mut state = self.state.lock().unwrap();
            state.metadata.remove(&id);
            state.files.remove(&id).is_some()
        };
        if removed {
            if let Some(queue) = &self.jobs {
                queue.purge_file(id);
            }
        }
        Ok(removed)
    }

    async fn upsert_metadata(
        &self,
        file_id: i64,
        doc_type: &str,
        raw: serde_json::Value,
    ) -> Result<FileMetadata> {
        let mut state = self.state.lock().unwrap();
        if !state.files.contains_key(&file_id) {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        let id = match state.metadata.get(&file_id) {
            Some(existing) => existing.id,
            None => {
                state.next_metadata_id += 1;
                state.next_metadata_id
            }
        };
        let metadata = FileMetadata {
            id,
            file_id,
            doc_type: doc_type.to_string(),
            raw,
            extracted_at: Utc::now(),
        };
        state.metadata.insert(file_id, metadata.clone());
        Ok(metadata)
    }

    async fn find_metadata(&self, file_id: i64) -> Result<Option<FileMetadata>> {
        Ok(self.state.lock().unwrap().metadata.get(&file_id).cloned())
    }
}

// =============================================================================
// BLOBS
// =============================================================================

#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_puts: AtomicBool,
    /// Number of upcoming `get` calls that fail
    failing_gets: AtomicUsize,
    /// Number of upcoming `delete` calls that fail
    failing_deletes: AtomicUsize,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_next_gets(&self, count: usize) {
        self.failing_gets.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_deletes(&self, count: usize) {
        self.failing_deletes.store(count, Ordering::SeqCst);
    }

    pub fn insert(&self, key: &str, data: Vec<u8>) {
        self.blobs.lock().unwrap().insert(key.to_string(), data);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.blobs.lock().unwrap().keys().cloned().collect()
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(AppError::Storage("put failed".to_string()));
        }
        self.insert(key, data);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        if Self::take_failure(&self.failing_gets) {
            return Err(AppError::Storage("get failed".to_string()));
        }
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::Storage(format!("no such key '{}'", key)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if Self::take_failure(&self.failing_deletes) {
            return Err(AppError::Storage("delete failed".to_string()));
        }
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, expiry: Duration) -> Result<String> {
        Ok(format!("memory://{}?expires={}", key, expiry.as_secs()))
    }
}

// =============================================================================
// QUEUE
// =============================================================================

#[derive(Debug, Clone)]
struct QueuedRow {
    id: i64,
    file_id: i64,
    content_type: String,
    status: ExtractionStatus,
    attempts: i32,
    available_at: DateTime<Utc>,
    last_error: Option<String>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemoryJobQueue {
    rows: Mutex<Vec<QueuedRow>>,
    fail_enqueue: AtomicBool,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_enqueue(&self, fail: bool) {
        self.fail_enqueue.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// States of every job for `file_id`, oldest first
    pub fn jobs_for(&self, file_id: i64) -> Vec<JobState> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.file_id == file_id)
            .map(Self::state_of)
            .collect()
    }

    /// Make every waiting job ready now
    pub fn expire_delays(&self) {
        let now = Utc::now();
        for row in self.rows.lock().unwrap().iter_mut() {
            row.available_at = row.available_at.min(now);
        }
    }

    /// Backdate claims so `release_stale` sees them as abandoned
    pub fn age_claims(&self, by: Duration) {
        let by = chrono::Duration::from_std(by).unwrap();
        for row in self.rows.lock().unwrap().iter_mut() {
            if row.status == ExtractionStatus::Extracting {
                row.updated_at -= by;
            }
        }
    }

    fn purge_file(&self, file_id: i64) {
        self.rows.lock().unwrap().retain(|r| r.file_id != file_id);
    }

    fn state_of(row: &QueuedRow) -> JobState {
        JobState {
            job_id: row.id,
            status: row.status,
            attempts: row.attempts,
            last_error: row.last_error.clone(),
            updated_at: row.updated_at,
        }
    }

    fn transition(
        &self,
        job: &ClaimedJob,
        status: ExtractionStatus,
        available_at: Option<DateTime<Utc>>,
        error: Option<&str>,
    ) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows
            .iter_mut()
            .find(|r| r.id == job.id && r.status == ExtractionStatus::Extracting)
        {
            row.status = status;
            row.last_error = error.map(str::to_string);
            row.updated_at = Utc::now();
            if let Some(at) = available_at {
                row.available_at = at;
            }
        }
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: ExtractionJob) -> Result<i64> {
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(AppError::Internal("queue unavailable".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        let id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let now = Utc::now();
        rows.push(QueuedRow {
            id,
            file_id: job.file_id,
            content_type: job.content_type,
            status: ExtractionStatus::Pending,
            attempts: 0,
            available_at: now,
            last_error: None,
            updated_at: now,
        });
        Ok(id)
    }

    async fn dequeue(&self) -> Result<Option<ClaimedJob>> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();

        let candidate = rows
            .iter()
            .filter(|r| {
                matches!(
                    r.status,
                    ExtractionStatus::Pending | ExtractionStatus::FailedTransient
                ) && r.available_at <= now
                    && !rows.iter().any(|other| {
                        other.file_id == r.file_id && other.status == ExtractionStatus::Extracting
                    })
            })
            .min_by_key(|r| (r.available_at, r.id))
            .map(|r| r.id);

        Ok(candidate.and_then(|id| {
            rows.iter_mut().find(|r| r.id == id).map(|row| {
                row.status = ExtractionStatus::Extracting;
                row.attempts += 1;
                row.updated_at = now;
                ClaimedJob {
                    id: row.id,
                    file_id: row.file_id,
                    content_type: row.content_type.clone(),
                    attempts: row.attempts,
                }
            })
        }))
    }

    async fn ack(&self, job: &ClaimedJob) -> Result<()> {
        self.transition(job, ExtractionStatus::Succeeded, None, None);
        Ok(())
    }

    async fn retry(&self, job: &ClaimedJob, delay: Duration, error: &str) -> Result<()> {
        let available_at =
            Utc::now() + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        self.transition(
            job,
            ExtractionStatus::FailedTransient,
            Some(available_at),
            Some(error),
        );
        Ok(())
    }

    async fn fail(&self, job: &ClaimedJob, error: &str) -> Result<()> {
        self.transition(job, ExtractionStatus::FailedTerminal, None, Some(error));
        Ok(())
    }

    async fn latest_for_file(&self, file_id: i64) -> Result<Option<JobState>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.file_id == file_id)
            .max_by_key(|r| r.id)
            .map(Self::state_of))
    }

    async fn release_stale(&self, older_than: Duration, max_attempts: i32) -> Result<u64> {
        let cutoff =
            Utc::now() - chrono::Duration::from_std(older_than).unwrap_or(chrono::Duration::zero());
        let mut released = 0;
        for row in self.rows.lock().unwrap().iter_mut() {
            if row.status == ExtractionStatus::Extracting && row.updated_at < cutoff {
                if row.attempts >= max_attempts {
                    row.status = ExtractionStatus::FailedTerminal;
                    row.last_error = Some(LOST_FINAL_CLAIM.to_string());
                } else {
                    row.status = ExtractionStatus::FailedTransient;
                    row.last_error = Some(LOST_CLAIM.to_string());
                }
                row.available_at = Utc::now();
                row.updated_at = Utc::now();
                released += 1;
            }
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(file_id: i64) -> ExtractionJob {
        ExtractionJob {
            file_id,
            content_type: "application/pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn test_queue_holds_one_claim_per_file() {
        let queue = InMemoryJobQueue::new();
        queue.enqueue(job(1)).await.unwrap();
        queue.enqueue(job(1)).await.unwrap();
        queue.enqueue(job(2)).await.unwrap();

        let first = queue.dequeue().await.unwrap().unwrap();
        let second = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(first.file_id, 1);
        assert_eq!(second.file_id, 2);
        assert!(queue.dequeue().await.unwrap().is_none());

        queue.ack(&first).await.unwrap();
        let third = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(third.file_id, 1);
        assert_ne!(third.id, first.id);
    }

    #[tokio::test]
    async fn test_queue_release_stale_claims() {
        let queue = InMemoryJobQueue::new();
        queue.enqueue(job(1)).await.unwrap();
        let claimed = queue.dequeue().await.unwrap().unwrap();

        assert_eq!(queue.release_stale(Duration::from_secs(60), 3).await.unwrap(), 0);
        queue.age_claims(Duration::from_secs(120));
        assert_eq!(queue.release_stale(Duration::from_secs(60), 3).await.unwrap(), 1);

        let reclaimed = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(reclaimed.id, claimed.id);
        assert_eq!(reclaimed.attempts, 2);
    }

    #[tokio::test]
    async fn test_queue_release_stale_final_attempt_is_terminal() {
        let queue = InMemoryJobQueue::new();
        queue.enqueue(job(1)).await.unwrap();
        let claimed = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(claimed.attempts, 1);

        queue.age_claims(Duration::from_secs(120));
        assert_eq!(queue.release_stale(Duration::from_secs(60), 1).await.unwrap(), 1);

        let state = queue.latest_for_file(1).await.unwrap().unwrap();
        assert_eq!(state.status, ExtractionStatus::FailedTerminal);
        assert_eq!(state.last_error.as_deref(), Some(LOST_FINAL_CLAIM));
        assert!(queue.dequeue().await.unwrap().is_none());
    }
}
