use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{DownloadResponseDto, FileResponseDto, MetadataResponseDto};
use crate::features::files::models::{CreateFile, Visibility};
use crate::features::files::policy::{authorize, validate_upload, FileAction, ReadScope};
use crate::features::files::repositories::FileRepository;
use crate::modules::queue::{ExtractionJob, JobQueue};
use crate::modules::storage::BlobStore;
use crate::shared::constants::{MAX_CONTENT_TYPE_CHARS, MAX_EXTENSION_CHARS, MAX_FILENAME_CHARS};
use crate::shared::types::PaginationQuery;

/// How many times a blob is deleted after a failed record insert
const COMPENSATION_ATTEMPTS: u32 = 3;
const COMPENSATION_PAUSE: Duration = Duration::from_millis(100);

/// A validated upload waiting to be stored
#[derive(Debug)]
pub struct UploadRequest {
    pub filename: String,
    pub content_type: String,
    pub visibility: Visibility,
    pub data: Vec<u8>,
}

/// Service for file operations
pub struct FileService {
    files: Arc<dyn FileRepository>,
    blobs: Arc<dyn BlobStore>,
    jobs: Arc<dyn JobQueue>,
    presign_expiry: Duration,
}

impl FileService {
    pub fn new(
        files: Arc<dyn FileRepository>,
        blobs: Arc<dyn BlobStore>,
        jobs: Arc<dyn JobQueue>,
        presign_expiry: Duration,
    ) -> Self {
        Self {
            files,
            blobs,
            jobs,
            presign_expiry,
        }
    }

    /// Validate, store the blob, commit the record, then enqueue extraction.
    ///
    /// A failed commit removes the blob again. A failed enqueue only logs:
    /// the upload has already succeeded.
    pub async fn upload(
        &self,
        actor: &AuthenticatedUser,
        request: UploadRequest,
    ) -> Result<FileResponseDto> {
        let size = request.data.len();
        let content_type = normalize_content_type(&request.content_type);
        if content_type.chars().count() > MAX_CONTENT_TYPE_CHARS {
            return Err(AppError::BadRequest(format!(
                "Content type must be at most {} characters",
                MAX_CONTENT_TYPE_CHARS
            )));
        }
        validate_upload(actor, &content_type, request.visibility, size as u64)?;

        let filename = sanitize_filename(&request.filename);
        let storage_key = format!("{}_{}", Uuid::new_v4().simple(), filename);

        self.blobs
            .put(&storage_key, request.data, &content_type)
            .await?;
        debug!("Blob stored: {}", storage_key);

        let created = self
            .files
            .create(CreateFile {
                owner_id: actor.id,
                department: actor.department.clone(),
                filename,
                content_type,
                size_bytes: size as i64,
                visibility: request.visibility,
                storage_key: storage_key.clone(),
            })
            .await;

        let file = match created {
            Ok(file) => file,
            Err(e) => {
                self.remove_orphan(&storage_key).await;
                return Err(e);
            }
        };

        info!(
            file_id = file.id,
            owner_id = file.owner_id,
            size_bytes = file.size_bytes,
            visibility = %file.visibility,
            "File uploaded"
        );

        let job = ExtractionJob {
            file_id: file.id,
            content_type: file.content_type.clone(),
        };
        if let Err(e) = self.jobs.enqueue(job).await {
            error!(file_id = file.id, error = ?e, "Failed to enqueue metadata extraction");
        }

        Ok(file.into())
    }

    /// Files the caller may read, newest first
    pub async fn list(
        &self,
        actor: &AuthenticatedUser,
        query: &PaginationQuery,
    ) -> Result<(Vec<FileResponseDto>, i64)> {
        let scope = ReadScope::for_actor(actor);
        let (files, total) = self
            .files
            .list_readable(&scope, query.limit(), query.offset())
            .await?;
        Ok((files.into_iter().map(Into::into).collect(), total))
    }

    pub async fn get(&self, actor: &AuthenticatedUser, id: i64) -> Result<FileResponseDto> {
        let file = self.files.find_by_id(id).await?;
        authorize(actor, file, FileAction::ReadInfo).map(Into::into)
    }

    /// Presign a link and count the download
    pub async fn download(
        &self,
        actor: &AuthenticatedUser,
        id: i64,
    ) -> Result<DownloadResponseDto> {
        let file = authorize(actor, self.files.find_by_id(id).await?, FileAction::Download)?;

        let url = self
            .blobs
            .presign_get(&file.storage_key, self.presign_expiry)
            .await?;

        let counted = self
            .files
            .increment_downloads(file.id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        info!(
            file_id = counted.id,
            downloads = counted.downloads,
            actor_id = actor.id,
            "Download link issued"
        );

        Ok(DownloadResponseDto {
            url,
            expires_in: self.presign_expiry.as_secs(),
        })
    }

    pub async fn metadata(&self, actor: &AuthenticatedUser, id: i64) -> Result<MetadataResponseDto> {
        let file = authorize(actor, self.files.find_by_id(id).await?, FileAction::ReadInfo)?;

        let metadata = self.files.find_metadata(file.id).await?;
        let job = if metadata.is_none() {
            self.jobs.latest_for_file(file.id).await?
        } else {
            None
        };

        Ok(MetadataResponseDto::from_parts(file.id, metadata, job))
    }

    /// Remove the record (metadata and jobs go with it), then the blob
    pub async fn delete(&self, actor: &AuthenticatedUser, id: i64) -> Result<()> {
        let file = authorize(actor, self.files.find_by_id(id).await?, FileAction::Delete)?;

        if !self.files.delete(file.id).await? {
            return Err(AppError::NotFound("File not found".to_string()));
        }

        info!(file_id = file.id, actor_id = actor.id, "File deleted");

        if let Err(e) = self.blobs.delete(&file.storage_key).await {
            error!(
                storage_key = %file.storage_key,
                error = ?e,
                "Orphaned blob: record deleted but blob removal failed"
            );
        }

        Ok(())
    }

    async fn remove_orphan(&self, storage_key: &str) {
        for attempt in 1..=COMPENSATION_ATTEMPTS {
            match self.blobs.delete(storage_key).await {
                Ok(()) => {
                    debug!("Compensating delete removed blob: {}", storage_key);
                    return;
                }
                Err(e) => {
                    warn!(storage_key, attempt, error = ?e, "Compensating delete failed");
                    if attempt < COMPENSATION_ATTEMPTS {
                        tokio::time::sleep(COMPENSATION_PAUSE).await;
                    }
                }
            }
        }
        error!(storage_key, "Orphaned blob: record insert failed and blob could not be removed");
    }
}

/// Drop MIME parameters and case so `Application/PDF; x=y` matches `application/pdf`
fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Keep only the final path segment; blank names become "unnamed".
/// Long names are cut to the column width, keeping a short extension.
fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        return "unnamed".to_string();
    }
    if base.chars().count() <= MAX_FILENAME_CHARS {
        return base.to_string();
    }

    let extension = base
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().count() <= MAX_EXTENSION_CHARS);
    match extension {
        Some(ext) => {
            let keep = MAX_FILENAME_CHARS - ext.chars().count() - 1;
            let stem: String = base.chars().take(keep).collect();
            format!("{}.{}", stem, ext)
        }
        None => base.chars().take(MAX_FILENAME_CHARS).collect(),
    }
}
