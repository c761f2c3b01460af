use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::files::models::{File, FileMetadata, Visibility};
use crate::modules::queue::{ExtractionStatus, JobState};

/// Upload file request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFileDto {
    /// The file to upload. Its part content type is the declared content type.
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// PRIVATE, DEPARTMENT or PUBLIC
    #[schema(example = "PRIVATE")]
    pub visibility: String,
}

/// Response DTO for a file record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileResponseDto {
    pub id: i64,
    pub owner_id: i64,
    pub department: String,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub visibility: Visibility,
    pub downloads: i64,
    pub created_at: DateTime<Utc>,
}

impl From<File> for FileResponseDto {
    fn from(file: File) -> Self {
        Self {
            id: file.id,
            owner_id: file.owner_id,
            department: file.department,
            filename: file.filename,
            content_type: file.content_type,
            size_bytes: file.size_bytes,
            visibility: file.visibility,
            downloads: file.downloads,
            created_at: file.created_at,
        }
    }
}

/// Short-lived link to the blob
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DownloadResponseDto {
    pub url: String,
    /// Seconds until `url` stops working
    pub expires_in: u64,
}

/// Extraction state and, once available, the extracted fields
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MetadataResponseDto {
    pub file_id: i64,
    pub status: ExtractionStatus,
    pub doc_type: Option<String>,
    /// Extracted fields; `{}` until extraction succeeds
    #[schema(value_type = Object)]
    pub raw: serde_json::Value,
    /// Last failure reason, if the latest attempt failed
    pub error: Option<String>,
}

impl MetadataResponseDto {
    /// Stored metadata wins; otherwise report the latest job, or pending if none exists yet
    pub fn from_parts(
        file_id: i64,
        metadata: Option<FileMetadata>,
        job: Option<JobState>,
    ) -> Self {
        match metadata {
            Some(metadata) => Self {
                file_id,
                status: ExtractionStatus::Succeeded,
                doc_type: Some(metadata.doc_type),
                raw: metadata.raw,
                error: None,
            },
            None => Self {
                file_id,
                status: job
                    .as_ref()
                    .map(|j| j.status)
                    .unwrap_or(ExtractionStatus::Pending),
                doc_type: None,
                raw: serde_json::json!({}),
                error: job.and_then(|j| j.last_error),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteFileResponseDto {
    pub deleted: bool,
}
