use std::sync::Arc;
use std::time::Duration;

use crate::core::error::AppError;
use crate::features::extraction::error::ExtractionError;
use crate::features::extraction::extractors::{
    docx, pdf, DocConverter, DocumentKind, ExtractedMetadata,
};
use crate::features::files::models::FileMetadata;
use crate::features::files::repositories::FileRepository;
use crate::modules::queue::ClaimedJob;
use crate::modules::storage::BlobStore;

/// What a successful processing attempt did
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    Stored(FileMetadata),
    /// The file was deleted before the job ran; nothing to do
    FileGone,
}

pub struct ExtractionService {
    files: Arc<dyn FileRepository>,
    blobs: Arc<dyn BlobStore>,
    converter: Arc<dyn DocConverter>,
    fetch_timeout: Duration,
    parse_timeout: Duration,
}

impl ExtractionService {
    pub fn new(
        files: Arc<dyn FileRepository>,
        blobs: Arc<dyn BlobStore>,
        converter: Arc<dyn DocConverter>,
        fetch_timeout: Duration,
        parse_timeout: Duration,
    ) -> Self {
        Self {
            files,
            blobs,
            converter,
            fetch_timeout,
            parse_timeout,
        }
    }

    /// Run one extraction attempt. Safe to repeat: the metadata write is an upsert.
    pub async fn process(&self, job: &ClaimedJob) -> Result<ProcessOutcome, ExtractionError> {
        let Some(file) = self.files.find_by_id(job.file_id).await? else {
            tracing::info!(file_id = job.file_id, "File deleted before extraction, skipping");
            return Ok(ProcessOutcome::FileGone);
        };

        let extracted = match DocumentKind::from_content_type(&job.content_type) {
            DocumentKind::Unknown => ExtractedMetadata::unknown(),
            DocumentKind::Pdf => {
                let bytes = self.fetch(&file.storage_key).await?;
                self.parse(bytes, pdf::extract).await?
            }
            DocumentKind::Docx => {
                let bytes = self.fetch(&file.storage_key).await?;
                self.parse(bytes, docx::extract).await?
            }
            DocumentKind::LegacyDoc => {
                let bytes = self.fetch(&file.storage_key).await?;
                let converted = self.converter.to_docx(&bytes).await?;
                self.parse(converted, docx::extract).await?
            }
        };

        match self
            .files
            .upsert_metadata(file.id, extracted.doc_type, extracted.raw)
            .await
        {
            Ok(metadata) => {
                tracing::info!(
                    file_id = file.id,
                    doc_type = %metadata.doc_type,
                    "Metadata stored"
                );
                Ok(ProcessOutcome::Stored(metadata))
            }
            Err(AppError::NotFound(_)) => Ok(ProcessOutcome::FileGone),
            Err(e) if is_foreign_key_violation(&e) => Ok(ProcessOutcome::FileGone),
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, ExtractionError> {
        tokio::time::timeout(self.fetch_timeout, self.blobs.get(key))
            .await
            .map_err(|_| {
                ExtractionError::Transient(format!(
                    "Blob fetch timed out after {}s",
                    self.fetch_timeout.as_secs()
                ))
            })?
            .map_err(ExtractionError::from)
    }

    async fn parse(
        &self,
        bytes: Vec<u8>,
        extract: fn(&[u8]) -> Result<ExtractedMetadata, ExtractionError>,
    ) -> Result<ExtractedMetadata, ExtractionError> {
        let task = tokio::task::spawn_blocking(move || extract(&bytes));
        match tokio::time::timeout(self.parse_timeout, task).await {
            Err(_) => Err(ExtractionError::Transient(format!(
                "Parsing timed out after {}s",
                self.parse_timeout.as_secs()
            ))),
            Ok(Err(join_error)) => Err(ExtractionError::Terminal(format!(
                "Parser crashed: {}",
                join_error
            ))),
            Ok(Ok(result)) => result,
        }
    }
}

fn is_foreign_key_violation(err: &AppError) -> bool {
    match err {
        AppError::Database(sqlx::Error::Database(db)) => db.is_foreign_key_violation(),
        _ => false,
    }
}
