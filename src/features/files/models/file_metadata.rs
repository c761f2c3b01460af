use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Extracted document metadata. At most one row per file.
#[derive(Debug, Clone, FromRow)]
pub struct FileMetadata {
    pub id: i64,
    pub file_id: i64,
    /// "pdf", "docx" or "unknown"
    pub doc_type: String,
    pub raw: serde_json::Value,
    pub extracted_at: DateTime<Utc>,
}
