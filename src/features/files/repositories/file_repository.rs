use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::core::error::Result;
use crate::features::files::models::{CreateFile, File, FileMetadata};
use crate::features::files::policy::ReadScope;

#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn create(&self, file: CreateFile) -> Result<File>;

    async fn find_by_id(&self, id: i64) -> Result<Option<File>>;

    /// Page of files visible under `scope`, newest first, plus the total count
    async fn list_readable(
        &self,
        scope: &ReadScope,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<File>, i64)>;

    /// Atomically bump the download counter. `None` when the file is gone.
    async fn increment_downloads(&self, id: i64) -> Result<Option<File>>;

    /// Remove the file row together with its metadata and extraction jobs.
    /// Returns false when nothing was deleted.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Insert or replace the single metadata row for `file_id`
    async fn upsert_metadata(
        &self,
        file_id: i64,
        doc_type: &str,
        raw: serde_json::Value,
    ) -> Result<FileMetadata>;

    async fn find_metadata(&self, file_id: i64) -> Result<Option<FileMetadata>>;
}

const FILE_COLUMNS: &str = "id, owner_id, department, filename, content_type, size_bytes, \
     visibility, storage_key, downloads, created_at";

const METADATA_COLUMNS: &str = "id, file_id, doc_type, raw, extracted_at";

pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append the read filter for `scope` as a WHERE clause
fn push_scope_filter(query: &mut QueryBuilder<'_, Postgres>, scope: &ReadScope) {
    match scope {
        ReadScope::All => {}
        ReadScope::Manager { department } => {
            query
                .push(" WHERE (department = ")
                .push_bind(department.clone())
                .push(" OR visibility <> 'PRIVATE')");
        }
        ReadScope::User {
            user_id,
            department,
        } => {
            query
                .push(" WHERE (owner_id = ")
                .push_bind(*user_id)
                .push(" OR visibility = 'PUBLIC' OR (visibility = 'DEPARTMENT' AND department = ")
                .push_bind(department.clone())
                .push("))");
        }
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn create(&self, file: CreateFile) -> Result<File> {
        let created = sqlx::query_as::<_, File>(&format!(
            "INSERT INTO files
                (owner_id, department, filename, content_type, size_bytes, visibility, storage_key)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {FILE_COLUMNS}"
        ))
        .bind(file.owner_id)
        .bind(&file.department)
        .bind(&file.filename)
        .bind(&file.content_type)
        .bind(file.size_bytes)
        .bind(file.visibility)
        .bind(&file.storage_key)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<File>> {
        let file = sqlx::query_as::<_, File>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(file)
    }

    async fn list_readable(
        &self,
        scope: &ReadScope,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<File>, i64)> {
        let mut page_query = QueryBuilder::<Postgres>::new(format!("SELECT {FILE_COLUMNS} FROM files"));
        push_scope_filter(&mut page_query, scope);
        page_query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let files = page_query
            .build_query_as::<File>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM files");
        push_scope_filter(&mut count_query, scope);

        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((files, total))
    }

    async fn increment_downloads(&self, id: i64) -> Result<Option<File>> {
        let file = sqlx::query_as::<_, File>(&format!(
            "UPDATE files SET downloads = downloads + 1
             WHERE id = $1
             RETURNING {FILE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(file)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        // file_metadata and extraction_jobs cascade
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_metadata(
        &self,
        file_id: i64,
        doc_type: &str,
        raw: serde_json::Value,
    ) -> Result<FileMetadata> {
        let metadata = sqlx::query_as::<_, FileMetadata>(&format!(
            "INSERT INTO file_metadata (file_id, doc_type, raw, extracted_at)
             VALUES ($1, $2, $3, NOW())
             ON CONFLICT (file_id) DO UPDATE SET
                doc_type = EXCLUDED.doc_type,
                raw = EXCLUDED.raw,
                extracted_at = EXCLUDED.extracted_at
             RETURNING {METADATA_COLUMNS}"
        ))
        .bind(file_id)
        .bind(doc_type)
        .bind(raw)
        .fetch_one(&self.pool)
        .await?;

        Ok(metadata)
    }

    async fn find_metadata(&self, file_id: i64) -> Result<Option<FileMetadata>> {
        let metadata = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {METADATA_COLUMNS} FROM file_metadata WHERE file_id = $1"
        ))
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(metadata)
    }
}
