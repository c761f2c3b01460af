//! Storage module for file blobs
//!
//! `BlobStore` is the seam the upload path and the extraction pipeline
//! depend on. `MinIOClient` is the production implementation.

mod minio_client;

use async_trait::async_trait;
use std::time::Duration;

use crate::core::error::AppError;

pub use minio_client::MinIOClient;

/// Key-addressed binary storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;

    /// Time-limited direct download URL. Never persisted.
    async fn presign_get(&self, key: &str, expiry: Duration) -> Result<String, AppError>;
}
