use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::files::handlers::{
    delete_file, download_file, get_file, get_file_metadata, list_files, upload_file,
};
use crate::features::files::services::FileService;

/// Create routes for the files feature. `upload_limit` caps the multipart body.
pub fn routes(file_service: Arc<FileService>, upload_limit: usize) -> Router {
    Router::new()
        .route(
            "/api/files/upload",
            post(upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/files", get(list_files))
        .route("/api/files/{id}", get(get_file).delete(delete_file))
        .route("/api/files/{id}/download", get(download_file))
        .route("/api/files/{id}/metadata", get(get_file_metadata))
        .with_state(file_service)
}
