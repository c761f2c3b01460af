use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{
    DeleteFileResponseDto, DownloadResponseDto, FileResponseDto, MetadataResponseDto,
    UploadFileDto,
};
use crate::features::files::models::Visibility;
use crate::features::files::policy::UploadRejection;
use crate::features::files::services::{FileService, UploadRequest};
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

fn multipart_error(e: MultipartError) -> AppError {
    debug!("Failed to read multipart data: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::UploadRejected(UploadRejection::TooLarge)
    } else {
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    }
}

/// Upload a file
///
/// Accepts multipart/form-data with:
/// - `file`: the file; its part content type is the declared content type (required)
/// - `visibility`: PRIVATE, DEPARTMENT or PUBLIC (required)
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "File upload form with a required visibility field",
    ),
    responses(
        (status = 201, description = "File uploaded successfully", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Missing field, or visibility/content type not permitted for role"),
        (status = 401, description = "Authentication required"),
        (status = 413, description = "File exceeds the role's size ceiling")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponseDto>>), AppError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut visibility: Option<Visibility> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unnamed".to_string());
                let data = field.bytes().await.map_err(multipart_error)?;

                file = Some((filename, content_type, data.to_vec()));
            }
            "visibility" => {
                let text = field.text().await.map_err(multipart_error)?;
                visibility = Some(
                    text.trim()
                        .to_uppercase()
                        .parse::<Visibility>()
                        .map_err(AppError::Validation)?,
                );
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let (filename, content_type, data) =
        file.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;
    let visibility =
        visibility.ok_or_else(|| AppError::Validation("Visibility is required".to_string()))?;

    let response = service
        .upload(
            &user,
            UploadRequest {
                filename,
                content_type,
                visibility,
                data,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(response),
            Some("File uploaded successfully".to_string()),
            None,
        )),
    ))
}

/// List the files the caller may read
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Readable files, newest first", body = ApiResponse<Vec<FileResponseDto>>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_files(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<FileResponseDto>>>, AppError> {
    let (files, total) = service.list(&user, &query).await?;
    Ok(Json(ApiResponse::success(
        Some(files),
        None,
        Some(Meta::paginated(total, &query)),
    )))
}

#[utoipa::path(
    get,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File info", body = ApiResponse<FileResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<FileResponseDto>>, AppError> {
    let file = service.get(&user, id).await?;
    Ok(Json(ApiResponse::success(Some(file), None, None)))
}

/// Issue a presigned download link and count the download
#[utoipa::path(
    get,
    path = "/api/files/{id}/download",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Presigned link", body = ApiResponse<DownloadResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn download_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DownloadResponseDto>>, AppError> {
    let link = service.download(&user, id).await?;
    Ok(Json(ApiResponse::success(Some(link), None, None)))
}

#[utoipa::path(
    get,
    path = "/api/files/{id}/metadata",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Extraction status and extracted fields", body = ApiResponse<MetadataResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_file_metadata(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MetadataResponseDto>>, AppError> {
    let metadata = service.metadata(&user, id).await?;
    Ok(Json(ApiResponse::success(Some(metadata), None, None)))
}

#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File deleted successfully", body = ApiResponse<DeleteFileResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not authorized to delete this file"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DeleteFileResponseDto>>, AppError> {
    service.delete(&user, id).await?;

    Ok(Json(ApiResponse::success(
        Some(DeleteFileResponseDto { deleted: true }),
        Some("File deleted successfully".to_string()),
        None,
    )))
}
