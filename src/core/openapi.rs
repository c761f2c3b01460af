use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::auth;
use crate::features::files::{dtos as files_dtos, handlers as files_handlers, models as files_models};
use crate::features::users::{dtos as users_dtos, handlers::user_handler, models as users_models};
use crate::modules::queue::ExtractionStatus;
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Users
        user_handler::create_user,
        user_handler::list_users,
        user_handler::get_me,
        user_handler::get_user,
        user_handler::update_role,
        // Files
        files_handlers::upload_file,
        files_handlers::list_files,
        files_handlers::get_file,
        files_handlers::download_file,
        files_handlers::get_file_metadata,
        files_handlers::delete_file,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Auth
            auth::model::AuthenticatedUser,
            // Users
            users_models::Role,
            users_dtos::CreateUserDto,
            users_dtos::UpdateRoleDto,
            users_dtos::UserResponseDto,
            ApiResponse<users_dtos::UserResponseDto>,
            ApiResponse<Vec<users_dtos::UserResponseDto>>,
            // Files
            files_models::Visibility,
            ExtractionStatus,
            files_dtos::UploadFileDto,
            files_dtos::FileResponseDto,
            files_dtos::DownloadResponseDto,
            files_dtos::MetadataResponseDto,
            files_dtos::DeleteFileResponseDto,
            ApiResponse<files_dtos::FileResponseDto>,
            ApiResponse<Vec<files_dtos::FileResponseDto>>,
            ApiResponse<files_dtos::DownloadResponseDto>,
            ApiResponse<files_dtos::MetadataResponseDto>,
            ApiResponse<files_dtos::DeleteFileResponseDto>,
        )
    ),
    tags(
        (name = "users", description = "User directory and role management"),
        (name = "files", description = "File upload, access control and extracted metadata"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "FileVault API",
        version = "0.1.0",
        description = "API documentation for FileVault",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to the OpenAPI document
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/users",
            "/api/users/me",
            "/api/users/{id}",
            "/api/users/{id}/role",
            "/api/files",
            "/api/files/upload",
            "/api/files/{id}",
            "/api/files/{id}/download",
            "/api/files/{id}/metadata",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth")));
    }

    #[test]
    fn test_info_modifier_overrides_title() {
        let mut doc = ApiDoc::openapi();
        SwaggerInfoModifier {
            title: "Vault".to_string(),
            version: "9".to_string(),
            description: "desc".to_string(),
        }
        .modify(&mut doc);
        assert_eq!(doc.info.title, "Vault");
        assert_eq!(doc.info.version, "9");
    }
}
