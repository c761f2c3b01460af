//! Role-based authorization guards.
//!
//! Role hierarchy (from highest to lowest):
//! - ADMIN: bypasses every file access check
//! - MANAGER: manages users, reads across departments, deletes within own department
//! - USER: owns files, reads what visibility allows
//!
//! File-level decisions live in `features::files::policy`; these guards only
//! gate whole endpoints.

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Guard for checking if user has manager level access.
///
/// Allows users with MANAGER or ADMIN roles.
///
/// # Example
/// ```ignore
/// pub async fn handler(RequireManager(user): RequireManager) { ... }
/// ```
pub struct RequireManager(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireManager
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;

        if !user.has_manager_access() {
            return Err(AppError::Forbidden("Manager access required".to_string()));
        }

        Ok(RequireManager(user.clone()))
    }
}
