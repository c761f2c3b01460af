use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::features::users::models::{Role, User};
use crate::shared::validation::DEPARTMENT_REGEX;

/// Request DTO for creating a user
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserDto {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "jane@example.com")]
    pub email: String,

    #[validate(length(max = 255, message = "Full name must not exceed 255 characters"))]
    #[serde(default)]
    pub full_name: String,

    #[validate(regex(
        path = *DEPARTMENT_REGEX,
        message = "Department must be 1-64 letters, digits, hyphens or underscores"
    ))]
    #[schema(example = "finance")]
    pub department: String,

    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::User
}

/// Request DTO for changing a user's role
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateRoleDto {
    pub role: Role,
}

/// Response DTO for a user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponseDto {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub department: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponseDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            department: user.department,
            role: user.role,
            created_at: user.created_at,
        }
    }
}
