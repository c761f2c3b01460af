use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::users::models::{Role, User};

/// Caller identity resolved from a verified token plus the users table.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub department: String,
}

impl AuthenticatedUser {
    /// Check if user is admin
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Check if user has manager-level access (manager or admin)
    pub fn has_manager_access(&self) -> bool {
        self.role >= Role::Manager
    }
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            department: user.department,
        }
    }
}

/// Claims carried by access tokens. `sub` is the user's email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}
