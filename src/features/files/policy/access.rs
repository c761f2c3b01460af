use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::models::{File, Visibility};
use crate::features::users::models::Role;

/// Action a caller wants to perform on an existing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    ReadInfo,
    Download,
    Delete,
}

impl FileAction {
    pub const ALL: [FileAction; 3] = [FileAction::ReadInfo, FileAction::Download, FileAction::Delete];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
}

impl AccessDecision {
    pub fn is_allowed(self) -> bool {
        self == AccessDecision::Allow
    }

    fn from_bool(allowed: bool) -> Self {
        if allowed {
            AccessDecision::Allow
        } else {
            AccessDecision::Deny
        }
    }
}

/// Decide whether `actor` may perform `action` on `file`.
///
/// Read and download share one rule. Ownership grants everything.
/// Managers delete by department, never by ownership alone, and never
/// outside their department.
pub fn decide(actor: &AuthenticatedUser, file: &File, action: FileAction) -> AccessDecision {
    let same_department = file.department == actor.department;
    let is_owner = file.owner_id == actor.id;

    let allowed = match (actor.role, action) {
        (Role::Admin, _) => true,

        (Role::Manager, FileAction::Delete) => same_department,
        (Role::Manager, FileAction::ReadInfo | FileAction::Download) => {
            same_department || file.visibility != Visibility::Private
        }

        (Role::User, FileAction::Delete) => is_owner,
        (Role::User, FileAction::ReadInfo | FileAction::Download) => {
            is_owner
                || match file.visibility {
                    Visibility::Public => true,
                    Visibility::Department => same_department,
                    Visibility::Private => false,
                }
        }
    };

    AccessDecision::from_bool(allowed)
}

/// Resolve a looked-up file against the policy.
///
/// A missing file is `NotFound`, never `Forbidden`.
pub fn authorize(actor: &AuthenticatedUser, file: Option<File>, action: FileAction) -> Result<File> {
    let file = file.ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    match decide(actor, &file, action) {
        AccessDecision::Allow => Ok(file),
        AccessDecision::Deny => {
            tracing::debug!(
                user_id = actor.id,
                file_id = file.id,
                ?action,
                "Access denied"
            );
            Err(AppError::Forbidden(
                "You do not have permission to access this file".to_string(),
            ))
        }
    }
}

/// The set of files a caller may `ReadInfo`, in a form repositories can
/// turn into a query filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadScope {
    All,
    /// Everything in the department, plus non-private files elsewhere
    Manager { department: String },
    /// Own files, public files, and department-visible files in the department
    User { user_id: i64, department: String },
}

impl ReadScope {
    pub fn for_actor(actor: &AuthenticatedUser) -> Self {
        match actor.role {
            Role::Admin => ReadScope::All,
            Role::Manager => ReadScope::Manager {
                department: actor.department.clone(),
            },
            Role::User => ReadScope::User {
                user_id: actor.id,
                department: actor.department.clone(),
            },
        }
    }

    pub fn permits(&self, file: &File) -> bool {
        match self {
            ReadScope::All => true,
            ReadScope::Manager { department } => {
                file.department == *department || file.visibility != Visibility::Private
            }
            ReadScope::User {
                user_id,
                department,
            } => {
                file.owner_id == *user_id
                    || file.visibility == Visibility::Public
                    || (file.visibility == Visibility::Department && file.department == *department)
            }
        }
    }
}
