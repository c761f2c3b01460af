use thiserror::Error;

use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::models::Visibility;
use crate::features::users::models::Role;
use crate::shared::constants::{CONTENT_TYPE_DOC, CONTENT_TYPE_DOCX, CONTENT_TYPE_PDF, MIB};

/// Reason an upload was refused before anything was stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("visibility not permitted for role")]
    VisibilityNotPermitted,

    #[error("content type not permitted for role")]
    ContentTypeNotPermitted,

    #[error("file too large for role")]
    TooLarge,
}

#[derive(Debug, Clone, Copy)]
pub enum ContentTypes {
    Any,
    Only(&'static [&'static str]),
}

impl ContentTypes {
    fn permits(&self, content_type: &str) -> bool {
        match self {
            ContentTypes::Any => true,
            ContentTypes::Only(allowed) => allowed.contains(&content_type),
        }
    }
}

/// Upload constraints for one role
#[derive(Debug, Clone, Copy)]
pub struct UploadRule {
    pub visibilities: &'static [Visibility],
    pub content_types: ContentTypes,
    pub max_bytes: u64,
}

const PDF_ONLY: &[&str] = &[CONTENT_TYPE_PDF];
const WORD_AND_PDF: &[&str] = &[CONTENT_TYPE_PDF, CONTENT_TYPE_DOC, CONTENT_TYPE_DOCX];

/// The single authoritative upload policy table.
pub fn rule_for(role: Role) -> UploadRule {
    match role {
        Role::User => UploadRule {
            visibilities: &[Visibility::Private],
            content_types: ContentTypes::Only(PDF_ONLY),
            max_bytes: 10 * MIB,
        },
        Role::Manager => UploadRule {
            visibilities: &Visibility::ALL,
            content_types: ContentTypes::Only(WORD_AND_PDF),
            max_bytes: 50 * MIB,
        },
        Role::Admin => UploadRule {
            visibilities: &Visibility::ALL,
            content_types: ContentTypes::Any,
            max_bytes: 100 * MIB,
        },
    }
}

/// Largest ceiling across all roles
pub fn max_upload_bytes() -> u64 {
    Role::ALL
        .iter()
        .map(|role| rule_for(*role).max_bytes)
        .max()
        .unwrap_or(0)
}

/// Gate an upload. Role rules are checked before size.
pub fn validate_upload(
    actor: &AuthenticatedUser,
    content_type: &str,
    visibility: Visibility,
    byte_size: u64,
) -> Result<(), UploadRejection> {
    let rule = rule_for(actor.role);

    if !rule.visibilities.contains(&visibility) {
        return Err(UploadRejection::VisibilityNotPermitted);
    }
    if !rule.content_types.permits(content_type) {
        return Err(UploadRejection::ContentTypeNotPermitted);
    }
    if byte_size > rule.max_bytes {
        return Err(UploadRejection::TooLarge);
    }

    Ok(())
}
