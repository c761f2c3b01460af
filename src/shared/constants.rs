/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// CONTENT TYPES
// =============================================================================

pub const CONTENT_TYPE_PDF: &str = "application/pdf";

/// Legacy binary Word format (.doc)
pub const CONTENT_TYPE_DOC: &str = "application/msword";

/// Office Open XML Word format (.docx)
pub const CONTENT_TYPE_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub const MIB: u64 = 1024 * 1024;

// =============================================================================
// FILE RECORD LIMITS
// =============================================================================

/// Matches `files.filename VARCHAR(255)`
pub const MAX_FILENAME_CHARS: usize = 255;

/// Matches `files.content_type VARCHAR(255)`
pub const MAX_CONTENT_TYPE_CHARS: usize = 255;

/// Extensions longer than this are treated as part of the name when truncating
pub const MAX_EXTENSION_CHARS: usize = 16;
