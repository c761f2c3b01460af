use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;

/// File visibility enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "file_visibility", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    /// Owner only (plus managers of the file's department and admins)
    Private,
    /// Readable by everyone in the file's department
    Department,
    /// Readable by every authenticated user
    Public,
}

impl Visibility {
    pub const ALL: [Visibility; 3] = [
        Visibility::Private,
        Visibility::Department,
        Visibility::Public,
    ];
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Private => write!(f, "PRIVATE"),
            Visibility::Department => write!(f, "DEPARTMENT"),
            Visibility::Public => write!(f, "PUBLIC"),
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PRIVATE" => Ok(Visibility::Private),
            "DEPARTMENT" => Ok(Visibility::Department),
            "PUBLIC" => Ok(Visibility::Public),
            other => Err(format!(
                "Invalid visibility '{}'. Expected PRIVATE, DEPARTMENT or PUBLIC",
                other
            )),
        }
    }
}

/// Database model for files
#[derive(Debug, Clone, FromRow)]
pub struct File {
    pub id: i64,
    pub owner_id: i64,
    /// Owner's department at upload time; never re-derived
    pub department: String,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub visibility: Visibility,
    pub storage_key: String,
    pub downloads: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a file record
#[derive(Debug, Clone)]
pub struct CreateFile {
    pub owner_id: i64,
    pub department: String,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub visibility: Visibility,
    pub storage_key: String,
}
