//! Per-format metadata extractors.
//!
//! `pdf` and `docx` are synchronous parsers meant for `spawn_blocking`.
//! `legacy_doc` converts `.doc` to `.docx` out of process.

pub mod docx;
pub mod legacy_doc;
pub mod pdf;

use serde_json::{json, Value};

use crate::shared::constants::{CONTENT_TYPE_DOC, CONTENT_TYPE_DOCX, CONTENT_TYPE_PDF};

pub use legacy_doc::{DocConverter, LibreOfficeConverter};

/// Extractor output: a type tag plus an open field mapping
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMetadata {
    pub doc_type: &'static str,
    pub raw: Value,
}

impl ExtractedMetadata {
    pub fn unknown() -> Self {
        Self {
            doc_type: "unknown",
            raw: json!({ "type": "unknown" }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    LegacyDoc,
    Unknown,
}

impl DocumentKind {
    /// Classify by MIME type, ignoring parameters such as `; charset=...`
    pub fn from_content_type(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            CONTENT_TYPE_PDF => DocumentKind::Pdf,
            CONTENT_TYPE_DOCX => DocumentKind::Docx,
            CONTENT_TYPE_DOC => DocumentKind::LegacyDoc,
            _ => DocumentKind::Unknown,
        }
    }
}
