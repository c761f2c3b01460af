use std::io::{Cursor, Read};

use chrono::DateTime;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{json, Value};
use zip::result::ZipError;
use zip::ZipArchive;

use super::ExtractedMetadata;
use crate::features::extraction::error::ExtractionError;
use crate::shared::constants::MIB;

const DOCUMENT_PART: &str = "word/document.xml";
const CORE_PROPERTIES_PART: &str = "docProps/core.xml";

/// Largest decompressed XML part we are willing to hold in memory
const MAX_PART_BYTES: u64 = 64 * MIB;

/// Body-level paragraph and table counts plus core document properties
pub fn extract(bytes: &[u8]) -> Result<ExtractedMetadata, ExtractionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::Terminal(format!("unreadable DOCX container: {}", e)))?;

    let document = read_part(&mut archive, DOCUMENT_PART)?.ok_or_else(|| {
        ExtractionError::Terminal(format!("DOCX is missing {}", DOCUMENT_PART))
    })?;
    let (paragraphs, tables) = count_body_elements(&document)?;

    let core = match read_part(&mut archive, CORE_PROPERTIES_PART)? {
        Some(xml) => parse_core_properties(&xml)?,
        None => CoreProperties::default(),
    };

    let created = core.created.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or(raw)
    });

    Ok(ExtractedMetadata {
        doc_type: "docx",
        raw: json!({
            "type": "docx",
            "paragraphs": paragraphs,
            "tables": tables,
            "title": core.title.map(Value::String).unwrap_or(Value::Null),
            "author": core.creator.map(Value::String).unwrap_or(Value::Null),
            "created": created.map(Value::String).unwrap_or(Value::Null),
        }),
    })
}

fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<String>, ExtractionError> {
    read_part_limited(archive, name, MAX_PART_BYTES)
}

/// Decompress one part, refusing anything that inflates past `limit` bytes.
/// The declared size is checked first; the bounded read catches headers that lie.
fn read_part_limited(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
    limit: u64,
) -> Result<Option<String>, ExtractionError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(ExtractionError::Terminal(format!(
                "failed to open {}: {}",
                name, e
            )))
        }
    };

    if entry.size() > limit {
        return Err(oversized_part(name, limit));
    }

    let mut xml = String::new();
    (&mut entry)
        .take(limit + 1)
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Terminal(format!("failed to read {}: {}", name, e)))?;

    if xml.len() as u64 > limit {
        return Err(oversized_part(name, limit));
    }
    Ok(Some(xml))
}

fn oversized_part(name: &str, limit: u64) -> ExtractionError {
    ExtractionError::Terminal(format!(
        "{} inflates past the {} byte limit",
        name, limit
    ))
}

fn xml_error(part: &str, e: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::Terminal(format!("malformed {}: {}", part, e))
}

/// Counts `p` and `tbl` elements whose direct parent is `body`.
/// Paragraphs nested inside table cells are not counted.
fn count_body_elements(xml: &str) -> Result<(usize, usize), ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut paragraphs = 0;
    let mut tables = 0;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| xml_error(DOCUMENT_PART, e))?;

        let (name, is_start) = match &event {
            Event::Start(e) => (e.local_name().as_ref().to_vec(), true),
            Event::Empty(e) => (e.local_name().as_ref().to_vec(), false),
            Event::End(_) => {
                stack.pop();
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        if stack.last().map(Vec::as_slice) == Some(b"body".as_slice()) {
            match name.as_slice() {
                b"p" => paragraphs += 1,
                b"tbl" => tables += 1,
                _ => {}
            }
        }

        if is_start {
            stack.push(name);
        }
    }

    Ok((paragraphs, tables))
}

#[derive(Debug, Default, PartialEq)]
struct CoreProperties {
    title: Option<String>,
    creator: Option<String>,
    created: Option<String>,
}

fn parse_core_properties(xml: &str) -> Result<CoreProperties, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut props = CoreProperties::default();
    let mut current: Option<Vec<u8>> = None;
    let mut text = String::new();

    loop {
        match reader
            .read_event()
            .map_err(|e| xml_error(CORE_PROPERTIES_PART, e))?
        {
            Event::Start(e) => {
                current = Some(e.local_name().as_ref().to_vec());
                text.clear();
            }
            Event::Text(t) => {
                if current.is_some() {
                    let chunk = t.unescape().map_err(|e| xml_error(CORE_PROPERTIES_PART, e))?;
                    text.push_str(&chunk);
                }
            }
            Event::End(_) => {
                if let Some(name) = current.take() {
                    let value = Some(text.trim().to_string()).filter(|v| !v.is_empty());
                    match name.as_slice() {
                        b"title" => props.title = value,
                        b"creator" => props.creator = value,
                        b"created" => props.created = value,
                        _ => {}
                    }
                }
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(props)
}
