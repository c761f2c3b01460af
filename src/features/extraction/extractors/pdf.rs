use lopdf::{Dictionary, Document, Object};
use serde_json::{json, Value};

use super::ExtractedMetadata;
use crate::features::extraction::error::ExtractionError;

/// Page count plus Info dictionary fields. Missing fields are `null`.
pub fn extract(bytes: &[u8]) -> Result<ExtractedMetadata, ExtractionError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| ExtractionError::Terminal(format!("unreadable PDF: {}", e)))?;

    let pages = doc.get_pages().len();
    let info = info_dictionary(&doc);
    let field = |key: &[u8]| -> Value {
        info.and_then(|dict| text_field(&doc, dict, key))
            .map(Value::String)
            .unwrap_or(Value::Null)
    };

    let producer = match field(b"Producer") {
        Value::Null => field(b"Creator"),
        value => value,
    };

    Ok(ExtractedMetadata {
        doc_type: "pdf",
        raw: json!({
            "type": "pdf",
            "pages": pages,
            "author": field(b"Author"),
            "title": field(b"Title"),
            "created": field(b"CreationDate"),
            "producer": producer,
        }),
    })
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    let info = doc.trailer.get(b"Info").ok()?;
    resolve(doc, info).as_dict().ok()
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn text_field(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    let value = resolve(doc, dict.get(key).ok()?);
    let text = match value {
        Object::String(bytes, _) => decode_text(bytes),
        Object::Name(bytes) => decode_text(bytes),
        _ => return None,
    };
    let text = text.trim_end_matches('\0').to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// UTF-16BE when the string carries a byte order mark, Latin-1 otherwise
fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}
