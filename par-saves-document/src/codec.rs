//! On-disk JSON format for profile documents.
//!
//! Documents are written as UTF-8 JSON, indented with tabs, with object keys
//! in sorted order and a trailing newline. Empty input decodes to an empty
//! document rather than a parse error.

use serde::{Serialize, Serializer};
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;

use crate::{CodecError, DocumentTree, Value};

const INDENT: &[u8] = b"\t";

/// Serializes an object with its keys in sorted order, recursively.
///
/// `serde_json::Map` iterates in insertion order when the `preserve_order`
/// feature is enabled anywhere in the dependency graph, so ordering is
/// imposed here rather than inherited from the map.
struct SortedMap<'a>(&'a DocumentTree);

impl Serialize for SortedMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let sorted: BTreeMap<&String, &Value> = self.0.iter().collect();
        serializer.collect_map(sorted.into_iter().map(|(key, value)| (key, Sorted(value))))
    }
}

struct Sorted<'a>(&'a Value);

impl Serialize for Sorted<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => SortedMap(map).serialize(serializer),
            Value::Array(items) => serializer.collect_seq(items.iter().map(Sorted)),
            other => other.serialize(serializer),
        }
    }
}

/// Encode a document as tab-indented, key-sorted JSON.
pub fn encode_pretty(tree: &DocumentTree) -> Result<String, CodecError> {
    let mut buf = Vec::with_capacity(128);
    let formatter = PrettyFormatter::with_indent(INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    SortedMap(tree).serialize(&mut serializer)?;
    buf.push(b'\n');
    // serde_json only ever emits valid UTF-8
    let text = String::from_utf8(buf).map_err(|e| e.utf8_error())?;
    Ok(text)
}

/// Decode file contents into a document.
///
/// Empty or whitespace-only input yields an empty document.
pub fn decode_document(bytes: &[u8]) -> Result<DocumentTree, CodecError> {
    let text = std::str::from_utf8(bytes)?;
    if text.trim().is_empty() {
        return Ok(DocumentTree::new());
    }
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(CodecError::NotAnObject {
            found: json_type_name(&other),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
