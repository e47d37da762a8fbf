//! Dataset loading

use secdb_classifiers::parse_ground_truth;
use secdb_core::{CommentRecord, Error, Result};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

/// Which record fields carry the text and the stored labels
#[derive(Debug, Clone)]
pub struct InputFields {
    pub text_field: String,
    pub label_field: String,
}

impl Default for InputFields {
    fn default() -> Self {
        Self {
            text_field: "comments".to_string(),
            label_field: "classification".to_string(),
        }
    }
}

/// Split a dataset into entries.
///
/// Accepts a JSON array, a single JSON object, or NDJSON. NDJSON lines that
/// fail to parse are skipped.
pub fn parse_entries(content: &str) -> Vec<Value> {
    let content = content.trim();
    if content.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(items)) => return items,
        Ok(object @ Value::Object(_)) => return vec![object],
        Ok(_) | Err(_) => {}
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(number, line)| match serde_json::from_str::<Value>(line.trim()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(line = number + 1, error = %e, "Skipping unparseable NDJSON line");
                None
            }
        })
        .collect()
}

/// Turn entries into records, keeping at most `limit`.
///
/// Identifiers are positions after the cap. Entries that are not objects
/// become records with no text and no ground truth.
pub fn build_records(entries: Vec<Value>, fields: &InputFields, limit: Option<usize>) -> Vec<CommentRecord> {
    let cap = limit.unwrap_or(usize::MAX);

    entries
        .into_iter()
        .take(cap)
        .enumerate()
        .map(|(identifier, entry)| match entry {
            Value::Object(object) => {
                let text = object
                    .get(&fields.text_field)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let ground_truth = parse_ground_truth(object.get(&fields.label_field));
                CommentRecord::new(identifier, text, ground_truth).with_fields(object)
            }
            other => {
                debug!(identifier, kind = json_kind(&other), "Non-object dataset entry");
                CommentRecord::new(identifier, String::new(), Default::default())
            }
        })
        .collect()
}

/// Read and parse a dataset file
pub fn load_records(path: &Path, fields: &InputFields, limit: Option<usize>) -> Result<Vec<CommentRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::input(format!("Failed to read input {}: {}", path.display(), e))
    })?;

    Ok(build_records(parse_entries(&content), fields, limit))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
