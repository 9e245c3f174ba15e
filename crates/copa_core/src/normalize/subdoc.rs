//! Prefixed-field grouping (`pass_angle`, `pass_length` → `pass: {angle, length}`).

use serde_json::{Map, Value};

use crate::literal::coerce;
use crate::Document;

/// Copy every `<prefix>_<suffix>` field of `event` into `event[prefix][suffix]`.
///
/// An existing mapping under `prefix` is the base; any other value there is
/// replaced. Source fields stay where they are. When two writes target the
/// same suffix the later field in iteration order wins. Nothing is written
/// unless the resulting subdocument has at least one entry.
pub fn extract_subdocument(event: &mut Document, prefix: &str) {
    let mut base = match event.get(prefix) {
        Some(Value::Object(existing)) => existing.clone(),
        _ => Map::new(),
    };

    let field_prefix = format!("{prefix}_");
    for (key, value) in event.iter() {
        if let Some(suffix) = key.strip_prefix(&field_prefix) {
            base.insert(suffix.to_string(), coerce(value.clone()));
        }
    }

    if !base.is_empty() {
        event.insert(prefix.to_string(), Value::Object(base));
    }
}
