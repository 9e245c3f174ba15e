//! Input file reading.
//!
//! Accepts either a bare list of event records or an object whose `events` key
//! holds that list. Elements that are not objects are skipped.

use copa_core::Document;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::LoadError;

pub const EVENTS_KEY: &str = "events";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputRecords {
    pub records: Vec<Document>,
    /// Elements dropped because they were not JSON objects.
    pub skipped: usize,
}

pub fn read_records(path: &Path) -> Result<InputRecords, LoadError> {
    if !path.is_file() {
        return Err(LoadError::InputNotFound {
            path: path.display().to_string(),
        });
    }

    let content = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    let input = records_from_value(value)?;

    log::info!(
        "Read {} records from {}",
        input.records.len(),
        path.display()
    );
    Ok(input)
}

pub fn records_from_value(value: Value) -> Result<InputRecords, LoadError> {
    let elements = match value {
        Value::Array(elements) => elements,
        Value::Object(mut map) => match map.remove(EVENTS_KEY) {
            Some(Value::Array(elements)) => elements,
            Some(other) => {
                return Err(LoadError::UnsupportedShape {
                    found: format!("'{EVENTS_KEY}' holding {}", kind(&other)),
                })
            }
            None => {
                return Err(LoadError::UnsupportedShape {
                    found: format!("object without '{EVENTS_KEY}'"),
                })
            }
        },
        other => {
            return Err(LoadError::UnsupportedShape {
                found: kind(&other).to_string(),
            })
        }
    };

    let mut input = InputRecords::default();
    for (position, element) in elements.into_iter().enumerate() {
        match element {
            Value::Object(record) => input.records.push(record),
            other => {
                log::warn!(
                    "Skipping input element {position}: expected an object, found {}",
                    kind(&other)
                );
                input.skipped += 1;
            }
        }
    }
    Ok(input)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_list_shape() {
        let input = records_from_value(json!([{"id": "a"}, {"id": "b"}])).unwrap();
        assert_eq!(input.records.len(), 2);
        assert_eq!(input.skipped, 0);
    }

    #[test]
    fn test_events_wrapper_shape() {
        let input = records_from_value(json!({"events": [{"id": "a"}], "meta": 1})).unwrap();
        assert_eq!(input.records.len(), 1);
        assert_eq!(input.records[0]["id"], json!("a"));
    }

    #[test]
    fn test_unsupported_shapes() {
        for value in [
            json!("events"),
            json!(42),
            json!({"records": []}),
            json!({"events": {"id": "a"}}),
        ] {
            let err = records_from_value(value).unwrap_err();
            assert!(matches!(err, LoadError::UnsupportedShape { .. }));
            assert!(err.is_configuration_error());
        }
    }

    #[test]
    fn test_non_object_elements_are_skipped() {
        let input = records_from_value(json!([{"id": "a"}, 3, null, "x", {"id": "b"}])).unwrap();
        assert_eq!(input.records.len(), 2);
        assert_eq!(input.skipped, 3);
        assert_eq!(input.records[1]["id"], json!("b"));
    }

    #[test]
    fn test_read_records_from_file() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(br#"[{"id": "e1", "type": "Pass"}]"#)?;

        let input = read_records(file.path())?;
        assert_eq!(input.records.len(), 1);
        Ok(())
    }

    #[test]
    fn test_missing_and_invalid_files() -> anyhow::Result<()> {
        let err = read_records(Path::new("/no/such/copa32_events.json")).unwrap_err();
        assert!(matches!(err, LoadError::InputNotFound { .. }));

        let mut file = NamedTempFile::new()?;
        file.write_all(b"[{\"id\": ")?;
        let err = read_records(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidJson(_)));
        assert!(err.is_configuration_error());
        Ok(())
    }
}
