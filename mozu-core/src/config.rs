//! Shared build configuration.
//!
//! A JSON object of named settings consumed by the later build steps. Each
//! entry is `{"value": ..., "type": ...}`.

use std::fs;
use std::path::Path;

use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

/// Setting that receives the generated character table's byte size.
pub const TABLE_SIZE_KEY: &str = "ARG_CHARS_SIZE";

/// Set `key` to `value`, preserving the entry's `type` and every other key.
pub fn set_entry(config: &mut Map<String, Value>, key: &str, value: Value, default_type: &str) {
    let ty = config
        .get(key)
        .and_then(|e| e.get("type"))
        .cloned()
        .unwrap_or_else(|| Value::String(default_type.to_string()));
    config.insert(key.to_string(), json!({ "value": value, "type": ty }));
}

pub fn load(path: impl AsRef<Path>) -> Result<Map<String, Value>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Map::new());
    }
    let s = fs::read_to_string(path).map_err(|e| Error::from(e).in_file(path))?;
    if s.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(&s).map_err(|e| Error::from(e).in_file(path))? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::Config(format!(
            "{} is not a JSON object",
            path.display()
        ))),
    }
}

pub fn save(path: impl AsRef<Path>, config: &Map<String, Value>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let s = serde_json::to_string_pretty(config)?;
    fs::write(path, s).map_err(|e| Error::from(e).in_file(path))?;
    Ok(())
}

/// Record the character table size, creating the file if needed.
pub fn record_table_size(path: impl AsRef<Path>, size: usize) -> Result<()> {
    let path = path.as_ref();
    let mut config = load(path)?;
    set_entry(&mut config, TABLE_SIZE_KEY, json!(size), "u32");
    save(path, &config)?;
    log::info!("{} = {} written to {}", TABLE_SIZE_KEY, size, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generated/config.json");
        record_table_size(&path, 1024).unwrap();

        let config = load(&path).unwrap();
        assert_eq!(
            Value::Object(config),
            json!({ "ARG_CHARS_SIZE": { "value": 1024, "type": "u32" } })
        );
    }

    #[test]
    fn keeps_other_keys_order_and_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"Z_FIRST": {"value": 1, "type": "u8"}, "ARG_CHARS_SIZE": {"value": 0, "type": "u16"}, "A_LAST": {"value": "x", "type": "str"}}"#,
        )
        .unwrap();

        record_table_size(&path, 600).unwrap();
        let config = load(&path).unwrap();
        let keys: Vec<&str> = config.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Z_FIRST", "ARG_CHARS_SIZE", "A_LAST"]);
        assert_eq!(
            config["ARG_CHARS_SIZE"],
            json!({ "value": 600, "type": "u16" })
        );
        assert_eq!(config["A_LAST"]["value"], "x");
    }

    #[test]
    fn rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(record_table_size(&path, 1).is_err());
    }
}
