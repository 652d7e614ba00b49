//! Settings store persisted as a flat JSON object

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::{AppError, AppResult};
use crate::generator::publish::write_atomic_blocking;
use crate::host::SettingsStore;

/// Key/value settings kept in memory and written through to `settings.json`
pub struct JsonSettingsStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonSettingsStore {
    /// Load the store; a missing or unreadable file starts empty
    pub fn open(path: &Path) -> Self {
        let values = match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Map<String, Value>>(&contents) {
                Ok(values) => values,
                Err(e) => {
                    warn!("Ignoring corrupt settings file {}: {}", path.display(), e);
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        };

        Self {
            path: path.to_path_buf(),
            values: Mutex::new(values),
        }
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> AppResult<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| AppError::internal("settings lock poisoned"))?;
        values.insert(key.to_string(), value);
        let contents = serde_json::to_vec_pretty(&*values)?;
        write_atomic_blocking(&self.path, &contents)
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn set_string(&self, key: &str, value: &str) -> AppResult<()> {
        self.set(key, Value::String(value.to_string()))
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn set_int(&self, key: &str, value: i64) -> AppResult<()> {
        self.set(key, Value::from(value))
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            _ => None,
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> AppResult<()> {
        self.set(key, Value::Bool(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = JsonSettingsStore::open(&path);
        store.set_bool("iptv_simple_restart", true).unwrap();
        store.set_int("last_refreshed", 1_700_000_000).unwrap();

        let reopened = JsonSettingsStore::open(&path);
        assert_eq!(reopened.get_bool("iptv_simple_restart"), Some(true));
        assert_eq!(reopened.get_int("last_refreshed"), Some(1_700_000_000));
        assert_eq!(reopened.get_string("missing"), None);
    }

    #[test]
    fn test_string_values_are_coerced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"flag": "true", "count": "42"}"#).unwrap();

        let store = JsonSettingsStore::open(&path);
        assert_eq!(store.get_bool("flag"), Some(true));
        assert_eq!(store.get_int("count"), Some(42));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonSettingsStore::open(&path);
        assert_eq!(store.get_int("last_refreshed"), None);
    }
}
