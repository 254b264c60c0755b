//! Last-used input values, kept in a small JSON file.
//!
//! Storage problems never surface to callers: an unreadable file starts an empty store
//! and a failed write is logged and forgotten.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

impl SettingsStore {
    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// `<config dir>/reel/settings.json`, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("reel").join("settings.json"))
    }

    /// Loads the store at `path`. A missing or unreadable file yields an empty store
    /// that will still try to write back to `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read(&path).await {
            Ok(data) => parse(&data).unwrap_or_else(|e| {
                warn!("Ignoring unreadable settings in {}: {e}", path.display());
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Settings unavailable at {}: {e}", path.display());
                BTreeMap::new()
            }
        };

        Self {
            path: Some(path),
            values,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Stores `value` under `key` and writes the store back.
    pub async fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if self.values.get(key) == Some(&value) {
            return;
        }
        self.values.insert(key.to_string(), value);
        self.persist().await;
    }

    pub async fn remove(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.persist().await;
        }
    }

    async fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        if let Err(e) = atomic_write(path, &self.values).await {
            warn!("Could not save settings to {}: {e}", path.display());
        } else {
            debug!("Saved {} setting(s) to {}", self.values.len(), path.display());
        }
    }
}

fn parse(data: &[u8]) -> Result<BTreeMap<String, String>, serde_json::Error> {
    let raw: Map<String, Value> = serde_json::from_slice(data)?;

    // Older files may hold numbers or booleans; keep their canonical string form.
    Ok(raw
        .into_iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k, s)),
            Value::Bool(b) => Some((k, b.to_string())),
            Value::Number(n) => Some((k, n.to_string())),
            _ => None,
        })
        .collect())
}

async fn atomic_write(path: &Path, values: &BTreeMap<String, String>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let data = serde_json::to_vec_pretty(values)?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, data).await?;
    fs::rename(&tmp_path, path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut store = SettingsStore::open(&path).await;
        store.set("bitrate_label", "192 kbps").await;
        store.set("mode_fast", "true").await;

        let reopened = SettingsStore::open(&path).await;
        assert_eq!(reopened.get("bitrate_label"), Some("192 kbps"));
        assert_eq!(reopened.get("mode_fast"), Some("true"));
        assert_eq!(reopened.entries().count(), 2);
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, b"{not json").unwrap();

        let mut store = SettingsStore::open(&path).await;
        assert_eq!(store.entries().count(), 0);

        store.set("url", "https://youtu.be/abc").await;
        assert_eq!(SettingsStore::open(&path).await.get("url"), Some("https://youtu.be/abc"));
    }

    #[tokio::test]
    async fn unwritable_location_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();

        // The parent "directory" is a regular file, so every write fails.
        let mut store = SettingsStore::open(blocker.join("settings.json")).await;
        store.set("url", "x").await;
        assert_eq!(store.get("url"), Some("x"));
    }

    #[test]
    fn non_string_values_are_canonicalised() {
        let values = parse(br#"{"mode_fast":true,"interval":5,"nested":{}}"#).unwrap();
        assert_eq!(values.get("mode_fast").map(String::as_str), Some("true"));
        assert_eq!(values.get("interval").map(String::as_str), Some("5"));
        assert!(!values.contains_key("nested"));
    }
}
