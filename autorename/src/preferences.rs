//! Per-user and per-chat settings persisted to a JSON file.
//!
//! Reads are served from memory. Every write re-serializes the whole map and
//! replaces the file atomically; writes are serialized so the file on disk
//! always reflects one consistent state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::event::MediaKind;
use crate::services::PreferenceStore;
use crate::utils::fs;
use crate::{Error, Result};

/// Settings stored under one Telegram id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Transport reference of the custom thumbnail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaKind>,
}

impl UserPreferences {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// [`PreferenceStore`] backed by a [`DashMap`] and an optional JSON file.
#[derive(Debug)]
pub struct JsonPreferenceStore {
    entries: DashMap<i64, UserPreferences>,
    path: Option<PathBuf>,
    save_lock: Mutex<()>,
}

impl JsonPreferenceStore {
    /// Store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            entries: DashMap::new(),
            path: None,
            save_lock: Mutex::new(()),
        }
    }

    /// Load the store from `path`. A missing file is an empty store.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = DashMap::new();

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let stored: BTreeMap<i64, UserPreferences> = serde_json::from_slice(&bytes)?;
                info!(path = %path.display(), count = stored.len(), "Loaded preferences");
                for (id, prefs) in stored {
                    entries.insert(id, prefs);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No preferences file yet");
            }
            Err(e) => return Err(Error::io_path("reading preferences", &path, e)),
        }

        Ok(Self {
            entries,
            path: Some(path),
            save_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Snapshot of the settings stored under `id`.
    pub fn get(&self, id: i64) -> UserPreferences {
        self.entries
            .get(&id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn read<T>(&self, id: i64, f: impl FnOnce(&UserPreferences) -> Option<T>) -> Option<T> {
        self.entries.get(&id).and_then(|entry| f(entry.value()))
    }

    async fn update(&self, id: i64, f: impl FnOnce(&mut UserPreferences)) -> Result<()> {
        let _guard = self.save_lock.lock().await;

        {
            let mut entry = self.entries.entry(id).or_default();
            f(entry.value_mut());
        }
        self.entries.remove_if(&id, |_, prefs| prefs.is_empty());

        self.persist().await
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let snapshot: BTreeMap<i64, UserPreferences> = self
            .entries
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        let json = serde_json::to_vec_pretty(&snapshot)?;
        fs::write_atomic(path, &json).await
    }
}

#[async_trait]
impl PreferenceStore for JsonPreferenceStore {
    async fn format_template(&self, user_id: i64) -> Result<Option<String>> {
        Ok(self.read(user_id, |p| p.format_template.clone()))
    }

    async fn caption_template(&self, chat_id: i64) -> Result<Option<String>> {
        Ok(self.read(chat_id, |p| p.caption.clone()))
    }

    async fn media_preference(&self, user_id: i64) -> Result<Option<MediaKind>> {
        Ok(self.read(user_id, |p| p.media_type))
    }

    async fn thumbnail(&self, chat_id: i64) -> Result<Option<String>> {
        Ok(self.read(chat_id, |p| p.thumbnail.clone()))
    }

    async fn set_format_template(&self, user_id: i64, template: Option<String>) -> Result<()> {
        self.update(user_id, |p| p.format_template = template).await
    }

    async fn set_caption_template(&self, chat_id: i64, template: Option<String>) -> Result<()> {
        self.update(chat_id, |p| p.caption = template).await
    }

    async fn set_media_preference(&self, user_id: i64, kind: Option<MediaKind>) -> Result<()> {
        self.update(user_id, |p| p.media_type = kind).await
    }

    async fn set_thumbnail(&self, chat_id: i64, reference: Option<String>) -> Result<()> {
        self.update(chat_id, |p| p.thumbnail = reference).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_roundtrip() {
        let store = JsonPreferenceStore::in_memory();
        assert_eq!(store.format_template(1).await.unwrap(), None);

        store
            .set_format_template(1, Some("Show - {episode}".to_string()))
            .await
            .unwrap();
        store.set_media_preference(1, Some(MediaKind::Video)).await.unwrap();

        assert_eq!(
            store.format_template(1).await.unwrap().as_deref(),
            Some("Show - {episode}")
        );
        assert_eq!(store.media_preference(1).await.unwrap(), Some(MediaKind::Video));
        assert_eq!(store.caption_template(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clearing_all_fields_drops_entry() {
        let store = JsonPreferenceStore::in_memory();
        store.set_thumbnail(7, Some("photo-1".to_string())).await.unwrap();
        store.set_thumbnail(7, None).await.unwrap();
        assert!(store.entries.is_empty());
    }

    #[tokio::test]
    async fn test_persisted_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let store = JsonPreferenceStore::load(&path).await.unwrap();
        store
            .set_caption_template(-100, Some("{filename}".to_string()))
            .await
            .unwrap();
        store.set_format_template(5, Some("E{episode}".to_string())).await.unwrap();
        drop(store);

        let reloaded = JsonPreferenceStore::load(&path).await.unwrap();
        assert_eq!(
            reloaded.caption_template(-100).await.unwrap().as_deref(),
            Some("{filename}")
        );
        assert_eq!(reloaded.get(5).format_template.as_deref(), Some("E{episode}"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        tokio::fs::write(&path, b"{ nope").await.unwrap();

        let err = JsonPreferenceStore::load(&path).await.unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
