//! JSON file store
//!
//! # Storage Locations
//! - Linux: `~/.config/tonefx/<domain>.json`
//! - Windows: `%APPDATA%\tonefx\<domain>.json`
//! - macOS: `~/Library/Application Support/tonefx/<domain>.json`

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info};

use super::{ConfigStore, Record};
use crate::error::StoreResult;

/// Store persisting one record as a pretty-printed JSON file
pub struct JsonFileStore<R: Record> {
    path: PathBuf,
    sender: watch::Sender<R>,
    /// Serialises writers so temp files never interleave
    write_lock: Mutex<()>,
}

impl<R: Record> JsonFileStore<R> {
    /// Open the store at `path`, loading the existing record if there is one
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let record = Self::read_record(&path);
        let (sender, _) = watch::channel(record);
        Self {
            path,
            sender,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file and publish its record if it changed on disk
    ///
    /// Returns `true` when subscribers were notified.
    pub fn reload(&self) -> bool {
        let record = Self::read_record(&self.path);
        self.sender.send_if_modified(|current| {
            if *current == record {
                false
            } else {
                *current = record;
                true
            }
        })
    }

    fn read_record(path: &Path) -> R {
        read_json_or_default(path, "configuration")
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Parse the JSON file at `path`, or return the default if missing/corrupt
///
/// `what` names the file in log lines.
pub(crate) fn read_json_or_default<T>(path: &Path, what: &str) -> T
where
    T: DeserializeOwned + Default,
{
    if path.exists() {
        match fs::File::open(path) {
            Ok(file) => match serde_json::from_reader(file) {
                Ok(value) => {
                    info!("Loaded {} from {:?}", what, path);
                    return value;
                }
                Err(e) => {
                    error!("Failed to parse {} {:?}: {}", what, path, e);
                }
            },
            Err(e) => {
                error!("Failed to open {} {:?}: {}", what, path, e);
            }
        }
    }

    debug!("Using default {} for {:?}", what, path);
    T::default()
}

#[async_trait]
impl<R: Record> ConfigStore<R> for JsonFileStore<R> {
    async fn load(&self) -> StoreResult<R> {
        Ok(self.sender.borrow().clone())
    }

    fn subscribe(&self) -> watch::Receiver<R> {
        self.sender.subscribe()
    }

    async fn write(&self, record: R) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        // Ensure directory exists
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(&record)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!("Configuration saved to {:?}", self.path);
        self.sender.send_replace(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EqualizerRecord, StrengthConfiguration};

    #[tokio::test]
    async fn test_missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::<StrengthConfiguration>::open(dir.path().join("bass_boost.json"));

        assert_eq!(store.load().await.unwrap(), StrengthConfiguration::default());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_write_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("virtualizer.json");

        let store = JsonFileStore::<StrengthConfiguration>::open(&path);
        store
            .write(StrengthConfiguration {
                strength: 640,
                enabled: true,
                ..Default::default()
            })
            .await
            .unwrap();
        drop(store);

        let reopened = JsonFileStore::<StrengthConfiguration>::open(&path);
        let record = reopened.load().await.unwrap();
        assert_eq!(record.strength, 640);
        assert!(record.enabled);
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("equalizer.json");
        let store = JsonFileStore::<EqualizerRecord>::open(&path);

        store.write(EqualizerRecord::default()).await.unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("equalizer.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("equalizer.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::<EqualizerRecord>::open(&path);
        assert_eq!(store.load().await.unwrap(), EqualizerRecord::default());
    }

    #[tokio::test]
    async fn test_reload_publishes_external_edit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bass_boost.json");
        let store = JsonFileStore::<StrengthConfiguration>::open(&path);
        let mut rx = store.subscribe();

        assert!(!store.reload());

        std::fs::write(&path, r#"{"strength": 250, "enabled": true}"#).unwrap();
        assert!(store.reload());

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().strength, 250);
    }
}
