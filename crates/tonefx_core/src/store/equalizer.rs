//! Equalizer data store
//!
//! Record-level helpers over a `ConfigStore<EqualizerRecord>`. Each helper
//! reads the persisted record, changes one part of it and writes the whole
//! record back, returning what was persisted.

use std::sync::Arc;

use tokio::sync::watch;

use super::ConfigStore;
use crate::error::StoreResult;
use crate::model::{EqualizerRecord, Preset};

#[derive(Clone)]
pub struct EqualizerDataStore {
    store: Arc<dyn ConfigStore<EqualizerRecord>>,
}

impl EqualizerDataStore {
    pub fn new(store: Arc<dyn ConfigStore<EqualizerRecord>>) -> Self {
        Self { store }
    }

    pub fn subscribe(&self) -> watch::Receiver<EqualizerRecord> {
        self.store.subscribe()
    }

    pub async fn record(&self) -> StoreResult<EqualizerRecord> {
        self.store.load().await
    }

    /// Persist the whole record (flags, presets and id counter)
    pub async fn update_configuration(&self, record: &EqualizerRecord) -> StoreResult<()> {
        self.store.write(record.clone()).await
    }

    /// Append a preset and advance the persisted id counter past it
    pub async fn add_preset(&self, preset: Preset) -> StoreResult<EqualizerRecord> {
        self.modify(|record| {
            record.next_preset_id = record.next_preset_id.max(preset.id + 1);
            record.configuration.presets.push(preset);
        })
        .await
    }

    /// Replace the stored preset with the same id
    pub async fn update_preset(&self, preset: &Preset) -> StoreResult<EqualizerRecord> {
        self.modify(|record| {
            for stored in &mut record.configuration.presets {
                if stored.id == preset.id {
                    *stored = preset.clone();
                }
            }
        })
        .await
    }

    pub async fn replace_presets(&self, presets: Vec<Preset>) -> StoreResult<EqualizerRecord> {
        self.modify(|record| record.configuration.presets = presets).await
    }

    async fn modify<F>(&self, change: F) -> StoreResult<EqualizerRecord>
    where
        F: FnOnce(&mut EqualizerRecord),
    {
        let mut record = self.store.load().await?;
        change(&mut record);
        self.store.write(record.clone()).await?;
        Ok(record)
    }
}
