//! Effect suite wiring
//!
//! Builds every controller against one engine set and one store set, sharing
//! a single event channel.

use std::sync::Arc;

use tokio::sync::broadcast;
use tonefx_effects::simulated::{
    SimulatedEqualizer, SimulatedLoudness, SimulatedStrength, SimulatedVolume,
};
use tonefx_effects::{EqualizerEngine, LoudnessEngine, StrengthEngine, VolumeSource};
use tracing::info;

use crate::config::CoreConfig;
use crate::controller::{
    EqualizerController, LoudnessController, StrengthController, VolumeController,
};
use crate::error::{CoreResult, StoreResult};
use crate::events::{Event, EventSender};
use crate::model::{EffectDomain, EqualizerRecord, StrengthConfiguration};
use crate::store::{ConfigStore, JsonFileStore, MemoryStore};

/// Engine handles for every effect
#[derive(Clone)]
pub struct EffectEngines {
    pub equalizer: Arc<dyn EqualizerEngine>,
    pub bass_boost: Arc<dyn StrengthEngine>,
    pub virtualizer: Arc<dyn StrengthEngine>,
    pub loudness: Arc<dyn LoudnessEngine>,
    pub volume: Arc<dyn VolumeSource>,
}

impl EffectEngines {
    /// In-process engines, for hosts without a platform audio session
    pub fn simulated() -> Self {
        Self {
            equalizer: Arc::new(SimulatedEqualizer::new()),
            bass_boost: Arc::new(SimulatedStrength::bass_boost()),
            virtualizer: Arc::new(SimulatedStrength::virtualizer()),
            loudness: Arc::new(SimulatedLoudness::new()),
            volume: Arc::new(SimulatedVolume::default()),
        }
    }
}

/// Configuration stores for every persisted effect
#[derive(Clone)]
pub struct EffectStores {
    pub equalizer: Arc<dyn ConfigStore<EqualizerRecord>>,
    pub bass_boost: Arc<dyn ConfigStore<StrengthConfiguration>>,
    pub virtualizer: Arc<dyn ConfigStore<StrengthConfiguration>>,
}

impl EffectStores {
    /// JSON file stores under the configured data directory
    pub fn open_json(config: &CoreConfig) -> StoreResult<Self> {
        let stores = Self {
            equalizer: Arc::new(JsonFileStore::open(
                config.store_path(EffectDomain::Equalizer)?,
            )),
            bass_boost: Arc::new(JsonFileStore::open(
                config.store_path(EffectDomain::BassBoost)?,
            )),
            virtualizer: Arc::new(JsonFileStore::open(
                config.store_path(EffectDomain::Virtualizer)?,
            )),
        };
        info!("Configuration stores opened in {:?}", config.data_dir()?);
        Ok(stores)
    }

    pub fn in_memory() -> Self {
        Self {
            equalizer: Arc::new(MemoryStore::new()),
            bass_boost: Arc::new(MemoryStore::new()),
            virtualizer: Arc::new(MemoryStore::new()),
        }
    }
}

/// Every effect controller, started together
pub struct EffectSuite {
    pub equalizer: EqualizerController,
    pub bass_boost: StrengthController,
    pub virtualizer: StrengthController,
    pub loudness: LoudnessController,
    pub volume: VolumeController,
    events: EventSender,
}

impl EffectSuite {
    /// Spawn all controllers on the current tokio runtime
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn start(engines: EffectEngines, stores: EffectStores, config: &CoreConfig) -> Self {
        let events = EventSender::new(config.event_capacity);
        let loudness = LoudnessController::new(engines.loudness, config.loudness_target_gain_mb);

        let suite = Self {
            equalizer: EqualizerController::spawn(
                engines.equalizer,
                stores.equalizer,
                loudness.clone(),
                events.clone(),
            ),
            bass_boost: StrengthController::bass_boost(
                engines.bass_boost,
                stores.bass_boost,
                config.strength_range,
                events.clone(),
            ),
            virtualizer: StrengthController::virtualizer(
                engines.virtualizer,
                stores.virtualizer,
                config.strength_range,
                events.clone(),
            ),
            loudness,
            volume: VolumeController::new(engines.volume),
            events,
        };
        info!("Effect suite started");
        suite
    }

    /// Wait until every stateful controller has hydrated
    pub async fn ready(&self) -> CoreResult<()> {
        self.equalizer.ready().await?;
        self.bass_boost.ready().await?;
        self.virtualizer.ready().await?;
        Ok(())
    }

    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn shutdown(&self) {
        self.equalizer.shutdown();
        self.bass_boost.shutdown();
        self.virtualizer.shutdown();
        info!("Effect suite stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::StartupState;

    #[tokio::test]
    async fn test_start_in_memory() {
        let suite = EffectSuite::start(
            EffectEngines::simulated(),
            EffectStores::in_memory(),
            &CoreConfig::default(),
        );
        suite.ready().await.unwrap();

        assert_eq!(suite.equalizer.configuration().presets.len(), 10);
        assert_eq!(suite.bass_boost.domain(), EffectDomain::BassBoost);
        assert_eq!(suite.virtualizer.domain(), EffectDomain::Virtualizer);
        assert_eq!(suite.volume.level().max, 15);
        assert_eq!(suite.loudness.target_gain_mb(), 700);
    }

    #[tokio::test]
    async fn test_json_stores_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let suite = EffectSuite::start(
            EffectEngines::simulated(),
            EffectStores::open_json(&config).unwrap(),
            &config,
        );
        suite.ready().await.unwrap();
        suite.bass_boost.set_strength(420).await.unwrap();
        suite.equalizer.add_custom_preset("Commute").await.unwrap();
        suite.shutdown();
        assert_eq!(suite.equalizer.startup_state(), StartupState::Stopped);

        let restarted = EffectSuite::start(
            EffectEngines::simulated(),
            EffectStores::open_json(&config).unwrap(),
            &config,
        );
        restarted.ready().await.unwrap();
        assert_eq!(restarted.bass_boost.configuration().strength, 420);
        let presets = restarted.equalizer.configuration().presets;
        assert_eq!(presets.len(), 11);
        assert!(presets.iter().any(|p| p.name == "Commute" && p.is_custom));
    }

    #[tokio::test]
    async fn test_events_are_shared() {
        let suite = EffectSuite::start(
            EffectEngines::simulated(),
            EffectStores::in_memory(),
            &CoreConfig::default(),
        );
        suite.ready().await.unwrap();
        let mut events = suite.events();

        suite.virtualizer.change_state(true).await.unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            Event::ConfigurationSaved {
                domain: EffectDomain::Virtualizer
            }
        );
    }
}
