//! Equalizer controller
//!
//! Owns the equalizer configuration: enabled flag, loudness enhancer flag and
//! the preset list with the selected preset. The platform engine is the
//! source of truth for built-in preset levels; custom presets keep their
//! stored levels and are pushed band by band.
//!
//! ## Startup
//!
//! A background task loads the persisted record. An empty record is seeded
//! with the engine's built-in presets (each carrying the current band levels,
//! the first one selected). The selected preset is then applied to the engine
//! exactly once, after which the task keeps watching the store for changes
//! made by other writers.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex, MutexGuard};
use tonefx_effects::{EffectError, EqualizerEngine};
use tracing::{debug, error, info, warn};

use super::loudness::LoudnessController;
use super::report;
use super::supervisor::{Startup, StartupState, Supervisor};
use crate::error::{CoreError, CoreResult, StoreResult};
use crate::events::{Event, EventSender};
use crate::model::{
    format_center_frequency, Band, EffectDomain, EqualizerConfiguration, EqualizerRecord, Preset,
};
use crate::store::{ConfigStore, EqualizerDataStore};

const DOMAIN: EffectDomain = EffectDomain::Equalizer;

pub struct EqualizerController {
    shared: Arc<Shared>,
    supervisor: Supervisor,
}

struct Shared {
    engine: Arc<dyn EqualizerEngine>,
    store: EqualizerDataStore,
    loudness: LoudnessController,
    state: Mutex<EqualizerRecord>,
    configuration: watch::Sender<EqualizerConfiguration>,
    startup: Startup,
    events: EventSender,
}

impl EqualizerController {
    /// Start the controller and its hydration task on the current runtime
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn spawn(
        engine: Arc<dyn EqualizerEngine>,
        store: Arc<dyn ConfigStore<EqualizerRecord>>,
        loudness: LoudnessController,
        events: EventSender,
    ) -> Self {
        let (configuration, _) = watch::channel(EqualizerConfiguration::default());
        let shared = Arc::new(Shared {
            engine,
            store: EqualizerDataStore::new(store),
            loudness,
            state: Mutex::new(EqualizerRecord::default()),
            configuration,
            startup: Startup::new(),
            events,
        });
        let supervisor = Supervisor::spawn("Equalizer", run(shared.clone()));

        Self { shared, supervisor }
    }

    /// Latest published configuration
    pub fn configuration(&self) -> EqualizerConfiguration {
        self.shared.configuration.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EqualizerConfiguration> {
        self.shared.configuration.subscribe()
    }

    pub fn startup_state(&self) -> StartupState {
        self.shared.startup.state()
    }

    /// Wait for hydration to finish
    pub async fn ready(&self) -> CoreResult<()> {
        self.shared.startup.wait_ready().await
    }

    /// Stop the background task; later operations fail with `NotReady`
    pub fn shutdown(&self) {
        self.supervisor.shutdown();
        self.shared.startup.stop();
    }

    /// Select `preset` and apply it to the engine
    pub async fn use_preset(&self, preset: &Preset) -> CoreResult<()> {
        let result = self.shared.use_preset(preset.id).await;
        report(&self.shared.events, DOMAIN, "use_preset", result)
    }

    /// Remove `preset`; the first remaining preset becomes selected
    pub async fn delete_preset(&self, preset: &Preset) -> CoreResult<()> {
        let result = self.shared.delete_preset(preset.id).await;
        report(&self.shared.events, DOMAIN, "delete_preset", result)
    }

    /// Create an unselected custom preset with every band at 0 mB
    pub async fn add_custom_preset(&self, name: &str) -> CoreResult<Preset> {
        let result = self.shared.add_custom_preset(name).await;
        report(&self.shared.events, DOMAIN, "add_custom_preset", result)
    }

    /// Set one band of `preset`, clamped into the band's range
    ///
    /// The engine is written even when `preset` is not the selected one.
    pub async fn on_band_level_changed(
        &self,
        preset: &Preset,
        band: usize,
        level: i32,
    ) -> CoreResult<()> {
        let result = self.shared.set_band_level(preset.id, band, level).await;
        report(&self.shared.events, DOMAIN, "on_band_level_changed", result)
    }

    pub async fn change_state(&self, enabled: bool) -> CoreResult<()> {
        let result = self.shared.change_state(enabled).await;
        report(&self.shared.events, DOMAIN, "change_state", result)
    }

    pub async fn change_loudness_enhancer_state(&self, enabled: bool) -> CoreResult<()> {
        let result = self.shared.change_loudness_state(enabled).await;
        report(
            &self.shared.events,
            DOMAIN,
            "change_loudness_enhancer_state",
            result,
        )
    }
}

async fn run(shared: Arc<Shared>) {
    let mut persisted = shared.store.subscribe();

    if let Err(e) = shared.hydrate().await {
        error!("Failed to hydrate equalizer: {}", e);
        shared.events.send(Event::error(DOMAIN, &e));
        shared.startup.set(StartupState::Failed(e.to_string()));
        return;
    }
    shared.events.send(Event::Hydrated { domain: DOMAIN });
    shared.startup.set(StartupState::Hydrated);

    while persisted.changed().await.is_ok() {
        let mut state = shared.state.lock().await;
        if let Err(e) = shared.sync_external(&mut state).await {
            warn!("Failed to apply external equalizer change: {}", e);
            shared.events.send(Event::error(DOMAIN, &e));
        }
    }
    debug!("Equalizer store closed");
}

impl Shared {
    fn publish(&self, state: &EqualizerRecord) {
        self.configuration.send_replace(state.configuration.clone());
    }

    /// Current engine bands; `zeroed` gives every band level 0 (clamped into range)
    fn read_bands(&self, zeroed: bool) -> Result<Vec<Band>, EffectError> {
        let range = self.engine.band_level_range()?;
        (0..self.engine.band_count()?)
            .map(|band| {
                let level = if zeroed {
                    range.clamp(0)
                } else {
                    self.engine.band_level(band)?
                };
                Ok::<_, EffectError>(Band {
                    level,
                    range,
                    center_frequency: format_center_frequency(self.engine.center_frequency(band)?),
                })
            })
            .collect()
    }

    fn system_presets(&self) -> Result<Vec<Preset>, EffectError> {
        let bands = self.read_bands(false)?;
        (0..self.engine.preset_count()?)
            .map(|index| {
                Ok::<_, EffectError>(Preset {
                    name: self.engine.preset_name(index)?,
                    id: index as u32,
                    bands: bands.clone(),
                    selected: index == 0,
                    is_custom: false,
                    created_at: None,
                })
            })
            .collect()
    }

    /// Write stored band levels to the engine
    fn push_levels(&self, bands: &[Band]) -> Result<(), EffectError> {
        let range = self.engine.band_level_range()?;
        let count = self.engine.band_count()? as usize;
        if bands.len() != count {
            warn!(
                "Preset has {} bands, engine has {}; applying the overlap",
                bands.len(),
                count
            );
        }
        for (index, band) in bands.iter().enumerate().take(count) {
            self.engine
                .set_band_level(index as u16, range.clamp(band.level as i32))?;
        }
        Ok(())
    }

    /// Apply `preset` to the engine and return the bands it should now carry
    fn activate(&self, preset: &Preset) -> Result<Vec<Band>, EffectError> {
        if preset.is_custom {
            self.push_levels(&preset.bands)?;
            return Ok(preset.bands.clone());
        }

        let index = u16::try_from(preset.id).map_err(|_| EffectError::InvalidPreset {
            preset: u16::MAX,
            presets: self.engine.preset_count().unwrap_or(0),
        })?;
        self.engine.use_preset(index)?;
        debug!("Applied built-in preset '{}'", preset.name);
        self.read_bands(false)
    }

    /// Put the engine back to what `state` records
    fn restore_engine(&self, state: &EqualizerRecord) -> Result<(), EffectError> {
        let config = &state.configuration;
        self.engine.set_enabled(config.enabled)?;
        self.loudness.set_enabled(config.loudness_enhancer_enabled)?;
        if let Some(selected) = config.selected_preset() {
            if !selected.is_custom {
                if let Ok(index) = u16::try_from(selected.id) {
                    self.engine.use_preset(index)?;
                }
            }
            self.push_levels(&selected.bands)?;
        }
        Ok(())
    }

    /// Pass a store result through, rolling the engine back to `state` if it failed
    fn confirm_write<T>(&self, state: &EqualizerRecord, result: StoreResult<T>) -> CoreResult<T> {
        result.map_err(|e| {
            if let Err(restore) = self.restore_engine(state) {
                warn!("Failed to restore equalizer engine: {}", restore);
            }
            CoreError::from(e)
        })
    }

    /// Presets with `id` selected and carrying `bands`
    fn selected_presets(presets: &[Preset], id: u32, bands: Vec<Band>) -> Vec<Preset> {
        presets
            .iter()
            .map(|preset| {
                let mut preset = preset.clone();
                preset.selected = preset.id == id;
                if preset.selected {
                    preset.bands = bands.clone();
                }
                preset
            })
            .collect()
    }

    async fn hydrate(&self) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        let mut record = self.store.record().await?;

        if record.configuration.presets.is_empty() {
            record.configuration.presets = self.system_presets()?;
            record.next_preset_id = record
                .next_preset_id
                .max(record.configuration.presets.len() as u32);
            self.store.update_configuration(&record).await?;
            info!(
                "Seeded {} built-in equalizer presets",
                record.configuration.presets.len()
            );
        }
        if record.configuration.normalize_selection() {
            warn!("Stored equalizer selection was inconsistent; repaired");
        }

        self.engine.set_enabled(record.configuration.enabled)?;
        self.loudness
            .set_enabled(record.configuration.loudness_enhancer_enabled)?;

        *state = record;
        if let Some(selected) = state.configuration.selected_preset().cloned() {
            self.apply_preset(&mut state, &selected).await?;
        } else {
            self.publish(&state);
        }

        info!(
            "Equalizer hydrated: enabled={}, {} presets",
            state.configuration.enabled,
            state.configuration.presets.len()
        );
        Ok(())
    }

    /// Apply, select and persist `preset` (looked up by id in `state`)
    async fn apply_preset(&self, state: &mut EqualizerRecord, preset: &Preset) -> CoreResult<()> {
        let bands = self.activate(preset)?;
        let presets = Self::selected_presets(&state.configuration.presets, preset.id, bands);
        let written = self.store.replace_presets(presets).await;
        *state = self.confirm_write(state, written)?;
        self.publish(state);
        Ok(())
    }

    /// Adopt a record written by someone else, touching only what changed
    async fn sync_external(&self, state: &mut EqualizerRecord) -> CoreResult<bool> {
        let persisted = self.store.record().await?;
        if persisted == *state {
            return Ok(false);
        }

        let before = &state.configuration;
        let after = &persisted.configuration;
        if before.enabled != after.enabled {
            self.engine.set_enabled(after.enabled)?;
        }
        if before.loudness_enhancer_enabled != after.loudness_enhancer_enabled {
            self.loudness.set_enabled(after.loudness_enhancer_enabled)?;
        }
        if let Some(selected) = after.selected_preset() {
            let applied = before.selected_preset().map(|p| (p.id, p.levels()));
            if applied != Some((selected.id, selected.levels())) {
                self.activate(selected)?;
            }
        }

        info!("Adopted external equalizer configuration");
        *state = persisted;
        self.publish(state);
        self.events.send(Event::ExternalChange { domain: DOMAIN });
        Ok(true)
    }

    async fn lock_ready(&self) -> CoreResult<MutexGuard<'_, EqualizerRecord>> {
        self.startup.wait_ready().await?;
        let mut state = self.state.lock().await;
        self.sync_external(&mut state).await?;
        Ok(state)
    }

    async fn use_preset(&self, id: u32) -> CoreResult<()> {
        let mut state = self.lock_ready().await?;
        let preset = state
            .configuration
            .preset(id)
            .cloned()
            .ok_or(CoreError::PresetNotFound(id))?;
        self.apply_preset(&mut state, &preset).await
    }

    async fn delete_preset(&self, id: u32) -> CoreResult<()> {
        let mut state = self.lock_ready().await?;
        if state.configuration.preset(id).is_none() {
            return Err(CoreError::PresetNotFound(id));
        }
        if state.configuration.presets.len() == 1 {
            return Err(CoreError::LastPreset);
        }

        let remaining: Vec<Preset> = state
            .configuration
            .presets
            .iter()
            .filter(|preset| preset.id != id)
            .cloned()
            .collect();
        let first = remaining[0].clone();
        let bands = self.activate(&first)?;

        let presets = Self::selected_presets(&remaining, first.id, bands);
        let written = self.store.replace_presets(presets).await;
        *state = self.confirm_write(&state, written)?;
        self.publish(&state);
        info!("Deleted preset {}; '{}' is now selected", id, first.name);
        Ok(())
    }

    async fn add_custom_preset(&self, name: &str) -> CoreResult<Preset> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::BlankPresetName);
        }

        let mut state = self.lock_ready().await?;
        let mut next = state.clone();
        let preset = Preset {
            name: name.to_string(),
            id: next.allocate_preset_id(),
            bands: self.read_bands(true)?,
            selected: false,
            is_custom: true,
            created_at: Some(Utc::now()),
        };

        *state = self.store.add_preset(preset.clone()).await?;
        self.publish(&state);
        info!("Added custom preset '{}' ({})", preset.name, preset.id);
        Ok(preset)
    }

    async fn set_band_level(&self, id: u32, band: usize, level: i32) -> CoreResult<()> {
        let mut state = self.lock_ready().await?;
        let mut preset = state
            .configuration
            .preset(id)
            .cloned()
            .ok_or(CoreError::PresetNotFound(id))?;
        let bands = preset.bands.len();
        let slot = preset
            .bands
            .get_mut(band)
            .ok_or(CoreError::BandOutOfRange { band, bands })?;

        let engine_range = self.engine.band_level_range()?;
        let level = engine_range.clamp(slot.range.clamp(level) as i32);
        let index = u16::try_from(band).map_err(|_| CoreError::BandOutOfRange { band, bands })?;
        self.engine.set_band_level(index, level)?;
        slot.level = level;

        let written = self.store.update_preset(&preset).await;
        *state = self.confirm_write(&state, written)?;
        self.publish(&state);
        debug!("Preset {} band {} = {} mB", id, band, level);
        Ok(())
    }

    async fn change_state(&self, enabled: bool) -> CoreResult<()> {
        let mut state = self.lock_ready().await?;
        self.engine.set_enabled(enabled)?;

        let mut next = state.clone();
        next.configuration.enabled = enabled;
        let written = self.store.update_configuration(&next).await;
        self.confirm_write(&state, written)?;
        *state = next;
        self.publish(&state);
        Ok(())
    }

    async fn change_loudness_state(&self, enabled: bool) -> CoreResult<()> {
        let mut state = self.lock_ready().await?;
        self.loudness.set_enabled(enabled)?;

        let mut next = state.clone();
        next.configuration.loudness_enhancer_enabled = enabled;
        let written = self.store.update_configuration(&next).await;
        self.confirm_write(&state, written)?;
        *state = next;
        self.publish(&state);
        Ok(())
    }
}
