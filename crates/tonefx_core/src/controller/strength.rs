//! Bass boost and virtualizer controllers
//!
//! Both effects are a single strength parameter plus an on/off flag, so one
//! controller type serves either engine.

use std::sync::Arc;

use tokio::sync::{watch, Mutex, MutexGuard};
use tonefx_effects::{EffectError, StrengthEngine};
use tracing::{debug, error, info, warn};

use super::supervisor::{Startup, StartupState, Supervisor};
use super::report;
use crate::error::{CoreError, CoreResult, StoreResult};
use crate::events::{Event, EventSender};
use crate::model::{EffectDomain, StrengthConfiguration, StrengthRange};
use crate::store::ConfigStore;

pub struct StrengthController {
    shared: Arc<Shared>,
    supervisor: Supervisor,
}

pub type BassBoostController = StrengthController;
pub type VirtualizerController = StrengthController;

struct Shared {
    domain: EffectDomain,
    engine: Arc<dyn StrengthEngine>,
    store: Arc<dyn ConfigStore<StrengthConfiguration>>,
    range: StrengthRange,
    state: Mutex<StrengthConfiguration>,
    configuration: watch::Sender<StrengthConfiguration>,
    startup: Startup,
    events: EventSender,
}

impl StrengthController {
    /// Start a controller and its hydration task on the current runtime
    pub fn spawn(
        domain: EffectDomain,
        engine: Arc<dyn StrengthEngine>,
        store: Arc<dyn ConfigStore<StrengthConfiguration>>,
        range: StrengthRange,
        events: EventSender,
    ) -> Self {
        let initial = StrengthConfiguration {
            range,
            ..Default::default()
        };
        let (configuration, _) = watch::channel(initial.clone());
        let name = engine.name();

        let shared = Arc::new(Shared {
            domain,
            engine,
            store,
            range,
            state: Mutex::new(initial),
            configuration,
            startup: Startup::new(),
            events,
        });
        let supervisor = Supervisor::spawn(name, run(shared.clone()));

        Self { shared, supervisor }
    }

    pub fn bass_boost(
        engine: Arc<dyn StrengthEngine>,
        store: Arc<dyn ConfigStore<StrengthConfiguration>>,
        range: StrengthRange,
        events: EventSender,
    ) -> Self {
        Self::spawn(EffectDomain::BassBoost, engine, store, range, events)
    }

    pub fn virtualizer(
        engine: Arc<dyn StrengthEngine>,
        store: Arc<dyn ConfigStore<StrengthConfiguration>>,
        range: StrengthRange,
        events: EventSender,
    ) -> Self {
        Self::spawn(EffectDomain::Virtualizer, engine, store, range, events)
    }

    pub fn domain(&self) -> EffectDomain {
        self.shared.domain
    }

    pub fn configuration(&self) -> StrengthConfiguration {
        self.shared.configuration.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StrengthConfiguration> {
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

    pub async fn change_state(&self, enabled: bool) -> CoreResult<()> {
        let result = self.shared.change_state(enabled).await;
        report(&self.shared.events, self.shared.domain, "change_state", result)
    }

    /// Set the strength, clamped into the configured range
    pub async fn set_strength(&self, strength: i32) -> CoreResult<()> {
        let result = self.shared.set_strength(strength).await;
        report(&self.shared.events, self.shared.domain, "set_strength", result)
    }
}

async fn run(shared: Arc<Shared>) {
    let mut persisted = shared.store.subscribe();

    if let Err(e) = shared.hydrate().await {
        error!("Failed to hydrate {}: {}", shared.domain, e);
        shared.events.send(Event::error(shared.domain, &e));
        shared.startup.set(StartupState::Failed(e.to_string()));
        return;
    }
    shared.events.send(Event::Hydrated {
        domain: shared.domain,
    });
    shared.startup.set(StartupState::Hydrated);

    while persisted.changed().await.is_ok() {
        let mut state = shared.state.lock().await;
        if let Err(e) = shared.sync_external(&mut state).await {
            warn!("Failed to apply external {} change: {}", shared.domain, e);
            shared.events.send(Event::error(shared.domain, &e));
        }
    }
    debug!("{} store closed", shared.domain);
}

impl Shared {
    fn within_range(&self, persisted: StrengthConfiguration) -> StrengthConfiguration {
        StrengthConfiguration {
            strength: self.range.clamp(persisted.strength as i32),
            enabled: persisted.enabled,
            range: self.range,
        }
    }

    fn publish(&self, state: &StrengthConfiguration) {
        self.configuration.send_replace(state.clone());
    }

    /// Put the engine back to what `state` records
    fn restore_engine(&self, state: &StrengthConfiguration) -> Result<(), EffectError> {
        self.engine.set_enabled(state.enabled)?;
        self.engine.set_strength(state.strength)
    }

    /// Pass a store result through, rolling the engine back to `state` if it failed
    fn confirm_write<T>(
        &self,
        state: &StrengthConfiguration,
        result: StoreResult<T>,
    ) -> CoreResult<T> {
        result.map_err(|e| {
            if let Err(restore) = self.restore_engine(state) {
                warn!("Failed to restore {} engine: {}", self.domain, restore);
            }
            CoreError::from(e)
        })
    }

    async fn hydrate(&self) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        let config = self.within_range(self.store.load().await?);

        self.engine.set_enabled(config.enabled)?;
        self.engine.set_strength(config.strength)?;

        info!(
            "{} hydrated: enabled={}, strength={}",
            self.domain, config.enabled, config.strength
        );
        *state = config;
        self.publish(&state);
        Ok(())
    }

    /// Adopt a record written by someone else, touching only changed parameters
    async fn sync_external(&self, state: &mut StrengthConfiguration) -> CoreResult<bool> {
        let persisted = self.within_range(self.store.load().await?);
        if persisted == *state {
            return Ok(false);
        }

        if persisted.enabled != state.enabled {
            self.engine.set_enabled(persisted.enabled)?;
        }
        if persisted.strength != state.strength {
            self.engine.set_strength(persisted.strength)?;
        }

        info!("Adopted external {} configuration", self.domain);
        *state = persisted;
        self.publish(state);
        self.events.send(Event::ExternalChange {
            domain: self.domain,
        });
        Ok(true)
    }

    async fn lock_ready(&self) -> CoreResult<MutexGuard<'_, StrengthConfiguration>> {
        self.startup.wait_ready().await?;
        let mut state = self.state.lock().await;
        self.sync_external(&mut state).await?;
        Ok(state)
    }

    async fn change_state(&self, enabled: bool) -> CoreResult<()> {
        let mut state = self.lock_ready().await?;
        self.engine.set_enabled(enabled)?;

        let next = StrengthConfiguration {
            enabled,
            ..state.clone()
        };
        let written = self.store.write(next.clone()).await;
        self.confirm_write(&state, written)?;
        *state = next;
        self.publish(&state);
        Ok(())
    }

    async fn set_strength(&self, strength: i32) -> CoreResult<()> {
        let mut state = self.lock_ready().await?;
        let strength = self.range.clamp(strength);
        self.engine.set_strength(strength)?;

        let next = StrengthConfiguration {
            strength,
            ..state.clone()
        };
        let written = self.store.write(next.clone()).await;
        self.confirm_write(&state, written)?;
        *state = next;
        self.publish(&state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::store::MemoryStore;
    use std::time::Duration;
    use tonefx_effects::simulated::SimulatedStrength;

    struct Fixture {
        engine: Arc<SimulatedStrength>,
        store: Arc<MemoryStore<StrengthConfiguration>>,
        events: EventSender,
        controller: StrengthController,
    }

    fn fixture(persisted: StrengthConfiguration) -> Fixture {
        let engine = Arc::new(SimulatedStrength::bass_boost());
        let store = Arc::new(MemoryStore::with_record(persisted));
        let events = EventSender::default();
        let controller = StrengthController::bass_boost(
            engine.clone(),
            store.clone(),
            StrengthRange::default(),
            events.clone(),
        );
        Fixture {
            engine,
            store,
            events,
            controller,
        }
    }

    fn persisted(strength: u16, enabled: bool) -> StrengthConfiguration {
        StrengthConfiguration {
            strength,
            enabled,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_hydration_applies_persisted_record() {
        let f = fixture(persisted(650, true));
        f.controller.ready().await.unwrap();

        assert_eq!(f.controller.startup_state(), StartupState::Hydrated);
        assert!(f.engine.is_enabled());
        assert_eq!(f.engine.strength(), 650);
        assert_eq!(f.controller.configuration().strength, 650);
        assert_eq!(f.controller.domain(), EffectDomain::BassBoost);
    }

    #[tokio::test]
    async fn test_change_state_is_idempotent_but_persists() {
        let f = fixture(persisted(0, false));
        f.controller.ready().await.unwrap();

        f.controller.change_state(true).await.unwrap();
        f.controller.change_state(true).await.unwrap();

        assert!(f.controller.configuration().enabled);
        assert!(f.engine.is_enabled());
        assert_eq!(f.store.writes(), 2);
    }

    #[tokio::test]
    async fn test_strength_is_clamped() {
        let f = fixture(persisted(0, true));
        f.controller.ready().await.unwrap();

        f.controller.set_strength(5000).await.unwrap();
        assert_eq!(f.engine.strength(), 1000);
        assert_eq!(f.store.snapshot().strength, 1000);

        f.controller.set_strength(-20).await.unwrap();
        assert_eq!(f.controller.configuration().strength, 0);
    }

    #[tokio::test]
    async fn test_out_of_range_record_is_clamped_on_hydration() {
        let f = fixture(persisted(4000, false));
        f.controller.ready().await.unwrap();
        assert_eq!(f.engine.strength(), 1000);
        assert_eq!(f.controller.configuration().strength, 1000);
    }

    #[tokio::test]
    async fn test_store_failure_leaves_state_unchanged() {
        let f = fixture(persisted(300, false));
        f.controller.ready().await.unwrap();
        let mut events = f.events.subscribe();

        f.store.set_fail_writes(true);
        let err = f.controller.set_strength(900).await.unwrap_err();
        assert!(matches!(err, CoreError::Store(_)));
        assert_eq!(f.controller.configuration().strength, 300);
        assert_eq!(f.store.snapshot().strength, 300);

        let event = events.recv().await.unwrap();
        assert!(matches!(
            event,
            Event::Error {
                domain: EffectDomain::BassBoost,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_store_failure_rolls_engine_back() {
        let f = fixture(persisted(300, false));
        f.controller.ready().await.unwrap();
        f.store.set_fail_writes(true);

        assert!(f.controller.change_state(true).await.is_err());
        assert_eq!(f.engine.is_enabled(), f.controller.configuration().enabled);

        assert!(f.controller.set_strength(900).await.is_err());
        assert_eq!(f.engine.strength(), 300);

        f.store.set_fail_writes(false);
        f.controller.set_strength(500).await.unwrap();
        assert!(!f.engine.is_enabled());
        assert_eq!(f.engine.strength(), 500);
    }

    #[tokio::test]
    async fn test_engine_failure_skips_persistence() {
        let f = fixture(persisted(300, false));
        f.controller.ready().await.unwrap();

        f.engine.set_failing(true);
        let err = f.controller.change_state(true).await.unwrap_err();
        assert!(matches!(err, CoreError::Effect(_)));
        assert_eq!(f.store.writes(), 0);
        assert!(!f.controller.configuration().enabled);
    }

    #[tokio::test]
    async fn test_external_change_applies_only_dirty_fields() {
        let f = fixture(persisted(300, false));
        f.controller.ready().await.unwrap();
        let mut rx = f.controller.subscribe();
        let writes = f.engine.writes();

        f.store.write(persisted(300, true)).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), rx.changed())
            .await
            .unwrap()
            .unwrap();

        assert!(f.controller.configuration().enabled);
        assert!(f.engine.is_enabled());
        assert_eq!(f.engine.writes(), writes + 1);
    }

    #[tokio::test]
    async fn test_hydration_failure_is_terminal() {
        let engine = Arc::new(SimulatedStrength::virtualizer());
        engine.release();
        let controller = StrengthController::virtualizer(
            engine,
            Arc::new(MemoryStore::new()),
            StrengthRange::default(),
            EventSender::default(),
        );

        assert!(matches!(
            controller.ready().await,
            Err(CoreError::NotReady(_))
        ));
        assert!(matches!(
            controller.change_state(true).await,
            Err(CoreError::NotReady(_))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_rejects_operations() {
        let f = fixture(persisted(0, false));
        f.controller.ready().await.unwrap();
        f.controller.shutdown();

        assert_eq!(f.controller.startup_state(), StartupState::Stopped);
        assert!(f.controller.set_strength(10).await.is_err());
    }
}
