//! Main presenter
//!
//! Folds the controllers' configuration streams into one `MainUiState` and
//! forwards user actions to the controllers. One-time notifications (toasts)
//! are delivered on an mpsc channel.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tonefx_core::{AudioStream, CoreError, CoreResult, EffectSuite, Event, Preset};
use tracing::{debug, warn};

use crate::state::{MainUiState, StrengthUiState};

/// User intents handled by the presenter
#[derive(Debug, Clone, PartialEq)]
pub enum MainAction {
    UsePreset(Preset),
    DeletePreset(Preset),
    OnBandLevelChanged {
        preset: Preset,
        band: usize,
        level: i32,
    },
    SetEqualizerSwitchState(bool),
    SetBassBoostSwitchState(bool),
    SetBassBoostStrength(i32),
    SetVirtualizerSwitchState(bool),
    SetVirtualizerStrength(i32),
    SetVolumeLevel(u32),
    SetEnhanceLoudness(bool),
    AddCustomPreset(String),
}

/// One-time notifications for the user
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    PresetAdded(Preset),
    InvalidPresetName,
    Notice(String),
}

pub struct MainPresenter {
    suite: Arc<EffectSuite>,
    state: Arc<watch::Sender<MainUiState>>,
    ui_events: mpsc::UnboundedSender<UiEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl MainPresenter {
    /// Build the presenter and start folding controller state
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(suite: Arc<EffectSuite>) -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (state, _) = watch::channel(MainUiState::default());
        let state = Arc::new(state);
        let (ui_events, ui_rx) = mpsc::unbounded_channel();

        if let Err(e) = suite.volume.current_volume_level() {
            warn!("Could not refresh media volume: {}", e);
        }

        let tasks = vec![
            fold(state.clone(), suite.equalizer.subscribe(), |ui, config| {
                ui.equalizer.presets = config.presets.clone();
                ui.equalizer.switch_state = config.enabled;
                ui.equalizer.loudness_enhancer_checkbox_state = config.loudness_enhancer_enabled;
            }),
            fold(state.clone(), suite.bass_boost.subscribe(), |ui, config| {
                ui.bass_boost = StrengthUiState::from(config);
            }),
            fold(state.clone(), suite.virtualizer.subscribe(), |ui, config| {
                ui.virtualizer = StrengthUiState::from(config);
            }),
            fold(state.clone(), suite.volume.subscribe(), |ui, level| {
                ui.volume.current_level = level.current;
                ui.volume.max_level = level.max;
            }),
            tokio::spawn(forward_errors(suite.events(), ui_events.clone())),
        ];

        let presenter = Self {
            suite,
            state,
            ui_events,
            tasks,
        };
        (presenter, ui_rx)
    }

    pub fn state(&self) -> MainUiState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MainUiState> {
        self.state.subscribe()
    }

    /// Forward an action to its controller
    ///
    /// Failures are also surfaced as a `UiEvent`: validation errors here,
    /// everything else through the suite's error events.
    pub async fn dispatch(&self, action: MainAction) -> CoreResult<()> {
        debug!("Dispatching {:?}", action);
        let suite = &self.suite;

        let result = match action {
            MainAction::UsePreset(preset) => suite.equalizer.use_preset(&preset).await,
            MainAction::DeletePreset(preset) => suite.equalizer.delete_preset(&preset).await,
            MainAction::OnBandLevelChanged {
                preset,
                band,
                level,
            } => {
                suite
                    .equalizer
                    .on_band_level_changed(&preset, band, level)
                    .await
            }
            MainAction::SetEqualizerSwitchState(enabled) => {
                suite.equalizer.change_state(enabled).await
            }
            MainAction::SetBassBoostSwitchState(enabled) => {
                suite.bass_boost.change_state(enabled).await
            }
            MainAction::SetBassBoostStrength(strength) => {
                suite.bass_boost.set_strength(strength).await
            }
            MainAction::SetVirtualizerSwitchState(enabled) => {
                suite.virtualizer.change_state(enabled).await
            }
            MainAction::SetVirtualizerStrength(strength) => {
                suite.virtualizer.set_strength(strength).await
            }
            MainAction::SetVolumeLevel(level) => {
                suite.volume.on_volume_changed(AudioStream::Music, level);
                Ok(())
            }
            MainAction::SetEnhanceLoudness(enabled) => {
                suite.equalizer.change_loudness_enhancer_state(enabled).await
            }
            MainAction::AddCustomPreset(name) => match suite.equalizer.add_custom_preset(&name).await
            {
                Ok(preset) => {
                    self.notify(UiEvent::PresetAdded(preset));
                    Ok(())
                }
                Err(CoreError::BlankPresetName) => {
                    self.notify(UiEvent::InvalidPresetName);
                    Err(CoreError::BlankPresetName)
                }
                Err(e) => Err(e),
            },
        };

        if let Err(e) = &result {
            if e.is_validation() && !matches!(e, CoreError::BlankPresetName) {
                self.notify(UiEvent::Notice(e.to_string()));
            }
        }
        result
    }

    fn notify(&self, event: UiEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.ui_events.send(event);
    }
}

impl Drop for MainPresenter {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Apply every value of `rx` to the UI state, starting with the current one
fn fold<T, F>(
    state: Arc<watch::Sender<MainUiState>>,
    mut rx: watch::Receiver<T>,
    apply: F,
) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&mut MainUiState, &T) + Send + 'static,
{
    let initial = rx.borrow_and_update().clone();
    state.send_modify(|ui| apply(ui, &initial));

    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let value = rx.borrow_and_update().clone();
            state.send_modify(|ui| apply(ui, &value));
        }
    })
}

async fn forward_errors(
    mut events: broadcast::Receiver<Event>,
    ui_events: mpsc::UnboundedSender<UiEvent>,
) {
    loop {
        match events.recv().await {
            Ok(Event::Error { domain, message }) => {
                if ui_events
                    .send(UiEvent::Notice(format!("{domain}: {message}")))
                    .is_err()
                {
                    break;
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("UI missed {} controller events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tonefx_core::{CoreConfig, EffectEngines, EffectStores};

    async fn presenter() -> (MainPresenter, mpsc::UnboundedReceiver<UiEvent>) {
        let suite = EffectSuite::start(
            EffectEngines::simulated(),
            EffectStores::in_memory(),
            &CoreConfig::default(),
        );
        suite.ready().await.unwrap();
        MainPresenter::new(Arc::new(suite))
    }

    async fn wait_for<F>(presenter: &MainPresenter, predicate: F) -> MainUiState
    where
        F: FnMut(&MainUiState) -> bool,
    {
        let mut rx = presenter.subscribe();
        let state = tokio::time::timeout(Duration::from_secs(1), rx.wait_for(predicate))
            .await
            .expect("UI state did not converge")
            .unwrap()
            .clone();
        state
    }

    #[tokio::test]
    async fn test_initial_state_is_folded() {
        let (presenter, _) = presenter().await;
        let state = presenter.state();
        assert_eq!(state.equalizer.presets.len(), 10);
        assert_eq!(state.volume.max_level, 15);
        assert_eq!(state.bass_boost.range.max, 1000);
    }

    #[tokio::test]
    async fn test_use_preset_updates_selection() {
        let (presenter, _) = presenter().await;
        let jazz = presenter.state().equalizer.presets[7].clone();

        presenter
            .dispatch(MainAction::UsePreset(jazz.clone()))
            .await
            .unwrap();

        let state = wait_for(&presenter, |s| {
            s.equalizer.preset(jazz.id).is_some_and(|p| p.selected)
        })
        .await;
        assert_eq!(state.equalizer.presets.iter().filter(|p| p.selected).count(), 1);
    }

    #[tokio::test]
    async fn test_band_change_reaches_state() {
        let (presenter, _) = presenter().await;
        let normal = presenter.state().equalizer.presets[0].clone();

        presenter
            .dispatch(MainAction::OnBandLevelChanged {
                preset: normal,
                band: 0,
                level: 500,
            })
            .await
            .unwrap();

        wait_for(&presenter, |s| s.equalizer.presets[0].bands[0].level == 500).await;
    }

    #[tokio::test]
    async fn test_strength_and_switches() {
        let (presenter, _) = presenter().await;
        presenter
            .dispatch(MainAction::SetBassBoostStrength(1000))
            .await
            .unwrap();
        presenter
            .dispatch(MainAction::SetVirtualizerSwitchState(true))
            .await
            .unwrap();
        presenter
            .dispatch(MainAction::SetEnhanceLoudness(true))
            .await
            .unwrap();

        let state = wait_for(&presenter, |s| {
            s.bass_boost.strength == 1000
                && s.virtualizer.switch_state
                && s.equalizer.loudness_enhancer_checkbox_state
        })
        .await;
        assert!(!state.equalizer.switch_state);
    }

    #[tokio::test]
    async fn test_volume_level() {
        let (presenter, _) = presenter().await;
        presenter
            .dispatch(MainAction::SetVolumeLevel(12))
            .await
            .unwrap();
        wait_for(&presenter, |s| s.volume.current_level == 12).await;
    }

    #[tokio::test]
    async fn test_add_preset_events() {
        let (presenter, mut events) = presenter().await;

        let err = presenter
            .dispatch(MainAction::AddCustomPreset("  ".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::BlankPresetName));
        assert_eq!(events.recv().await.unwrap(), UiEvent::InvalidPresetName);

        presenter
            .dispatch(MainAction::AddCustomPreset("Gym".into()))
            .await
            .unwrap();
        match events.recv().await.unwrap() {
            UiEvent::PresetAdded(preset) => {
                assert_eq!(preset.name, "Gym");
                assert_eq!(preset.id, 10);
            }
            other => panic!("Expected PresetAdded, got {other:?}"),
        }
        wait_for(&presenter, |s| s.equalizer.presets.len() == 11).await;
    }

    #[tokio::test]
    async fn test_validation_failure_becomes_notice() {
        let (presenter, mut events) = presenter().await;
        let normal = presenter.state().equalizer.presets[0].clone();

        let result = presenter
            .dispatch(MainAction::OnBandLevelChanged {
                preset: normal,
                band: 12,
                level: 0,
            })
            .await;
        assert!(result.is_err());
        match events.recv().await.unwrap() {
            UiEvent::Notice(message) => assert!(message.contains("Band 12")),
            other => panic!("Expected Notice, got {other:?}"),
        }
    }
}
