//! Media volume controller
//!
//! Read-only view of the music stream volume. Changes arrive through
//! `on_volume_changed`; every other stream is ignored.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tonefx_effects::{AudioStream, VolumeSource};
use tracing::{trace, warn};

use crate::error::CoreResult;

/// Current and maximum music stream volume
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VolumeLevel {
    pub current: u32,
    pub max: u32,
}

pub struct VolumeController {
    source: Arc<dyn VolumeSource>,
    level: watch::Sender<VolumeLevel>,
}

impl VolumeController {
    pub fn new(source: Arc<dyn VolumeSource>) -> Self {
        let initial = match Self::read(source.as_ref()) {
            Ok(level) => level,
            Err(e) => {
                warn!("Failed to read media volume: {}", e);
                VolumeLevel::default()
            }
        };
        let (level, _) = watch::channel(initial);
        Self { source, level }
    }

    fn read(source: &dyn VolumeSource) -> CoreResult<VolumeLevel> {
        Ok(VolumeLevel {
            current: source.stream_volume(AudioStream::Music)?,
            max: source.max_stream_volume(AudioStream::Music)?,
        })
    }

    /// Query the platform and refresh the published level
    pub fn current_volume_level(&self) -> CoreResult<u32> {
        let level = Self::read(self.source.as_ref())?;
        self.level.send_if_modified(|current| {
            let changed = *current != level;
            *current = level;
            changed
        });
        Ok(level.current)
    }

    pub fn max_volume_level(&self) -> CoreResult<u32> {
        Ok(self.source.max_stream_volume(AudioStream::Music)?)
    }

    /// Handle a platform volume-change notification
    pub fn on_volume_changed(&self, stream: AudioStream, value: u32) {
        if stream != AudioStream::Music {
            trace!("Ignoring volume change on {:?}", stream);
            return;
        }
        self.level.send_if_modified(|level| {
            let current = value.min(level.max);
            let changed = level.current != current;
            level.current = current;
            changed
        });
    }

    pub fn level(&self) -> VolumeLevel {
        *self.level.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<VolumeLevel> {
        self.level.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonefx_effects::simulated::SimulatedVolume;

    fn controller() -> (Arc<SimulatedVolume>, VolumeController) {
        let source = Arc::new(SimulatedVolume::new(7, 15));
        let controller = VolumeController::new(source.clone());
        (source, controller)
    }

    #[test]
    fn test_initial_level() {
        let (_, controller) = controller();
        assert_eq!(controller.level(), VolumeLevel { current: 7, max: 15 });
        assert_eq!(controller.max_volume_level().unwrap(), 15);
    }

    #[test]
    fn test_only_music_stream_is_tracked() {
        let (_, controller) = controller();
        let rx = controller.subscribe();

        controller.on_volume_changed(AudioStream::Ring, 2);
        assert_eq!(controller.level().current, 7);
        assert!(!rx.has_changed().unwrap());

        controller.on_volume_changed(AudioStream::Music, 11);
        assert_eq!(controller.level().current, 11);
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn test_change_is_capped_at_max() {
        let (_, controller) = controller();
        controller.on_volume_changed(AudioStream::Music, 99);
        assert_eq!(controller.level().current, 15);
    }

    #[test]
    fn test_current_volume_level_refreshes() {
        let (source, controller) = controller();
        source.set_stream_volume(AudioStream::Music, 3);
        assert_eq!(controller.current_volume_level().unwrap(), 3);
        assert_eq!(controller.level().current, 3);
    }
}
