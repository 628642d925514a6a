//! Loudness enhancer controller
//!
//! Stateless: the on/off flag lives in the equalizer record, this controller
//! only drives the engine.

use std::sync::Arc;

use tonefx_effects::{EffectError, LoudnessEngine};
use tracing::debug;

#[derive(Clone)]
pub struct LoudnessController {
    engine: Arc<dyn LoudnessEngine>,
    target_gain_mb: i32,
}

impl LoudnessController {
    pub fn new(engine: Arc<dyn LoudnessEngine>, target_gain_mb: i32) -> Self {
        Self {
            engine,
            target_gain_mb,
        }
    }

    pub fn target_gain_mb(&self) -> i32 {
        self.target_gain_mb
    }

    /// Switch the enhancer and (re)apply the configured target gain
    pub fn set_enabled(&self, enabled: bool) -> Result<(), EffectError> {
        self.engine.set_enabled(enabled)?;
        self.engine.set_target_gain(self.target_gain_mb)?;
        debug!(
            "Loudness enhancer enabled: {} ({} mB)",
            enabled, self.target_gain_mb
        );
        Ok(())
    }
}
