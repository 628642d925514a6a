//! Core Error Types

use thiserror::Error;
use tonefx_effects::EffectError;

/// Errors from a configuration store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Could not determine the configuration directory")]
    NoConfigDirectory,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by controller operations
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Preset name must not be blank")]
    BlankPresetName,

    #[error("Cannot delete the last preset")]
    LastPreset,

    #[error("Preset not found: {0}")]
    PresetNotFound(u32),

    #[error("Band {band} out of range (preset has {bands} bands)")]
    BandOutOfRange { band: usize, bands: usize },

    #[error("Controller is not ready: {0}")]
    NotReady(String),

    #[error("Effect engine error: {0}")]
    Effect(#[from] EffectError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Whether the error came from validating caller input (nothing was touched)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::BlankPresetName
                | CoreError::LastPreset
                | CoreError::PresetNotFound(_)
                | CoreError::BandOutOfRange { .. }
        )
    }
}

/// Result type alias for controller operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
