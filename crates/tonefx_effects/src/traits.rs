//! Effect Engine Traits
//!
//! Defines the interface that every platform effect adapter must provide.

use serde::{Deserialize, Serialize};

use crate::error::EffectError;

/// Inclusive range of band levels, in millibels
///
/// Reversed bounds are swapped, both in `new` and when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawLevelRange")]
pub struct LevelRange {
    pub min: i16,
    pub max: i16,
}

#[derive(Deserialize)]
struct RawLevelRange {
    min: i16,
    max: i16,
}

impl From<RawLevelRange> for LevelRange {
    fn from(raw: RawLevelRange) -> Self {
        Self::new(raw.min, raw.max)
    }
}

impl LevelRange {
    pub fn new(min: i16, max: i16) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Clamp an arbitrary level into this range
    pub fn clamp(&self, level: i32) -> i16 {
        // Fields are public, so the bounds may still be reversed here
        let (low, high) = (self.min.min(self.max), self.min.max(self.max));
        level.clamp(low as i32, high as i32) as i16
    }

    pub fn contains(&self, level: i16) -> bool {
        (self.min..=self.max).contains(&level)
    }
}

impl Default for LevelRange {
    fn default() -> Self {
        Self::new(-1500, 1500)
    }
}

/// System audio stream whose volume can be observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioStream {
    Music,
    Ring,
    Alarm,
    Notification,
    System,
    VoiceCall,
}

/// Multi-band equalizer engine
///
/// Band and preset indices are positional: band `0` is the lowest frequency
/// band, preset `n` is the n-th platform preset.
pub trait EqualizerEngine: Send + Sync {
    /// Enable or disable processing
    fn set_enabled(&self, enabled: bool) -> Result<(), EffectError>;

    /// Number of frequency bands the engine exposes
    fn band_count(&self) -> Result<u16, EffectError>;

    /// Current gain of a band in millibels
    fn band_level(&self, band: u16) -> Result<i16, EffectError>;

    /// Set the gain of a band in millibels
    fn set_band_level(&self, band: u16, level: i16) -> Result<(), EffectError>;

    /// Center frequency of a band in milliHertz
    fn center_frequency(&self, band: u16) -> Result<u32, EffectError>;

    /// Gain range supported by every band
    fn band_level_range(&self) -> Result<LevelRange, EffectError>;

    /// Number of built-in presets
    fn preset_count(&self) -> Result<u16, EffectError>;

    /// Display name of a built-in preset
    fn preset_name(&self, preset: u16) -> Result<String, EffectError>;

    /// Switch the engine to a built-in preset, overwriting every band level
    fn use_preset(&self, preset: u16) -> Result<(), EffectError>;
}

/// Effect driven by a single strength parameter (bass boost, virtualizer)
pub trait StrengthEngine: Send + Sync {
    /// Name of the effect (e.g., "BassBoost", "Virtualizer")
    fn name(&self) -> &'static str;

    fn set_enabled(&self, enabled: bool) -> Result<(), EffectError>;

    /// Set the effect strength, 0 - 1000
    fn set_strength(&self, strength: u16) -> Result<(), EffectError>;
}

/// Loudness enhancer engine
pub trait LoudnessEngine: Send + Sync {
    fn set_enabled(&self, enabled: bool) -> Result<(), EffectError>;

    /// Target gain in millibels
    fn set_target_gain(&self, gain_mb: i32) -> Result<(), EffectError>;
}

/// Read-only access to system stream volumes
pub trait VolumeSource: Send + Sync {
    /// Current volume index of a stream
    fn stream_volume(&self, stream: AudioStream) -> Result<u32, EffectError>;

    /// Maximum volume index of a stream
    fn max_stream_volume(&self, stream: AudioStream) -> Result<u32, EffectError>;
}
