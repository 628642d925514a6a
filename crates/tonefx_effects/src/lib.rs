//! ToneFX Effects - Effect Engine Adapters
//!
//! This crate defines the contract between ToneFX and the host platform's
//! audio-effect primitives:
//! - Multi-band equalizer with platform presets
//! - Bass boost and stereo virtualizer (strength based effects)
//! - Loudness enhancer
//! - System stream volume
//!
//! # Architecture
//!
//! The platform performs all signal processing. Each adapter implements one
//! of the traits in this crate, giving the controllers in `tonefx_core` a
//! uniform, synchronous interface for capability queries and parameter writes.
//!
//! The `simulated` module provides in-process engines that behave like a
//! strict platform implementation. They back the shell binary and the tests.

mod error;
mod presets;
pub mod simulated;
mod traits;

pub use error::EffectError;
pub use presets::{SystemPreset, SYSTEM_PRESETS};
pub use traits::{
    AudioStream, EqualizerEngine, LevelRange, LoudnessEngine, StrengthEngine, VolumeSource,
};
