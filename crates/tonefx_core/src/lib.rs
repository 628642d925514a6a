//! ToneFX Core - Effect Controllers
//!
//! This crate reconciles the audio effect configuration between three places:
//! - The platform effect engines (equalizer, bass boost, virtualizer, loudness)
//! - A durable configuration store per effect
//! - Observable in-memory state consumed by the presentation layer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Presentation Layer                       │
//! │     actions ──▶ Controllers ◀── watch / broadcast ──       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ tokio::sync::Mutex per controller
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   Engine (sync) ──▶ ConfigStore (async) ──▶ watch channel   │
//! │                          │                                  │
//! │                          └── external writes re-applied     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod controller;
mod error;
mod events;
mod model;
mod store;
mod suite;

pub use config::{CoreConfig, DEFAULT_LOUDNESS_TARGET_GAIN_MB};
pub use controller::{
    BassBoostController, EqualizerController, LoudnessController, StartupState,
    StrengthController, VirtualizerController, VolumeController, VolumeLevel,
};
pub use error::{CoreError, CoreResult, StoreError, StoreResult};
pub use events::{Event, EventSender};
pub use model::{
    format_center_frequency, Band, BassBoostConfiguration, EffectDomain, EqualizerConfiguration,
    EqualizerRecord, Preset, StrengthConfiguration, StrengthRange, VirtualizerConfiguration,
};
pub use store::{ConfigStore, EqualizerDataStore, JsonFileStore, MemoryStore, Record};
pub use suite::{EffectEngines, EffectStores, EffectSuite};

// Re-export engine types for convenience
pub use tonefx_effects::{AudioStream, EffectError, LevelRange};
