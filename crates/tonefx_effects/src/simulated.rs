//! Simulated Effect Engines
//!
//! In-process engines that validate parameters like a strict platform
//! implementation and keep their state in memory. They count every write so
//! callers can observe how often the controllers touch the engine, and they
//! can be switched into a failing mode to exercise error paths.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::EffectError;
use crate::presets::SYSTEM_PRESETS;
use crate::traits::{
    AudioStream, EqualizerEngine, LevelRange, LoudnessEngine, StrengthEngine, VolumeSource,
};

/// Center frequencies (milliHertz) of the reference five-band equalizer
pub const DEFAULT_CENTER_FREQUENCIES: [u32; 5] = [60_000, 230_000, 910_000, 3_600_000, 14_000_000];

/// Upper bound of the strength parameter accepted by strength engines
pub const MAX_STRENGTH: u16 = 1000;

fn check_failing(failing: bool, released: bool, name: &str) -> Result<(), EffectError> {
    if released {
        return Err(EffectError::Released(name.to_string()));
    }
    if failing {
        return Err(EffectError::Internal(format!("{name} rejected the call")));
    }
    Ok(())
}

struct EqualizerState {
    enabled: bool,
    frequencies: Vec<u32>,
    levels: Vec<i16>,
    range: LevelRange,
    current_preset: Option<u16>,
    writes: usize,
    failing: bool,
    released: bool,
}

/// Software equalizer with the standard platform presets
pub struct SimulatedEqualizer {
    state: Mutex<EqualizerState>,
}

impl SimulatedEqualizer {
    /// Create the reference five-band equalizer
    pub fn new() -> Self {
        Self::with_bands(DEFAULT_CENTER_FREQUENCIES.to_vec())
    }

    /// Create an equalizer with custom band center frequencies (milliHertz)
    pub fn with_bands(frequencies: Vec<u32>) -> Self {
        let levels = vec![0; frequencies.len()];
        Self {
            state: Mutex::new(EqualizerState {
                enabled: false,
                frequencies,
                levels,
                range: LevelRange::default(),
                current_preset: None,
                writes: 0,
                failing: false,
                released: false,
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Snapshot of every band level
    pub fn levels(&self) -> Vec<i16> {
        self.state.lock().levels.clone()
    }

    /// Last preset selected through `use_preset`, cleared by manual band edits
    pub fn current_preset(&self) -> Option<u16> {
        self.state.lock().current_preset
    }

    /// Number of mutating calls received so far
    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }

    /// Make every subsequent call fail with `EffectError::Internal`
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    /// Simulate the platform reclaiming the engine
    pub fn release(&self) {
        self.state.lock().released = true;
    }

    /// Level of `band` within a five-value preset table, stretched to any band count
    fn preset_level(table: &[i16; 5], band: usize, bands: usize) -> i16 {
        let index = (band * table.len() / bands.max(1)).min(table.len() - 1);
        table[index]
    }
}

impl Default for SimulatedEqualizer {
    fn default() -> Self {
        Self::new()
    }
}

impl EqualizerEngine for SimulatedEqualizer {
    fn set_enabled(&self, enabled: bool) -> Result<(), EffectError> {
        let mut state = self.state.lock();
        check_failing(state.failing, state.released, "Equalizer")?;
        state.enabled = enabled;
        state.writes += 1;
        trace!("Simulated equalizer enabled: {}", enabled);
        Ok(())
    }

    fn band_count(&self) -> Result<u16, EffectError> {
        let state = self.state.lock();
        check_failing(state.failing, state.released, "Equalizer")?;
        Ok(state.levels.len() as u16)
    }

    fn band_level(&self, band: u16) -> Result<i16, EffectError> {
        let state = self.state.lock();
        check_failing(state.failing, state.released, "Equalizer")?;
        state
            .levels
            .get(band as usize)
            .copied()
            .ok_or(EffectError::InvalidBand {
                band,
                bands: state.levels.len() as u16,
            })
    }

    fn set_band_level(&self, band: u16, level: i16) -> Result<(), EffectError> {
        let mut state = self.state.lock();
        check_failing(state.failing, state.released, "Equalizer")?;
        let bands = state.levels.len() as u16;
        if band >= bands {
            return Err(EffectError::InvalidBand { band, bands });
        }
        if !state.range.contains(level) {
            return Err(EffectError::ParameterOutOfRange {
                name: "band level",
                value: level as i32,
            });
        }
        state.levels[band as usize] = level;
        state.current_preset = None;
        state.writes += 1;
        trace!("Simulated equalizer band {} = {} mB", band, level);
        Ok(())
    }

    fn center_frequency(&self, band: u16) -> Result<u32, EffectError> {
        let state = self.state.lock();
        check_failing(state.failing, state.released, "Equalizer")?;
        state
            .frequencies
            .get(band as usize)
            .copied()
            .ok_or(EffectError::InvalidBand {
                band,
                bands: state.frequencies.len() as u16,
            })
    }

    fn band_level_range(&self) -> Result<LevelRange, EffectError> {
        let state = self.state.lock();
        check_failing(state.failing, state.released, "Equalizer")?;
        Ok(state.range)
    }

    fn preset_count(&self) -> Result<u16, EffectError> {
        let state = self.state.lock();
        check_failing(state.failing, state.released, "Equalizer")?;
        Ok(SYSTEM_PRESETS.len() as u16)
    }

    fn preset_name(&self, preset: u16) -> Result<String, EffectError> {
        let state = self.state.lock();
        check_failing(state.failing, state.released, "Equalizer")?;
        SYSTEM_PRESETS
            .get(preset as usize)
            .map(|(name, _)| name.to_string())
            .ok_or(EffectError::InvalidPreset {
                preset,
                presets: SYSTEM_PRESETS.len() as u16,
            })
    }

    fn use_preset(&self, preset: u16) -> Result<(), EffectError> {
        let mut state = self.state.lock();
        check_failing(state.failing, state.released, "Equalizer")?;
        let (name, table) = SYSTEM_PRESETS
            .get(preset as usize)
            .ok_or(EffectError::InvalidPreset {
                preset,
                presets: SYSTEM_PRESETS.len() as u16,
            })?;

        let bands = state.levels.len();
        let range = state.range;
        for band in 0..bands {
            let level = Self::preset_level(table, band, bands);
            state.levels[band] = range.clamp(level as i32);
        }
        state.current_preset = Some(preset);
        state.writes += 1;
        debug!("Simulated equalizer switched to preset '{}'", name);
        Ok(())
    }
}

struct StrengthState {
    enabled: bool,
    strength: u16,
    writes: usize,
    failing: bool,
    released: bool,
}

/// Software bass boost or virtualizer
pub struct SimulatedStrength {
    name: &'static str,
    state: Mutex<StrengthState>,
}

impl SimulatedStrength {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(StrengthState {
                enabled: false,
                strength: 0,
                writes: 0,
                failing: false,
                released: false,
            }),
        }
    }

    pub fn bass_boost() -> Self {
        Self::new("BassBoost")
    }

    pub fn virtualizer() -> Self {
        Self::new("Virtualizer")
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub fn strength(&self) -> u16 {
        self.state.lock().strength
    }

    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    pub fn release(&self) {
        self.state.lock().released = true;
    }
}

impl StrengthEngine for SimulatedStrength {
    fn name(&self) -> &'static str {
        self.name
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), EffectError> {
        let mut state = self.state.lock();
        check_failing(state.failing, state.released, self.name)?;
        state.enabled = enabled;
        state.writes += 1;
        Ok(())
    }

    fn set_strength(&self, strength: u16) -> Result<(), EffectError> {
        let mut state = self.state.lock();
        check_failing(state.failing, state.released, self.name)?;
        if strength > MAX_STRENGTH {
            return Err(EffectError::ParameterOutOfRange {
                name: "strength",
                value: strength as i32,
            });
        }
        state.strength = strength;
        state.writes += 1;
        trace!("{} strength = {}", self.name, strength);
        Ok(())
    }
}

/// Software loudness enhancer
#[derive(Default)]
pub struct SimulatedLoudness {
    state: Mutex<(bool, i32, usize)>,
}

impl SimulatedLoudness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().0
    }

    pub fn target_gain(&self) -> i32 {
        self.state.lock().1
    }

    pub fn writes(&self) -> usize {
        self.state.lock().2
    }
}

impl LoudnessEngine for SimulatedLoudness {
    fn set_enabled(&self, enabled: bool) -> Result<(), EffectError> {
        let mut state = self.state.lock();
        state.0 = enabled;
        state.2 += 1;
        Ok(())
    }

    fn set_target_gain(&self, gain_mb: i32) -> Result<(), EffectError> {
        let mut state = self.state.lock();
        state.1 = gain_mb;
        state.2 += 1;
        Ok(())
    }
}

/// Stream volumes held in memory
pub struct SimulatedVolume {
    levels: Mutex<HashMap<AudioStream, u32>>,
    max: u32,
}

impl SimulatedVolume {
    /// Create a volume source with every stream at `level` out of `max`
    pub fn new(level: u32, max: u32) -> Self {
        let level = level.min(max);
        let levels = [
            AudioStream::Music,
            AudioStream::Ring,
            AudioStream::Alarm,
            AudioStream::Notification,
            AudioStream::System,
            AudioStream::VoiceCall,
        ]
        .into_iter()
        .map(|stream| (stream, level))
        .collect();

        Self {
            levels: Mutex::new(levels),
            max,
        }
    }

    /// Change a stream volume the way a hardware key press would
    pub fn set_stream_volume(&self, stream: AudioStream, level: u32) {
        self.levels.lock().insert(stream, level.min(self.max));
    }
}

impl Default for SimulatedVolume {
    fn default() -> Self {
        Self::new(7, 15)
    }
}

impl VolumeSource for SimulatedVolume {
    fn stream_volume(&self, stream: AudioStream) -> Result<u32, EffectError> {
        Ok(self.levels.lock().get(&stream).copied().unwrap_or(0))
    }

    fn max_stream_volume(&self, _stream: AudioStream) -> Result<u32, EffectError> {
        Ok(self.max)
    }
}
