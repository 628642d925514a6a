//! Configuration Data Model
//!
//! Values owned by the controllers and mirrored into the configuration stores.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tonefx_effects::LevelRange;

/// Effect domain a controller, store or event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectDomain {
    Equalizer,
    BassBoost,
    Virtualizer,
    Loudness,
    Volume,
}

impl fmt::Display for EffectDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EffectDomain::Equalizer => "equalizer",
            EffectDomain::BassBoost => "bass boost",
            EffectDomain::Virtualizer => "virtualizer",
            EffectDomain::Loudness => "loudness enhancer",
            EffectDomain::Volume => "volume",
        };
        f.write_str(name)
    }
}

/// One equalizer frequency slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    /// Gain in millibels
    pub level: i16,
    pub range: LevelRange,
    /// Display label, e.g. "910 Hz"
    pub center_frequency: String,
}

/// Format an engine center frequency (milliHertz) for display
pub fn format_center_frequency(milli_hz: u32) -> String {
    format!("{} Hz", milli_hz / 1000)
}

/// Named set of band levels, either platform-provided or user-created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub id: u32,
    pub bands: Vec<Band>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub is_custom: bool,
    /// Creation time of custom presets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Preset {
    pub fn levels(&self) -> Vec<i16> {
        self.bands.iter().map(|band| band.level).collect()
    }
}

/// Equalizer state observed by the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqualizerConfiguration {
    pub enabled: bool,
    pub loudness_enhancer_enabled: bool,
    pub presets: Vec<Preset>,
}

impl EqualizerConfiguration {
    pub fn selected_preset(&self) -> Option<&Preset> {
        self.presets.iter().find(|preset| preset.selected)
    }

    pub fn preset(&self, id: u32) -> Option<&Preset> {
        self.presets.iter().find(|preset| preset.id == id)
    }

    /// Mark exactly the preset with `id` as selected
    pub fn select(&mut self, id: u32) {
        for preset in &mut self.presets {
            preset.selected = preset.id == id;
        }
    }

    /// Repair the selection so exactly one preset is selected
    ///
    /// Keeps the first selected preset, falling back to the first preset.
    /// Returns whether anything changed.
    pub fn normalize_selection(&mut self) -> bool {
        let Some(id) = self
            .selected_preset()
            .or(self.presets.first())
            .map(|preset| preset.id)
        else {
            return false;
        };

        let before: Vec<bool> = self.presets.iter().map(|p| p.selected).collect();
        let mut seen = false;
        for preset in &mut self.presets {
            preset.selected = preset.id == id && !seen;
            seen |= preset.selected;
        }
        before.into_iter().zip(&self.presets).any(|(was, p)| was != p.selected)
    }

    pub fn max_preset_id(&self) -> Option<u32> {
        self.presets.iter().map(|preset| preset.id).max()
    }
}

/// Persisted equalizer record
///
/// Wraps the observable configuration with the monotonic preset id counter so
/// ids are never handed out twice, even after deletions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqualizerRecord {
    #[serde(flatten)]
    pub configuration: EqualizerConfiguration,
    #[serde(default)]
    pub next_preset_id: u32,
}

impl EqualizerRecord {
    /// Hand out the next preset id and advance the counter
    pub fn allocate_preset_id(&mut self) -> u32 {
        let floor = self
            .configuration
            .max_preset_id()
            .map_or(0, |max| max + 1);
        let id = self.next_preset_id.max(floor);
        self.next_preset_id = id + 1;
        id
    }
}

/// Inclusive bounds for a strength parameter (display-only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrengthRange {
    pub min: u16,
    pub max: u16,
}

impl StrengthRange {
    /// Clamp into the range; reversed bounds are treated as swapped
    pub fn clamp(&self, strength: i32) -> u16 {
        let (low, high) = (self.min.min(self.max), self.min.max(self.max));
        strength.clamp(low as i32, high as i32) as u16
    }
}

impl Default for StrengthRange {
    fn default() -> Self {
        // Platform strength effects accept 0 - 1000
        Self { min: 0, max: 1000 }
    }
}

/// Bass boost / virtualizer configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrengthConfiguration {
    pub strength: u16,
    pub enabled: bool,
    #[serde(skip)]
    pub range: StrengthRange,
}

pub type BassBoostConfiguration = StrengthConfiguration;
pub type VirtualizerConfiguration = StrengthConfiguration;
