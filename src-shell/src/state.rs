//! UI state shapes
//!
//! Plain values the presenter publishes; nothing here talks to a controller.

use std::fmt::Write;

use serde::Serialize;
use tonefx_core::{Preset, StrengthConfiguration, StrengthRange};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MainUiState {
    pub equalizer: EqualizerUiState,
    pub bass_boost: StrengthUiState,
    pub virtualizer: StrengthUiState,
    pub volume: VolumeUiState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EqualizerUiState {
    pub presets: Vec<Preset>,
    pub switch_state: bool,
    pub loudness_enhancer_checkbox_state: bool,
}

impl EqualizerUiState {
    pub fn preset(&self, id: u32) -> Option<&Preset> {
        self.presets.iter().find(|preset| preset.id == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrengthUiState {
    pub strength: u16,
    pub switch_state: bool,
    pub range: StrengthRange,
}

impl From<&StrengthConfiguration> for StrengthUiState {
    fn from(config: &StrengthConfiguration) -> Self {
        Self {
            strength: config.strength,
            switch_state: config.enabled,
            range: config.range,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolumeUiState {
    pub current_level: u32,
    pub max_level: u32,
}

fn on_off(state: bool) -> &'static str {
    if state {
        "on"
    } else {
        "off"
    }
}

/// Human readable summary for the shell's `show` command
pub fn render(state: &MainUiState) -> String {
    let mut out = String::new();
    let eq = &state.equalizer;

    let _ = writeln!(
        out,
        "Equalizer: {} (loudness enhancer: {})",
        on_off(eq.switch_state),
        on_off(eq.loudness_enhancer_checkbox_state)
    );
    for preset in &eq.presets {
        let levels: Vec<String> = preset.levels().iter().map(|l| l.to_string()).collect();
        let _ = writeln!(
            out,
            "  {} [{}] {}{}  {}",
            if preset.selected { "*" } else { " " },
            preset.id,
            preset.name,
            if preset.is_custom { " (custom)" } else { "" },
            levels.join(" ")
        );
    }

    for (label, strength) in [
        ("Bass boost", &state.bass_boost),
        ("Virtualizer", &state.virtualizer),
    ] {
        let _ = writeln!(
            out,
            "{}: {}, strength {}/{}",
            label,
            on_off(strength.switch_state),
            strength.strength,
            strength.range.max
        );
    }

    let _ = write!(
        out,
        "Volume: {}/{}",
        state.volume.current_level, state.volume.max_level
    );
    out
}
