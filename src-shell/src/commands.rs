//! Shell commands - one per input line, parsed with clap

use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};

use crate::presenter::MainAction;
use crate::state::MainUiState;

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct Line {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ShellCommand {
    /// Print the current configuration
    Show,
    /// Switch the equalizer
    Eq { state: Switch },
    /// Select a preset by id
    Preset { id: u32 },
    /// Set one band of a preset (millibels)
    Band {
        preset: u32,
        band: usize,
        #[arg(allow_negative_numbers = true)]
        level: i32,
    },
    /// Add a custom preset
    Add {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// Delete a preset by id
    Delete { id: u32 },
    /// Bass boost: on, off or a strength
    Bass {
        #[arg(allow_negative_numbers = true)]
        value: StrengthArg,
    },
    /// Virtualizer: on, off or a strength
    Virt {
        #[arg(allow_negative_numbers = true)]
        value: StrengthArg,
    },
    /// Switch the loudness enhancer
    Loudness { state: Switch },
    /// Report a media volume change
    Volume { level: u32 },
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    fn enabled(self) -> bool {
        self == Switch::On
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthArg {
    On,
    Off,
    Strength(i32),
}

impl FromStr for StrengthArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(StrengthArg::On),
            "off" => Ok(StrengthArg::Off),
            other => other
                .parse()
                .map(StrengthArg::Strength)
                .map_err(|_| format!("expected on, off or a strength, got '{other}'")),
        }
    }
}

/// What the shell should do with a parsed line
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Show,
    Quit,
    Dispatch(MainAction),
}

/// Parse one input line
pub fn parse_line(line: &str) -> Result<ShellCommand, clap::Error> {
    Line::try_parse_from(line.split_whitespace()).map(|line| line.command)
}

/// Turn a command into a presenter action, resolving preset ids against `state`
pub fn resolve(command: ShellCommand, state: &MainUiState) -> Result<Step, String> {
    let preset = |id: u32| {
        state
            .equalizer
            .preset(id)
            .cloned()
            .ok_or_else(|| format!("No preset with id {id}"))
    };

    let action = match command {
        ShellCommand::Show => return Ok(Step::Show),
        ShellCommand::Quit => return Ok(Step::Quit),
        ShellCommand::Eq { state } => MainAction::SetEqualizerSwitchState(state.enabled()),
        ShellCommand::Preset { id } => MainAction::UsePreset(preset(id)?),
        ShellCommand::Band {
            preset: id,
            band,
            level,
        } => MainAction::OnBandLevelChanged {
            preset: preset(id)?,
            band,
            level,
        },
        ShellCommand::Add { name } => MainAction::AddCustomPreset(name.join(" ")),
        ShellCommand::Delete { id } => MainAction::DeletePreset(preset(id)?),
        ShellCommand::Bass { value } => match value {
            StrengthArg::On => MainAction::SetBassBoostSwitchState(true),
            StrengthArg::Off => MainAction::SetBassBoostSwitchState(false),
            StrengthArg::Strength(strength) => MainAction::SetBassBoostStrength(strength),
        },
        ShellCommand::Virt { value } => match value {
            StrengthArg::On => MainAction::SetVirtualizerSwitchState(true),
            StrengthArg::Off => MainAction::SetVirtualizerSwitchState(false),
            StrengthArg::Strength(strength) => MainAction::SetVirtualizerStrength(strength),
        },
        ShellCommand::Loudness { state } => MainAction::SetEnhanceLoudness(state.enabled()),
        ShellCommand::Volume { level } => MainAction::SetVolumeLevel(level),
    };
    Ok(Step::Dispatch(action))
}
