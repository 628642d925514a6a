//! ToneFX Shell Library - Presentation State and Commands
//!
//! This module turns the effect controllers into UI state and maps user
//! input onto controller operations.

mod commands;
mod presenter;
mod state;

pub use commands::{parse_line, resolve, ShellCommand, Step, StrengthArg, Switch};
pub use presenter::{MainAction, MainPresenter, UiEvent};
pub use state::{render, EqualizerUiState, MainUiState, StrengthUiState, VolumeUiState};
