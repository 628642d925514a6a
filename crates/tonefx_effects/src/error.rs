//! Effect Engine Error Types

use thiserror::Error;

/// Errors reported by an effect engine adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EffectError {
    #[error("Invalid band index: {band} (engine has {bands} bands)")]
    InvalidBand { band: u16, bands: u16 },

    #[error("Invalid preset index: {preset} (engine has {presets} presets)")]
    InvalidPreset { preset: u16, presets: u16 },

    #[error("Parameter '{name}' out of range: {value}")]
    ParameterOutOfRange { name: &'static str, value: i32 },

    #[error("Effect engine has been released: {0}")]
    Released(String),

    #[error("Internal engine error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EffectError::InvalidBand { band: 7, bands: 5 };
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains("5 bands"));

        let err = EffectError::ParameterOutOfRange {
            name: "strength",
            value: 1200,
        };
        assert!(err.to_string().contains("strength"));
        assert!(err.to_string().contains("1200"));
    }
}
