//! Core Configuration

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{EffectDomain, StrengthRange};
use crate::store::read_json_or_default;

/// Default loudness enhancer target gain in millibels (safe value)
pub const DEFAULT_LOUDNESS_TARGET_GAIN_MB: i32 = 700;

/// Settings that shape how the controllers are built
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Directory holding the configuration records (platform default if unset)
    pub data_dir: Option<PathBuf>,

    /// Target gain applied whenever the loudness enhancer is switched
    pub loudness_target_gain_mb: i32,

    /// Bounds for bass boost and virtualizer strength
    pub strength_range: StrengthRange,

    /// Capacity of the broadcast channel carrying controller events
    pub event_capacity: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            loudness_target_gain_mb: DEFAULT_LOUDNESS_TARGET_GAIN_MB,
            strength_range: StrengthRange::default(),
            event_capacity: 64,
        }
    }
}

impl CoreConfig {
    /// Load configuration from a JSON file, or return default if missing/corrupt
    pub fn load(path: &Path) -> Self {
        read_json_or_default(path, "core configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.strength_range.min > self.strength_range.max {
            return Err(format!(
                "Invalid strength range: {}..={}",
                self.strength_range.min, self.strength_range.max
            ));
        }
        if self.strength_range.max > 1000 {
            return Err(format!(
                "Strength above platform maximum: {}",
                self.strength_range.max
            ));
        }
        if !(0..=3000).contains(&self.loudness_target_gain_mb) {
            return Err(format!(
                "Invalid loudness target gain: {} mB",
                self.loudness_target_gain_mb
            ));
        }
        if self.event_capacity == 0 {
            return Err("Event capacity must be positive".into());
        }
        Ok(())
    }

    /// Directory holding the configuration records
    pub fn data_dir(&self) -> Result<PathBuf, StoreError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => ProjectDirs::from("com", "tonefx", "tonefx")
                .map(|proj| proj.config_dir().to_path_buf())
                .ok_or(StoreError::NoConfigDirectory),
        }
    }

    /// File backing the record of one effect domain
    pub fn store_path(&self, domain: EffectDomain) -> Result<PathBuf, StoreError> {
        let file = match domain {
            EffectDomain::Equalizer => "equalizer.json",
            EffectDomain::BassBoost => "bass_boost.json",
            EffectDomain::Virtualizer => "virtualizer.json",
            EffectDomain::Loudness | EffectDomain::Volume => {
                return Err(StoreError::Unavailable(format!(
                    "{domain} has no configuration record"
                )))
            }
        };
        Ok(self.data_dir()?.join(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoreConfig::default();
        assert_eq!(config.loudness_target_gain_mb, 700);
        assert_eq!(config.strength_range, StrengthRange { min: 0, max: 1000 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let reversed = CoreConfig {
            strength_range: StrengthRange { min: 800, max: 100 },
            ..Default::default()
        };
        assert!(reversed.validate().is_err());

        let too_strong = CoreConfig {
            strength_range: StrengthRange { min: 0, max: 2000 },
            ..Default::default()
        };
        assert!(too_strong.validate().is_err());

        let loud = CoreConfig {
            loudness_target_gain_mb: -10,
            ..Default::default()
        };
        assert!(loud.validate().is_err());

        let no_events = CoreConfig {
            event_capacity: 0,
            ..Default::default()
        };
        assert!(no_events.validate().is_err());
    }

    #[test]
    fn test_store_paths() {
        let config = CoreConfig {
            data_dir: Some(PathBuf::from("/tmp/tonefx")),
            ..Default::default()
        };
        assert_eq!(
            config.store_path(EffectDomain::Equalizer).unwrap(),
            PathBuf::from("/tmp/tonefx/equalizer.json")
        );
        assert_eq!(
            config.store_path(EffectDomain::BassBoost).unwrap(),
            PathBuf::from("/tmp/tonefx/bass_boost.json")
        );
        assert!(config.store_path(EffectDomain::Volume).is_err());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tonefx.json");
        std::fs::write(&path, r#"{ "loudness_target_gain_mb": 500 }"#).unwrap();

        let config = CoreConfig::load(&path);
        assert_eq!(config.loudness_target_gain_mb, 500);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn test_load_missing_file() {
        let config = CoreConfig::load(Path::new("/nonexistent/tonefx.json"));
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = CoreConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: CoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.event_capacity, deserialized.event_capacity);
        assert_eq!(config.strength_range, deserialized.strength_range);
    }
}
