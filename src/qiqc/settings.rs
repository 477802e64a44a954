//! Settings module for process-level qiqc configuration.
//!
//! Everything describing a model run (seed, device, folds) lives in the
//! experiment file; these settings only tell the binary where to find it.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QiqcSettings {
    /// Experiment file used when none is given on the command line.
    /// If not set, the built-in defaults are used.
    pub experiment: Option<PathBuf>,

    /// Width of the stand-in word vectors built by the demo binary.
    pub embedding_dim: usize,
}

impl Default for QiqcSettings {
    fn default() -> Self {
        Self {
            experiment: None,
            embedding_dim: 32,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub qiqc: QiqcSettings,
}

impl Settings {
    /// Create a new Settings instance from environment variables and config files.
    /// Environment variables are prefixed with "QIQC__" and nested with "__",
    /// e.g. `QIQC__QIQC__EXPERIMENT=experiments/bilstm.toml`.
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("qiqc.experiment", None::<String>)?
            .set_default("qiqc.embedding_dim", 32)?
            .add_source(File::with_name("qiqc").required(false))
            .add_source(Environment::with_prefix("QIQC").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Get the global settings instance, initializing it if necessary.
pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(|| {
        Settings::new().unwrap_or_else(|err| {
            log::warn!("falling back to default settings: {}", err);
            Settings::default()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.qiqc.experiment, None);
        assert_eq!(settings.qiqc.embedding_dim, 32);
    }

    #[test]
    fn test_settings_new_with_defaults() {
        let settings = Settings::new().unwrap_or_else(|_| Settings::default());

        assert!(settings.qiqc.embedding_dim > 0);
    }

    #[test]
    fn test_settings_serialization() {
        let settings = Settings {
            qiqc: QiqcSettings {
                experiment: Some(PathBuf::from("/data/experiments/gru.toml")),
                embedding_dim: 300,
            },
        };

        let json = serde_json::to_string(&settings).expect("Should serialize to JSON");
        assert!(json.contains("experiment"));
        assert!(json.contains("embedding_dim"));

        let deserialized: Settings =
            serde_json::from_str(&json).expect("Should deserialize from JSON");
        assert_eq!(deserialized.qiqc.experiment, settings.qiqc.experiment);
        assert_eq!(deserialized.qiqc.embedding_dim, 300);
    }

    #[test]
    fn test_global_settings_is_stable() {
        let first = settings() as *const Settings;
        let second = settings() as *const Settings;
        assert_eq!(first, second);
    }
}
