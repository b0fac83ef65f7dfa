//! Named configuration presets
//!
//! A preset bundles rotation, retention, compression and file naming under a
//! string key. Built-in presets mirror common rotation cadences; custom ones
//! can be registered at runtime.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::logger_config::{Compression, Rotation};

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

/// Active file template used when no preset is named
pub const DEFAULT_FILE_FORMAT: &str = "[{name}]{timestamp}.log";

/// A named bundle of file-handling defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub rotation: Rotation,
    pub retention: Duration,
    pub compression: Compression,
    /// Template for the active log file name
    pub file_format: String,
    /// Template for rotated files (without extension); `None` keeps a timestamp suffix
    pub archive_format: Option<String>,
}

impl Preset {
    fn cadence(rotation: Rotation, retention_secs: u64, label: &str, archive: &str) -> Self {
        Self {
            rotation,
            retention: Duration::from_secs(retention_secs),
            compression: Compression::None,
            file_format: format!("[{{name}}]{}_latest.temp.log", label),
            archive_format: Some(archive.to_string()),
        }
    }
}

/// Built-in presets keyed by name
fn builtin_presets() -> BTreeMap<String, Preset> {
    let twenty_mb = Rotation::Size(20 * 1024 * 1024);
    let mut presets = BTreeMap::new();

    presets.insert(
        "detailed".to_string(),
        Preset {
            rotation: twenty_mb,
            retention: Duration::from_secs(30 * DAY),
            compression: Compression::None,
            file_format: DEFAULT_FILE_FORMAT.to_string(),
            archive_format: Some("[{name}]{timestamp}".to_string()),
        },
    );
    presets.insert(
        "simple".to_string(),
        Preset {
            rotation: twenty_mb,
            retention: Duration::from_secs(30 * DAY),
            compression: Compression::None,
            file_format: "{name}.log".to_string(),
            archive_format: None,
        },
    );
    presets.insert(
        "daily".to_string(),
        Preset::cadence(
            Rotation::Every(Duration::from_secs(DAY)),
            30 * DAY,
            "daily",
            "[{name}]{date}",
        ),
    );
    presets.insert(
        "hourly".to_string(),
        Preset::cadence(
            Rotation::Every(Duration::from_secs(HOUR)),
            7 * DAY,
            "hourly",
            "[{name}]{date}_{hour}",
        ),
    );
    presets.insert(
        "minute".to_string(),
        Preset::cadence(
            Rotation::Every(Duration::from_secs(60)),
            DAY,
            "minute",
            "[{name}]{date}_{hour}{minute}",
        ),
    );
    presets.insert(
        "weekly".to_string(),
        Preset::cadence(
            Rotation::Every(Duration::from_secs(7 * DAY)),
            12 * 7 * DAY,
            "weekly",
            "[{name}]week{week}_{year}",
        ),
    );
    presets.insert(
        "monthly".to_string(),
        Preset::cadence(
            Rotation::Every(Duration::from_secs(30 * DAY)),
            12 * 30 * DAY,
            "monthly",
            "[{name}]{year}{month}",
        ),
    );

    presets
}

/// Lookup table of presets, shared by every handle a manager builds
#[derive(Debug)]
pub struct PresetBook {
    presets: RwLock<BTreeMap<String, Preset>>,
}

impl Default for PresetBook {
    fn default() -> Self {
        Self {
            presets: RwLock::new(builtin_presets()),
        }
    }
}

impl PresetBook {
    /// Create a book holding the built-in presets
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a preset by name
    ///
    /// Unknown names are an error rather than a silent fallback.
    pub fn get(&self, name: &str) -> Result<Preset> {
        self.presets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownPreset(name.to_string()))
    }

    /// Register (or replace) a custom preset
    pub fn register(&self, name: impl Into<String>, preset: Preset) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::Configuration("preset name is empty".to_string()));
        }
        if preset.file_format.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "preset '{}' has an empty file format",
                name
            )));
        }

        let replaced = self
            .presets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), preset)
            .is_some();
        tracing::debug!(preset = %name, replaced, "Registered preset");
        Ok(())
    }

    /// Names of all known presets, sorted
    pub fn names(&self) -> Vec<String> {
        self.presets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_presets_present() {
        let book = PresetBook::new();
        let names = book.names();
        for expected in [
            "daily", "detailed", "hourly", "minute", "monthly", "simple", "weekly",
        ] {
            assert!(names.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[test]
    fn test_hourly_preset_values() {
        let preset = PresetBook::new().get("hourly").unwrap();
        assert_eq!(preset.rotation, Rotation::Every(Duration::from_secs(HOUR)));
        assert_eq!(preset.retention, Duration::from_secs(7 * DAY));
        assert_eq!(preset.file_format, "[{name}]hourly_latest.temp.log");
        assert_eq!(
            preset.archive_format.as_deref(),
            Some("[{name}]{date}_{hour}")
        );
    }

    #[test]
    fn test_unknown_preset_is_error() {
        let err = PresetBook::new().get("dialy").unwrap_err();
        assert!(matches!(err, Error::UnknownPreset(name) if name == "dialy"));
    }

    #[test]
    fn test_register_custom_preset() {
        let book = PresetBook::new();
        let preset = Preset {
            rotation: Rotation::Size(1024),
            retention: Duration::from_secs(60),
            compression: Compression::Gzip,
            file_format: "{name}-custom.log".to_string(),
            archive_format: None,
        };
        book.register("tiny", preset.clone()).unwrap();
        assert_eq!(book.get("tiny").unwrap(), preset);
    }

    #[test]
    fn test_register_rejects_empty_format() {
        let book = PresetBook::new();
        let preset = Preset {
            rotation: Rotation::Never,
            retention: Duration::from_secs(60),
            compression: Compression::None,
            file_format: "  ".to_string(),
            archive_format: None,
        };
        assert!(book.register("broken", preset).is_err());
        assert!(book.register("", PresetBook::new().get("simple").unwrap()).is_err());
    }
}
