//! Configuration file for logwarden
//!
//! `~/.logwarden/config.toml` holds process-wide defaults and a table of
//! named loggers:
//!
//! ```toml
//! verbose = false
//! level = "info"
//!
//! [loggers.api]
//! output_dir = "api"          # relative to log_dir
//! preset = "daily"
//! start_cleaner = true
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::logger_config::ConfigOverrides;
use crate::record::Level;

/// Process-wide settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Debug-level internal diagnostics
    #[serde(default)]
    pub verbose: bool,

    /// Base directory for relative logger `output_dir` values
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Minimum level for loggers that do not set one
    #[serde(default)]
    pub level: Level,

    /// Sweep interval for loggers that do not set one (default: "1 hour")
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: String,

    /// Logger definitions keyed by registry name
    #[serde(default)]
    pub loggers: BTreeMap<String, ConfigOverrides>,
}

fn default_log_dir() -> PathBuf {
    logs_dir()
}

fn default_sweep_interval() -> String {
    "1 hour".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verbose: false,
            log_dir: default_log_dir(),
            level: Level::default(),
            sweep_interval: default_sweep_interval(),
            loggers: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load settings from `path`, or defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut settings: Settings = toml::from_str(content)?;
        settings.log_dir = PathBuf::from(
            shellexpand::tilde(&settings.log_dir.to_string_lossy()).into_owned(),
        );
        Ok(settings)
    }

    /// Overrides for a defined logger with the settings-level defaults filled in
    pub fn overrides_for(&self, name: &str) -> Option<ConfigOverrides> {
        let mut overrides = self.loggers.get(name)?.clone();

        if let Some(dir) = overrides.output_dir.take() {
            let expanded = PathBuf::from(shellexpand::tilde(&dir.to_string_lossy()).into_owned());
            overrides.output_dir = Some(if expanded.is_absolute() {
                expanded
            } else {
                self.log_dir.join(expanded)
            });
        }
        if overrides.level.is_none() {
            overrides.level = Some(self.level);
        }
        if overrides.sweep_interval.is_none() {
            overrides.sweep_interval = Some(self.sweep_interval.clone());
        }
        Some(overrides)
    }
}

/// Get the base configuration directory (~/.logwarden)
/// Falls back to ./.logwarden if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".logwarden")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".logwarden"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the path to the default logs directory
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.verbose);
        assert_eq!(settings.level, Level::Info);
        assert!(settings.loggers.is_empty());
        assert!(settings.log_dir.ends_with("logs"));
    }

    #[test]
    fn test_parse_logger_table() {
        let settings = Settings::from_toml_str(
            r#"
            verbose = true
            log_dir = "/var/log/app"
            level = "debug"

            [loggers.api]
            output_dir = "api"
            preset = "daily"
            start_cleaner = true

            [loggers.audit]
            output_dir = "/srv/audit"
            level = "warning"
            sweep_interval = "10 minutes"

            [loggers.console]
            "#,
        )
        .unwrap();

        assert!(settings.verbose);
        assert_eq!(settings.loggers.len(), 3);

        let api = settings.overrides_for("api").unwrap();
        assert_eq!(api.output_dir, Some(PathBuf::from("/var/log/app/api")));
        assert_eq!(api.level, Some(Level::Debug));
        assert_eq!(api.sweep_interval.as_deref(), Some("1 hour"));
        assert_eq!(api.preset.as_deref(), Some("daily"));

        let audit = settings.overrides_for("audit").unwrap();
        assert_eq!(audit.output_dir, Some(PathBuf::from("/srv/audit")));
        assert_eq!(audit.level, Some(Level::Warning));
        assert_eq!(audit.sweep_interval.as_deref(), Some("10 minutes"));

        let console = settings.overrides_for("console").unwrap();
        assert!(console.output_dir.is_none());

        assert!(settings.overrides_for("missing").is_none());
    }

    #[test]
    fn test_unknown_logger_key_is_rejected() {
        let result = Settings::from_toml_str("[loggers.api]\nouput_dir = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "level = 3").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_dir_does_not_panic() {
        let dir = config_dir();
        assert!(dir.ends_with(".logwarden"));
    }

    #[test]
    fn test_try_config_dir() {
        if let Some(path) = try_config_dir() {
            assert!(path.ends_with(".logwarden"));
        }
    }
}
