//! Per-logger configuration
//!
//! `ConfigOverrides` is what callers (or the settings file) provide: every
//! field optional. `LoggerConfig::resolve` merges library defaults, a named
//! preset and the overrides, in increasing priority, into an immutable
//! `LoggerConfig`.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filter::TagRules;
use crate::preset::{Preset, PresetBook, DEFAULT_FILE_FORMAT};
use crate::record::Level;

const MB: u64 = 1024 * 1024;

/// Default rotation threshold (20 MB)
pub const DEFAULT_ROTATION: Rotation = Rotation::Size(20 * MB);

/// Default retention period in days
pub const DEFAULT_RETENTION_DAYS: u64 = 30;

/// Default interval between retention sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// When the active log file is rotated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// Never rotate
    Never,
    /// Rotate once the file would grow past this many bytes
    Size(u64),
    /// Rotate once the file has been open this long
    Every(Duration),
}

impl FromStr for Rotation {
    type Err = String;

    /// Accepts `"20 MB"`, `"512 KB"`, `"1 day"`, `"2 hours"`, `"never"`, or a bare
    /// number of megabytes
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if matches!(trimmed.to_ascii_lowercase().as_str(), "never" | "none") {
            return Ok(Rotation::Never);
        }

        let (value, unit) =
            split_quantity(trimmed).ok_or_else(|| format!("invalid rotation '{}'", s))?;
        let rotation = if unit.is_empty() {
            Rotation::Size((value * MB as f64) as u64)
        } else if let Some(bytes) = size_unit(&unit) {
            Rotation::Size((value * bytes as f64) as u64)
        } else if let Some(secs) = duration_unit(&unit) {
            Rotation::Every(
                Duration::try_from_secs_f64(value * secs as f64)
                    .map_err(|_| format!("rotation interval out of range: '{}'", s))?,
            )
        } else {
            return Err(format!("invalid rotation unit '{}' in '{}'", unit, s));
        };

        match rotation {
            Rotation::Size(0) => Err(format!("rotation size must be positive: '{}'", s)),
            Rotation::Every(d) if d.is_zero() => {
                Err(format!("rotation interval must be positive: '{}'", s))
            }
            other => Ok(other),
        }
    }
}

/// Post-rotation transform applied to archived files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Keep the rotated file as plain text
    #[default]
    None,
    /// Gzip the rotated file and remove the plain copy
    Gzip,
}

/// Parse a duration such as `"30 days"`, `"12 weeks"` or `"24 hours"`
///
/// A bare number is interpreted in `bare_unit_secs` seconds.
pub fn parse_duration(s: &str, bare_unit_secs: u64) -> Option<Duration> {
    let (value, unit) = split_quantity(s)?;
    let secs = if unit.is_empty() {
        bare_unit_secs
    } else {
        duration_unit(&unit)?
    };
    Duration::try_from_secs_f64(value * secs as f64).ok()
}

fn split_quantity(s: &str) -> Option<(f64, String)> {
    let s = s.trim();
    let idx = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(idx);
    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value, unit.trim().to_ascii_lowercase()))
}

fn size_unit(unit: &str) -> Option<u64> {
    match unit {
        "b" | "byte" | "bytes" => Some(1),
        "kb" | "k" => Some(1024),
        "mb" | "m" => Some(MB),
        "gb" | "g" => Some(1024 * MB),
        _ => None,
    }
}

fn duration_unit(unit: &str) -> Option<u64> {
    match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1),
        "min" | "mins" | "minute" | "minutes" => Some(60),
        "h" | "hour" | "hours" => Some(60 * 60),
        "d" | "day" | "days" => Some(24 * 60 * 60),
        "w" | "week" | "weeks" => Some(7 * 24 * 60 * 60),
        "month" | "months" => Some(30 * 24 * 60 * 60),
        "year" | "years" => Some(365 * 24 * 60 * 60),
        _ => None,
    }
}

/// Caller-supplied logger options; unset fields fall back to the preset, then defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    /// Where files land; absent means console only
    pub output_dir: Option<PathBuf>,
    /// Subdirectory under `output_dir`
    pub subdirectory: Option<String>,
    /// Name used in file names (defaults to the logger name)
    pub component_name: Option<String>,
    /// Minimum severity
    pub level: Option<Level>,
    /// Rotation threshold, e.g. `"20 MB"` or `"1 day"`
    pub rotation: Option<String>,
    /// Maximum file age before deletion, e.g. `"30 days"` (bare number = days)
    pub retention: Option<String>,
    pub compression: Option<Compression>,
    /// Named preset supplying rotation/retention/naming defaults
    pub preset: Option<String>,
    /// Wrap the handle in a proxy that follows reinitialization
    pub use_proxy: Option<bool>,
    /// Start a retention sweeper for `output_dir`
    pub start_cleaner: Option<bool>,
    /// Time between retention sweeps (bare number = seconds)
    pub sweep_interval: Option<String>,
    /// Tag routing rules
    pub tags: Option<TagRules>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn subdirectory(mut self, subdirectory: impl Into<String>) -> Self {
        self.subdirectory = Some(subdirectory.into());
        self
    }

    pub fn component_name(mut self, name: impl Into<String>) -> Self {
        self.component_name = Some(name.into());
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    pub fn rotation(mut self, rotation: impl Into<String>) -> Self {
        self.rotation = Some(rotation.into());
        self
    }

    pub fn retention(mut self, retention: impl Into<String>) -> Self {
        self.retention = Some(retention.into());
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = Some(preset.into());
        self
    }

    pub fn use_proxy(mut self, enabled: bool) -> Self {
        self.use_proxy = Some(enabled);
        self
    }

    pub fn start_cleaner(mut self, enabled: bool) -> Self {
        self.start_cleaner = Some(enabled);
        self
    }

    pub fn sweep_interval(mut self, interval: impl Into<String>) -> Self {
        self.sweep_interval = Some(interval.into());
        self
    }

    pub fn tags(mut self, rules: TagRules) -> Self {
        self.tags = Some(rules);
        self
    }
}

/// Fully resolved, immutable logger configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    /// Registry key
    pub name: String,
    /// Name substituted into file names
    pub component_name: String,
    pub output_dir: Option<PathBuf>,
    pub subdirectory: Option<String>,
    pub level: Level,
    pub rotation: Rotation,
    pub retention: Duration,
    pub compression: Compression,
    /// Preset the values were taken from, if any
    pub preset: Option<String>,
    /// Template for the active file name
    pub file_format: String,
    /// Template for rotated file names
    pub archive_format: Option<String>,
    pub tags: TagRules,
    pub use_proxy: bool,
    pub start_cleaner: bool,
    pub sweep_interval: Duration,
}

impl LoggerConfig {
    /// Library defaults for a logger called `name`
    pub fn defaults(name: &str) -> Self {
        Self {
            name: name.to_string(),
            component_name: name.to_string(),
            output_dir: None,
            subdirectory: None,
            level: Level::Info,
            rotation: DEFAULT_ROTATION,
            retention: Duration::from_secs(DEFAULT_RETENTION_DAYS * 24 * 60 * 60),
            compression: Compression::None,
            preset: None,
            file_format: DEFAULT_FILE_FORMAT.to_string(),
            archive_format: None,
            tags: TagRules::default(),
            use_proxy: false,
            start_cleaner: false,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Merge defaults, the named preset and `overrides` (highest priority)
    pub fn resolve(name: &str, overrides: &ConfigOverrides, presets: &PresetBook) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Configuration("logger name is empty".to_string()));
        }

        let mut config = Self::defaults(name);
        if let Some(preset_name) = &overrides.preset {
            let preset = presets.get(preset_name)?;
            config.apply_preset(preset_name, preset);
        }
        config.apply_overrides(overrides)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_preset(&mut self, preset_name: &str, preset: Preset) {
        self.preset = Some(preset_name.to_string());
        self.rotation = preset.rotation;
        self.retention = preset.retention;
        self.compression = preset.compression;
        self.file_format = preset.file_format;
        self.archive_format = preset.archive_format;
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(dir) = &overrides.output_dir {
            let expanded = shellexpand::tilde(&dir.to_string_lossy()).into_owned();
            self.output_dir = Some(PathBuf::from(expanded));
        }
        if let Some(subdirectory) = &overrides.subdirectory {
            self.subdirectory = Some(subdirectory.clone());
        }
        if let Some(component) = &overrides.component_name {
            self.component_name = component.clone();
        }
        if let Some(level) = overrides.level {
            self.level = level;
        }
        if let Some(rotation) = &overrides.rotation {
            self.rotation = rotation.parse().map_err(Error::Configuration)?;
        }
        if let Some(retention) = &overrides.retention {
            self.retention = parse_duration(retention, 24 * 60 * 60)
                .ok_or_else(|| Error::Configuration(format!("invalid retention '{}'", retention)))?;
        }
        if let Some(compression) = overrides.compression {
            self.compression = compression;
        }
        if let Some(use_proxy) = overrides.use_proxy {
            self.use_proxy = use_proxy;
        }
        if let Some(start_cleaner) = overrides.start_cleaner {
            self.start_cleaner = start_cleaner;
        }
        if let Some(interval) = &overrides.sweep_interval {
            self.sweep_interval = parse_duration(interval, 1).ok_or_else(|| {
                Error::Configuration(format!("invalid sweep interval '{}'", interval))
            })?;
        }
        if let Some(tags) = &overrides.tags {
            self.tags = tags.clone();
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.start_cleaner && self.output_dir.is_none() {
            return Err(Error::Configuration(format!(
                "logger '{}': start_cleaner requires an output_dir",
                self.name
            )));
        }
        if self.subdirectory.is_some() && self.output_dir.is_none() {
            return Err(Error::Configuration(format!(
                "logger '{}': subdirectory requires an output_dir",
                self.name
            )));
        }
        if self.sweep_interval.is_zero() {
            return Err(Error::Configuration(format!(
                "logger '{}': sweep interval must be positive",
                self.name
            )));
        }
        if self.component_name.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "logger '{}': component name is empty",
                self.name
            )));
        }
        Ok(())
    }

    /// Directory the file sink writes into, if any
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.output_dir.as_ref().map(|dir| match &self.subdirectory {
            Some(sub) => dir.join(sub),
            None => dir.clone(),
        })
    }

    /// Check if this logger writes to the console only
    pub fn is_console_only(&self) -> bool {
        self.output_dir.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rotation_sizes() {
        assert_eq!("20 MB".parse::<Rotation>().unwrap(), Rotation::Size(20 * MB));
        assert_eq!("512KB".parse::<Rotation>().unwrap(), Rotation::Size(512 * 1024));
        assert_eq!("100 B".parse::<Rotation>().unwrap(), Rotation::Size(100));
        assert_eq!("5".parse::<Rotation>().unwrap(), Rotation::Size(5 * MB));
        assert_eq!("never".parse::<Rotation>().unwrap(), Rotation::Never);
    }

    #[test]
    fn test_parse_rotation_durations() {
        assert_eq!(
            "1 day".parse::<Rotation>().unwrap(),
            Rotation::Every(Duration::from_secs(86_400))
        );
        assert_eq!(
            "2 hours".parse::<Rotation>().unwrap(),
            Rotation::Every(Duration::from_secs(7_200))
        );
        assert_eq!(
            "1 month".parse::<Rotation>().unwrap(),
            Rotation::Every(Duration::from_secs(30 * 86_400))
        );
    }

    #[test]
    fn test_parse_rotation_rejects_garbage() {
        assert!("".parse::<Rotation>().is_err());
        assert!("big".parse::<Rotation>().is_err());
        assert!("10 parsecs".parse::<Rotation>().is_err());
        assert!("0 MB".parse::<Rotation>().is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(
            parse_duration("30 days", 1),
            Some(Duration::from_secs(30 * 86_400))
        );
        assert_eq!(
            parse_duration("12 weeks", 1),
            Some(Duration::from_secs(12 * 7 * 86_400))
        );
        assert_eq!(parse_duration("7", 86_400), Some(Duration::from_secs(7 * 86_400)));
        assert_eq!(parse_duration("0.5 s", 1), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("soon", 1), None);
    }

    #[test]
    fn test_resolve_defaults_are_console_only() {
        let config =
            LoggerConfig::resolve("svc", &ConfigOverrides::new(), &PresetBook::new()).unwrap();
        assert!(config.is_console_only());
        assert_eq!(config.level, Level::Info);
        assert_eq!(config.rotation, DEFAULT_ROTATION);
        assert_eq!(config.file_format, DEFAULT_FILE_FORMAT);
        assert!(!config.use_proxy);
        assert!(config.log_dir().is_none());
    }

    #[test]
    fn test_resolve_priority_overrides_beat_preset() {
        let overrides = ConfigOverrides::new()
            .preset("hourly")
            .retention("2 days")
            .level(Level::Debug);
        let config = LoggerConfig::resolve("svc", &overrides, &PresetBook::new()).unwrap();

        // From the preset
        assert_eq!(config.rotation, Rotation::Every(Duration::from_secs(3_600)));
        assert_eq!(config.file_format, "[{name}]hourly_latest.temp.log");
        // From the overrides
        assert_eq!(config.retention, Duration::from_secs(2 * 86_400));
        assert_eq!(config.level, Level::Debug);
        assert_eq!(config.preset.as_deref(), Some("hourly"));
    }

    #[test]
    fn test_resolve_unknown_preset_fails() {
        let overrides = ConfigOverrides::new().preset("hourlyy");
        let err = LoggerConfig::resolve("svc", &overrides, &PresetBook::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownPreset(_)));
    }

    #[test]
    fn test_resolve_contradictory_options_fail() {
        let books = PresetBook::new();

        let cleaner_without_dir = ConfigOverrides::new().start_cleaner(true);
        assert!(matches!(
            LoggerConfig::resolve("svc", &cleaner_without_dir, &books),
            Err(Error::Configuration(_))
        ));

        let sub_without_dir = ConfigOverrides::new().subdirectory("api");
        assert!(LoggerConfig::resolve("svc", &sub_without_dir, &books).is_err());

        let zero_interval = ConfigOverrides::new().sweep_interval("0");
        assert!(LoggerConfig::resolve("svc", &zero_interval, &books).is_err());

        let bad_rotation = ConfigOverrides::new().rotation("huge");
        assert!(LoggerConfig::resolve("svc", &bad_rotation, &books).is_err());

        assert!(LoggerConfig::resolve("  ", &ConfigOverrides::new(), &books).is_err());
    }

    #[test]
    fn test_log_dir_joins_subdirectory() {
        let overrides = ConfigOverrides::new()
            .output_dir("/var/log/app")
            .subdirectory("api");
        let config = LoggerConfig::resolve("svc", &overrides, &PresetBook::new()).unwrap();
        assert_eq!(config.log_dir(), Some(PathBuf::from("/var/log/app/api")));
    }

    #[test]
    fn test_overrides_from_toml() {
        let toml_str = r#"
            output_dir = "/tmp/logs"
            level = "warn"
            preset = "daily"
            use_proxy = true

            [tags]
            console_exclude = ["verbose"]
        "#;
        let overrides: ConfigOverrides = toml::from_str(toml_str).unwrap();
        assert_eq!(overrides.level, Some(Level::Warning));
        assert_eq!(overrides.use_proxy, Some(true));
        assert_eq!(
            overrides.tags.unwrap().console_exclude,
            vec!["verbose".to_string()]
        );
    }

    #[test]
    fn test_overrides_reject_unknown_keys() {
        let result: std::result::Result<ConfigOverrides, _> = toml::from_str("presett = \"daily\"");
        assert!(result.is_err());
    }
}
