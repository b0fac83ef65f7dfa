//! Log records and severity levels
//!
//! A `Record` is what a handle hands to its sinks: level, message, optional
//! destination marker, free-form tags, and structured context.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Structured key/value context attached to a record
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Severity of a log record, ordered from least to most severe
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum Level {
    Trace,
    Debug,
    #[default]
    Info,
    Success,
    Warning,
    Error,
    Critical,
}

impl Level {
    /// Get the display name for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Success => "SUCCESS",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    /// Check if this level is a warning or worse
    pub fn is_alert(&self) -> bool {
        *self >= Level::Warning
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Level::Trace),
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "SUCCESS" => Ok(Level::Success),
            "WARN" | "WARNING" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" | "FATAL" => Ok(Level::Critical),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl TryFrom<String> for Level {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        level.as_str().to_string()
    }
}

/// Explicit single-destination marker carried by a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    /// No marker: tag rules decide
    #[default]
    Everywhere,
    ConsoleOnly,
    FileOnly,
}

/// A single log record
#[derive(Debug, Clone)]
pub struct Record {
    /// When the record was created
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub message: String,
    /// Explicit destination marker
    pub destination: Destination,
    /// Free-form tags consulted by the destination filters
    pub tags: Vec<String>,
    /// Structured context rendered after the message
    pub context: Context,
}

impl Record {
    /// Create a new untagged record with no destination marker
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: message.into(),
            destination: Destination::Everywhere,
            tags: Vec::new(),
            context: Context::new(),
        }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Check whether the record carries any of the given tags
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }

    /// Render the record as a single plain-text line
    ///
    /// Format: `2026-01-21 14:30:45 | INFO     | svc - message key=value`
    pub fn format_line(&self, logger: &str) -> String {
        let mut line = format!(
            "{} | {:<8} | {} - {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level.as_str(),
            logger,
            self.message
        );
        self.append_context(&mut line);
        line
    }

    /// Append `key=value` pairs for the structured context
    pub(crate) fn append_context(&self, line: &mut String) {
        for (key, value) in &self.context {
            line.push(' ');
            line.push_str(key);
            line.push('=');
            match value {
                serde_json::Value::String(s) => line.push_str(s),
                other => line.push_str(&other.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Info < Level::Success);
        assert!(Level::Success < Level::Warning);
        assert!(Level::Error < Level::Critical);
    }

    #[test]
    fn test_level_parse_aliases() {
        assert_eq!("warn".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("WARNING".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!(" debug ".parse::<Level>().unwrap(), Level::Debug);
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_try_from_string() {
        assert_eq!(Level::try_from("error".to_string()), Ok(Level::Error));
        assert_eq!(Level::try_from("fatal".to_string()), Ok(Level::Critical));
        let err = Level::try_from("loud".to_string()).unwrap_err();
        assert!(err.contains("loud"), "{}", err);
    }

    #[test]
    fn test_level_is_alert() {
        assert!(!Level::Info.is_alert());
        assert!(!Level::Success.is_alert());
        assert!(Level::Warning.is_alert());
        assert!(Level::Critical.is_alert());
    }

    #[test]
    fn test_format_line_with_context() {
        let mut context = Context::new();
        context.insert("user".to_string(), json!("alice"));
        context.insert("attempt".to_string(), json!(3));

        let record = Record::new(Level::Warning, "login failed").with_context(context);
        let line = record.format_line("auth");

        assert!(line.contains("| WARNING  | auth - login failed"));
        assert!(line.contains("user=alice"));
        assert!(line.contains("attempt=3"));
    }

    #[test]
    fn test_has_any_tag() {
        let record = Record::new(Level::Info, "x").with_tags(["api", "slow"]);
        assert!(record.has_any_tag(&["slow".to_string()]));
        assert!(!record.has_any_tag(&["db".to_string()]));
        assert!(!record.has_any_tag(&[]));
    }
}
