//! File naming collaborator
//!
//! The file sink asks a `FileNamer` for the active file name and for the
//! name of each rotated archive. `TemplateNamer` is the built-in
//! implementation: `{placeholder}` substitution plus removal of characters
//! that are illegal in file names.

use chrono::{DateTime, Datelike, Local};

/// Produces a file name for a base name at a point in time
pub trait FileNamer: Send + Sync {
    /// Render `template` for `base_name` at `timestamp`
    fn name_for(&self, base_name: &str, timestamp: DateTime<Local>, template: &str) -> String;
}

/// Characters replaced with `_` in generated file names
const ILLEGAL_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Template-based file namer
///
/// Supported placeholders: `{name}` (also `{component_name}`, `{process_id}`),
/// `{timestamp}`, `{date}`, `{time}`, `{year}`, `{month}`, `{day}`, `{hour}`,
/// `{minute}`, `{second}`, `{week}` (ISO week).
#[derive(Debug, Clone)]
pub struct TemplateNamer {
    timestamp_format: String,
}

impl Default for TemplateNamer {
    fn default() -> Self {
        Self {
            timestamp_format: "%Y%m%d-%H%M%S".to_string(),
        }
    }
}

impl TemplateNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom strftime format for `{timestamp}`
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }
}

impl FileNamer for TemplateNamer {
    fn name_for(&self, base_name: &str, timestamp: DateTime<Local>, template: &str) -> String {
        let replacements = [
            ("{name}", base_name.to_string()),
            ("{component_name}", base_name.to_string()),
            ("{process_id}", base_name.to_string()),
            (
                "{timestamp}",
                timestamp.format(&self.timestamp_format).to_string(),
            ),
            ("{date}", timestamp.format("%Y%m%d").to_string()),
            ("{time}", timestamp.format("%H%M%S").to_string()),
            ("{year}", timestamp.format("%Y").to_string()),
            ("{month}", timestamp.format("%m").to_string()),
            ("{day}", timestamp.format("%d").to_string()),
            ("{hour}", timestamp.format("%H").to_string()),
            ("{minute}", timestamp.format("%M").to_string()),
            ("{second}", timestamp.format("%S").to_string()),
            ("{week}", format!("{:02}", timestamp.iso_week().week())),
        ];

        let mut name = template.to_string();
        for (placeholder, value) in &replacements {
            if name.contains(placeholder) {
                name = name.replace(placeholder, value);
            }
        }

        sanitize_file_name(&name)
    }
}

/// Replace characters that are not allowed in file names
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 1, 21, 14, 30, 45).unwrap()
    }

    #[test]
    fn test_default_template() {
        let name = TemplateNamer::new().name_for("api", fixed_time(), "[{name}]{timestamp}.log");
        assert_eq!(name, "[api]20260121-143045.log");
    }

    #[test]
    fn test_date_parts() {
        let namer = TemplateNamer::new();
        assert_eq!(
            namer.name_for("api", fixed_time(), "[{name}]{date}_{hour}{minute}"),
            "[api]20260121_1430"
        );
        assert_eq!(
            namer.name_for("api", fixed_time(), "[{name}]week{week}_{year}"),
            "[api]week04_2026"
        );
        assert_eq!(
            namer.name_for("api", fixed_time(), "{year}{month}{day}-{time}"),
            "20260121-143045"
        );
    }

    #[test]
    fn test_custom_timestamp_format() {
        let namer = TemplateNamer::new().with_timestamp_format("%Y-%m-%d");
        assert_eq!(
            namer.name_for("db", fixed_time(), "{name}_{timestamp}.log"),
            "db_2026-01-21.log"
        );
    }

    #[test]
    fn test_illegal_characters_replaced() {
        let name = TemplateNamer::new().name_for("a/b:c", fixed_time(), "{name}.log");
        assert_eq!(name, "a_b_c.log");
        assert_eq!(sanitize_file_name("x*y?z"), "x_y_z");
    }
}
