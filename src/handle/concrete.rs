use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use super::Emit;
use crate::error::Result;
use crate::filter::DestinationFilter;
use crate::logger_config::LoggerConfig;
use crate::naming::FileNamer;
use crate::record::{Level, Record};
use crate::render::BlockRenderer;
use crate::sink::{ConsoleSink, ConsoleTarget, FileSink, FileSinkOptions};

/// Monotonic across the process; later builds always compare greater
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// A live logger built from one immutable configuration
///
/// Owns its console sink and, when the configuration has an output
/// directory, its file sink. Both are flushed when the handle is dropped.
pub struct ConcreteHandle {
    id: Uuid,
    generation: u64,
    config: Arc<LoggerConfig>,
    console: Mutex<ConsoleSink>,
    console_filter: DestinationFilter,
    file: Option<Mutex<FileSink>>,
    file_filter: DestinationFilter,
    renderer: Arc<dyn BlockRenderer>,
}

impl std::fmt::Debug for ConcreteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcreteHandle")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("generation", &self.generation)
            .field("file", &self.file_path())
            .finish()
    }
}

impl ConcreteHandle {
    /// Build a handle and open its sinks
    pub fn new(
        config: LoggerConfig,
        console: ConsoleTarget,
        namer: Arc<dyn FileNamer>,
        renderer: Arc<dyn BlockRenderer>,
    ) -> Result<Self> {
        let file = match FileSinkOptions::from_config(&config) {
            Some(options) => Some(Mutex::new(FileSink::open(options, namer)?)),
            None => None,
        };
        let (console_filter, file_filter) = DestinationFilter::pair(config.tags.clone());

        Ok(Self {
            id: Uuid::new_v4(),
            generation: NEXT_GENERATION.fetch_add(1, Ordering::SeqCst),
            config: Arc::new(config),
            console: Mutex::new(ConsoleSink::new(console)),
            console_filter,
            file,
            file_filter,
            renderer,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Build order of this handle; a reinit always yields a larger value
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &Arc<LoggerConfig> {
        &self.config
    }

    pub fn level(&self) -> Level {
        self.config.level
    }

    /// Path of the active log file, if this handle writes to disk
    pub fn file_path(&self) -> Option<PathBuf> {
        self.file.as_ref().map(|file| {
            file.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .path()
                .to_path_buf()
        })
    }

    pub fn flush(&self) {
        if let Err(e) = self
            .console
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
        {
            tracing::warn!(logger = %self.config.name, error = %e, "Failed to flush console");
        }
        if let Some(file) = &self.file {
            if let Err(e) = file.lock().unwrap_or_else(PoisonError::into_inner).flush() {
                tracing::warn!(logger = %self.config.name, error = %e, "Failed to flush log file");
            }
        }
    }

    fn write_console(&self, record: &Record, text: Option<&str>) {
        if !self.console_filter.allows(record) {
            return;
        }
        let mut console = self.console.lock().unwrap_or_else(PoisonError::into_inner);
        let result = match text {
            Some(text) => console.write_text(text),
            None => console.write_record(&self.config.name, record),
        };
        if let Err(e) = result {
            tracing::warn!(logger = %self.config.name, error = %e, "Console write failed");
        }
    }

    fn write_file(&self, record: &Record, text: Option<&str>) {
        let Some(file) = &self.file else {
            return;
        };
        if !self.file_filter.allows(record) {
            return;
        }
        let line = match text {
            Some(text) => text.to_string(),
            None => record.format_line(&self.config.name),
        };
        let result = file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_line(&line);
        if let Err(e) = result {
            tracing::warn!(logger = %self.config.name, error = %e, "Dropped record for file sink");
        }
    }
}

impl Emit for ConcreteHandle {
    fn log(&self, record: Record) {
        if record.level < self.config.level {
            return;
        }
        self.write_console(&record, None);
        self.write_file(&record, None);
    }

    fn block(&self, title: &str, lines: &[String], style: &str, level: Level) {
        if level < self.config.level {
            return;
        }
        let rendered = self.renderer.render_block(title, lines, style);
        let record = Record::new(level, title);
        self.write_console(&record, Some(&rendered));
        self.write_file(&record, Some(&rendered));
    }
}

impl Drop for ConcreteHandle {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::TagRules;
    use crate::logger_config::ConfigOverrides;
    use crate::naming::TemplateNamer;
    use crate::preset::PresetBook;
    use crate::render::PlainRenderer;
    use crate::sink::ConsoleCapture;
    use std::fs;
    use tempfile::TempDir;

    fn build(name: &str, overrides: ConfigOverrides) -> (ConcreteHandle, ConsoleCapture) {
        let capture = ConsoleCapture::new();
        let config = LoggerConfig::resolve(name, &overrides, &PresetBook::new()).unwrap();
        let handle = ConcreteHandle::new(
            config,
            ConsoleTarget::Buffer(capture.clone()),
            Arc::new(TemplateNamer::new()),
            Arc::new(PlainRenderer),
        )
        .unwrap();
        (handle, capture)
    }

    #[test]
    fn test_console_only_without_output_dir() {
        let (handle, capture) = build("svc", ConfigOverrides::new());
        handle.info("hello");

        assert!(handle.file_path().is_none());
        assert_eq!(capture.lines().len(), 1);
    }

    #[test]
    fn test_writes_file_with_preset_name() {
        let temp_dir = TempDir::new().unwrap();
        let (handle, capture) = build(
            "svc",
            ConfigOverrides::new()
                .output_dir(temp_dir.path())
                .preset("simple"),
        );

        handle.info("to both");
        handle.console_info("console");
        handle.file_info("file");
        handle.flush();

        let path = handle.file_path().unwrap();
        assert_eq!(path, temp_dir.path().join("svc.log"));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("svc - to both"));
        assert!(content.contains("svc - file"));
        assert!(!content.contains("svc - console"));

        let console = capture.contents();
        assert!(console.contains("svc - to both"));
        assert!(console.contains("svc - console"));
        assert!(!console.contains("svc - file"));
    }

    #[test]
    fn test_tag_rules_gate_sinks() {
        let temp_dir = TempDir::new().unwrap();
        let rules = TagRules {
            console_exclude: vec!["noisy".to_string()],
            ..Default::default()
        };
        let (handle, capture) = build(
            "svc",
            ConfigOverrides::new()
                .output_dir(temp_dir.path())
                .preset("simple")
                .tags(rules),
        );

        handle.info_t("chatter", &["noisy"]);
        handle.flush();

        assert!(capture.contents().is_empty());
        let content = fs::read_to_string(handle.file_path().unwrap()).unwrap();
        assert!(content.contains("chatter"));
    }

    #[test]
    fn test_generations_increase() {
        let (a, _) = build("svc", ConfigOverrides::new());
        let (b, _) = build("svc", ConfigOverrides::new());
        assert!(b.generation() > a.generation());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_file_write_failure_still_reaches_console() {
        let temp_dir = TempDir::new().unwrap();
        let (handle, capture) = build(
            "svc",
            ConfigOverrides::new()
                .output_dir(temp_dir.path().join("logs"))
                .preset("simple")
                .rotation("8 B"),
        );

        handle.info("first");
        let dir = handle.file_path().unwrap().parent().unwrap().to_path_buf();
        fs::remove_dir_all(&dir).unwrap();

        // Rotation cannot reopen the file, so only the file copy is lost
        handle.info("second");
        handle.error("third");

        let console = capture.contents();
        assert!(console.contains("svc - first"));
        assert!(console.contains("svc - second"));
        assert!(console.contains("svc - third"));
        assert_eq!(capture.lines().len(), 3);
        assert!(!dir.exists());
    }

    #[test]
    fn test_unwritable_directory_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not_a_dir");
        fs::write(&blocker, "x").unwrap();

        let config = LoggerConfig::resolve(
            "svc",
            &ConfigOverrides::new().output_dir(&blocker),
            &PresetBook::new(),
        )
        .unwrap();
        let result = ConcreteHandle::new(
            config,
            ConsoleTarget::Buffer(ConsoleCapture::new()),
            Arc::new(TemplateNamer::new()),
            Arc::new(PlainRenderer),
        );
        assert!(matches!(result, Err(crate::Error::SinkIo { .. })));
    }
}
