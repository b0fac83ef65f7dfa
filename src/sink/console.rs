//! Console sink with optional ANSI level colors

use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crossterm::style::Stylize;

use crate::record::{Level, Record};

/// Where console output goes
#[derive(Debug, Clone, Default)]
pub enum ConsoleTarget {
    #[default]
    Stderr,
    Stdout,
    /// In-memory capture, used by tests and embedders
    Buffer(ConsoleCapture),
}

/// Shared in-memory console buffer
#[derive(Debug, Clone, Default)]
pub struct ConsoleCapture {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl ConsoleCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Captured output split into lines
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn clear(&self) {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn append(&self, data: &[u8]) {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
    }
}

/// Console output stream of a single handle
#[derive(Debug)]
pub struct ConsoleSink {
    target: ConsoleTarget,
    ansi: bool,
}

impl ConsoleSink {
    /// Create a sink; colors are enabled when writing to a terminal
    pub fn new(target: ConsoleTarget) -> Self {
        let ansi = match &target {
            ConsoleTarget::Stderr => io::stderr().is_terminal(),
            ConsoleTarget::Stdout => io::stdout().is_terminal(),
            ConsoleTarget::Buffer(_) => false,
        };
        Self { target, ansi }
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Write one record
    pub fn write_record(&mut self, logger: &str, record: &Record) -> io::Result<()> {
        let line = if self.ansi {
            styled_line(logger, record)
        } else {
            record.format_line(logger)
        };
        self.write_text(&line)
    }

    /// Write pre-rendered text followed by a newline
    pub fn write_text(&mut self, text: &str) -> io::Result<()> {
        match &self.target {
            ConsoleTarget::Stderr => {
                let mut out = io::stderr().lock();
                writeln!(out, "{}", text)
            }
            ConsoleTarget::Stdout => {
                let mut out = io::stdout().lock();
                writeln!(out, "{}", text)
            }
            ConsoleTarget::Buffer(capture) => {
                capture.append(text.as_bytes());
                capture.append(b"\n");
                Ok(())
            }
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match &self.target {
            ConsoleTarget::Stderr => io::stderr().flush(),
            ConsoleTarget::Stdout => io::stdout().flush(),
            ConsoleTarget::Buffer(_) => Ok(()),
        }
    }
}

fn styled_line(logger: &str, record: &Record) -> String {
    let level = format!("{:<8}", record.level.as_str());
    let level = match record.level {
        Level::Trace => level.dark_grey(),
        Level::Debug => level.blue(),
        Level::Info => level.white(),
        Level::Success => level.green(),
        Level::Warning => level.yellow(),
        Level::Error => level.red(),
        Level::Critical => level.red().bold(),
    };

    let mut line = format!(
        "{} | {} | {} - {}",
        record
            .timestamp
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .green(),
        level,
        logger.cyan(),
        record.message
    );
    record.append_context(&mut line);
    line
}
