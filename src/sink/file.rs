//! Append-only file sink with rotation
//!
//! The active file is opened in append mode. When the next write would push
//! it past the size threshold, or the rotation interval has elapsed, the
//! active file is renamed to an archive name produced by the `FileNamer`,
//! optionally gzipped, and a fresh file is opened in its place.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local};
use flate2::write::GzEncoder;

use crate::error::{Error, Result};
use crate::logger_config::{Compression, LoggerConfig, Rotation};
use crate::naming::FileNamer;

/// Everything a file sink needs to open and rotate its file
#[derive(Debug, Clone)]
pub struct FileSinkOptions {
    pub dir: PathBuf,
    /// Name substituted for `{name}` in templates
    pub base_name: String,
    pub file_format: String,
    pub archive_format: Option<String>,
    pub rotation: Rotation,
    pub compression: Compression,
}

impl FileSinkOptions {
    /// Options for the file sink of `config`, if it writes to disk at all
    pub fn from_config(config: &LoggerConfig) -> Option<Self> {
        config.log_dir().map(|dir| Self {
            dir,
            base_name: config.component_name.clone(),
            file_format: config.file_format.clone(),
            archive_format: config.archive_format.clone(),
            rotation: config.rotation,
            compression: config.compression,
        })
    }
}

/// File output stream of a single handle
pub struct FileSink {
    options: FileSinkOptions,
    namer: Arc<dyn FileNamer>,
    path: PathBuf,
    file: Option<File>,
    size: u64,
    opened_at: Instant,
    /// Wall-clock open time; archive templates describe the period the file covered
    opened_wall: DateTime<Local>,
}

impl std::fmt::Debug for FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSink")
            .field("path", &self.path)
            .field("size", &self.size)
            .field("rotation", &self.options.rotation)
            .finish()
    }
}

impl FileSink {
    /// Create the directory and open the active file for appending
    pub fn open(options: FileSinkOptions, namer: Arc<dyn FileNamer>) -> Result<Self> {
        fs::create_dir_all(&options.dir).map_err(|e| Error::sink_io(&options.dir, e))?;

        let now = Local::now();
        let file_name = namer.name_for(&options.base_name, now, &options.file_format);
        let path = options.dir.join(file_name);
        let (file, size) = open_append(&path).map_err(|e| Error::sink_io(&path, e))?;

        Ok(Self {
            options,
            namer,
            path,
            file: Some(file),
            size,
            opened_at: Instant::now(),
            opened_wall: now,
        })
    }

    /// Path of the active file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line, rotating first if needed
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let len = line.len() as u64 + 1;
        if self.should_rotate(len) {
            self.rotate()?;
        }

        if self.file.is_none() {
            let (file, size) = open_append(&self.path).map_err(|e| Error::sink_io(&self.path, e))?;
            self.file = Some(file);
            self.size = size;
        }

        if let Some(file) = self.file.as_mut() {
            file.write_all(line.as_bytes())
                .and_then(|_| file.write_all(b"\n"))
                .map_err(|e| Error::sink_io(&self.path, e))?;
            self.size = self.size.saturating_add(len);
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush().map_err(|e| Error::sink_io(&self.path, e))?;
        }
        Ok(())
    }

    fn should_rotate(&self, incoming: u64) -> bool {
        match self.options.rotation {
            Rotation::Never => false,
            Rotation::Size(max) => self.size > 0 && self.size.saturating_add(incoming) > max,
            Rotation::Every(interval) => self.opened_at.elapsed() >= interval,
        }
    }

    /// Move the active file aside and start a new one
    ///
    /// Returns the path of the archived file.
    pub fn rotate(&mut self) -> Result<PathBuf> {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }

        let archive = self.archive_path();
        let result = fs::rename(&self.path, &archive);

        // Whatever happened to the rename, keep logging to the active path.
        let (file, size) = open_append(&self.path).map_err(|e| Error::sink_io(&self.path, e))?;
        self.file = Some(file);
        self.size = size;
        self.opened_at = Instant::now();
        self.opened_wall = Local::now();

        result.map_err(|e| Error::sink_io(&archive, e))?;
        tracing::debug!(
            active = %self.path.display(),
            archive = %archive.display(),
            "Rotated log file"
        );

        match self.options.compression {
            Compression::None => Ok(archive),
            Compression::Gzip => compress_file(&archive),
        }
    }

    fn archive_path(&self) -> PathBuf {
        let stem = match &self.options.archive_format {
            Some(template) => {
                self.namer
                    .name_for(&self.options.base_name, self.opened_wall, template)
            }
            None => {
                let active_stem = self
                    .path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| self.options.base_name.clone());
                format!("{}.{}", active_stem, Local::now().format("%Y%m%d-%H%M%S"))
            }
        };

        let mut candidate = self.options.dir.join(format!("{}.log", stem));
        let mut counter = 1;
        while candidate.exists() || candidate.with_extension("log.gz").exists() {
            candidate = self.options.dir.join(format!("{}.{}.log", stem, counter));
            counter += 1;
        }
        candidate
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

fn open_append(path: &Path) -> io::Result<(File, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// Gzip `path` into `path.gz` and remove the plain file
fn compress_file(path: &Path) -> Result<PathBuf> {
    let gz_path = path.with_extension("log.gz");

    let content = fs::read(path).map_err(|e| Error::sink_io(path, e))?;
    let file = File::create(&gz_path).map_err(|e| Error::sink_io(&gz_path, e))?;
    let mut encoder = GzEncoder::new(file, flate2::Compression::default());
    encoder
        .write_all(&content)
        .and_then(|_| encoder.finish().map(|_| ()))
        .map_err(|e| Error::sink_io(&gz_path, e))?;

    fs::remove_file(path).map_err(|e| Error::sink_io(path, e))?;
    tracing::debug!(archive = %gz_path.display(), "Compressed rotated log file");
    Ok(gz_path)
}
