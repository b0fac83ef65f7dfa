//! Output sinks
//!
//! A concrete handle owns one console sink and, when an output directory is
//! configured, one file sink. Sinks are never shared between handles.

mod console;
mod file;

pub use console::{ConsoleCapture, ConsoleSink, ConsoleTarget};
pub use file::{FileSink, FileSinkOptions};
