//! logwarden - named logging handles that survive reconfiguration
//!
//! Loggers are created by name through a [`LoggerManager`]. Code that holds
//! a proxy handle keeps logging to the current configuration even after the
//! logger is reinitialized elsewhere. Loggers writing to disk can start a
//! background sweeper that deletes files past their retention age.
//!
//! ```no_run
//! use logwarden::{ConfigOverrides, Emit};
//!
//! let log = logwarden::get_or_create(
//!     "api",
//!     &ConfigOverrides::new().output_dir("/tmp/logs").use_proxy(true),
//! )?;
//! log.info("listening");
//!
//! logwarden::reinit("api", &ConfigOverrides::new().output_dir("/tmp/other").use_proxy(true));
//! log.info("now written under /tmp/other");
//! # Ok::<(), logwarden::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod handle;
pub mod logger_config;
pub mod logging;
pub mod manager;
pub mod naming;
pub mod preset;
pub mod record;
pub mod registry;
pub mod render;
pub mod retention;
pub mod sink;

use std::sync::OnceLock;

pub use error::{Error, Result};
pub use events::{Event, EventBus, SubscriptionId, HANDLE_UPDATED};
pub use filter::{DestinationFilter, SinkKind, TagRules};
pub use handle::{Bound, ConcreteHandle, Emit, Handle, ProxyHandle};
pub use logger_config::{Compression, ConfigOverrides, LoggerConfig, Rotation};
pub use manager::{LoggerManager, DEFAULT_LOGGER_NAME};
pub use naming::{FileNamer, TemplateNamer};
pub use preset::{Preset, PresetBook};
pub use record::{Context, Destination, Level, Record};
pub use registry::HandleRegistry;
pub use render::{BlockRenderer, PlainRenderer};
pub use retention::{RetentionSweeper, SweepReport, SweeperSupervisor, SweeperTask};
pub use sink::{ConsoleCapture, ConsoleTarget};

static GLOBAL: OnceLock<LoggerManager> = OnceLock::new();

/// The process-wide manager, built on first use
pub fn global() -> &'static LoggerManager {
    GLOBAL.get_or_init(LoggerManager::new)
}

/// [`LoggerManager::get_or_create`] on the global manager
pub fn get_or_create(name: &str, overrides: &ConfigOverrides) -> Result<Handle> {
    global().get_or_create(name, overrides)
}

/// [`LoggerManager::reinit`] on the global manager
pub fn reinit(name: &str, overrides: &ConfigOverrides) -> Option<Handle> {
    global().reinit(name, overrides)
}

pub fn get(name: &str) -> Option<Handle> {
    global().get(name)
}

pub fn unregister(name: &str) -> bool {
    global().unregister(name)
}

pub fn list_names() -> Vec<String> {
    global().list_names()
}

pub fn list_presets() -> Vec<String> {
    global().list_presets()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_free_functions() {
        let name = "lib-test-global";
        let handle = get_or_create(name, &ConfigOverrides::new()).unwrap();
        assert!(get(name).unwrap().same_as(&handle));
        assert!(list_names().contains(&name.to_string()));
        assert!(reinit(name, &ConfigOverrides::new()).is_some());
        assert!(unregister(name));
        assert!(reinit(name, &ConfigOverrides::new()).is_none());
        assert!(list_presets().contains(&"daily".to_string()));
    }
}
