use std::io::Read;

use anyhow::{Context, Result};

use logwarden::config::{self, Settings};
use logwarden::{logging, Emit, LoggerManager};

fn main() -> Result<()> {
    let settings = Settings::load()?;

    // Initialize tracing BEFORE any logger is built
    logging::init_tracing(settings.verbose);
    tracing::debug!(path = %config::config_file_path().display(), "Loaded settings");

    let manager = LoggerManager::new();
    for name in settings.loggers.keys() {
        let Some(overrides) = settings.overrides_for(name) else {
            continue;
        };
        let handle = manager
            .get_or_create(name, &overrides)
            .with_context(|| format!("Failed to create logger '{}'", name))?;
        handle.info("logger started");
    }

    if settings.loggers.is_empty() {
        tracing::warn!(
            path = %config::config_file_path().display(),
            "No loggers defined; add [loggers.<name>] tables to the config file"
        );
    } else {
        tracing::info!(
            loggers = ?manager.list_names(),
            sweepers = manager.sweepers().active_count(),
            "Running; close stdin to stop"
        );
    }

    // Block until stdin is closed (Ctrl-D)
    let mut sink = Vec::new();
    std::io::stdin()
        .read_to_end(&mut sink)
        .context("Failed to read stdin")?;

    manager.shutdown();
    Ok(())
}
