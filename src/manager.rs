//! Logger lifecycle: creation, lookup, reinitialization and teardown
//!
//! `LoggerManager` ties the registry, the event bus, the sweeper supervisor
//! and the preset book together. Builds and registry updates for all names
//! are serialized by one lock; `handle_updated` events are published after
//! that lock is released, so subscribers may call back into the manager.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Error, Result};
use crate::events::{Event, EventBus};
use crate::handle::{ConcreteHandle, Handle, ProxyHandle};
use crate::logger_config::{ConfigOverrides, LoggerConfig};
use crate::naming::{FileNamer, TemplateNamer};
use crate::preset::{Preset, PresetBook};
use crate::registry::HandleRegistry;
use crate::render::{BlockRenderer, PlainRenderer};
use crate::retention::{SweeperSupervisor, SweeperTask};
use crate::sink::ConsoleTarget;

/// Name of the logger returned by `default_handle`
pub const DEFAULT_LOGGER_NAME: &str = "default_service";

/// Creates, tracks and replaces named logger handles
pub struct LoggerManager {
    registry: HandleRegistry,
    bus: Arc<EventBus>,
    sweepers: SweeperSupervisor,
    presets: PresetBook,
    namer: Arc<dyn FileNamer>,
    renderer: Arc<dyn BlockRenderer>,
    console: ConsoleTarget,
    build_lock: Mutex<()>,
}

impl std::fmt::Debug for LoggerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerManager")
            .field("loggers", &self.registry.list_names())
            .field("sweepers", &self.sweepers.active_count())
            .finish()
    }
}

impl Default for LoggerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerManager {
    /// Manager writing console output to stderr with the built-in collaborators
    pub fn new() -> Self {
        Self {
            registry: HandleRegistry::new(),
            bus: Arc::new(EventBus::new()),
            sweepers: SweeperSupervisor::new(),
            presets: PresetBook::new(),
            namer: Arc::new(TemplateNamer::new()),
            renderer: Arc::new(PlainRenderer),
            console: ConsoleTarget::default(),
            build_lock: Mutex::new(()),
        }
    }

    /// Send console output of handles built from now on to `console`
    pub fn with_console(mut self, console: ConsoleTarget) -> Self {
        self.console = console;
        self
    }

    pub fn with_namer(mut self, namer: Arc<dyn FileNamer>) -> Self {
        self.namer = namer;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn BlockRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn sweepers(&self) -> &SweeperSupervisor {
        &self.sweepers
    }

    pub fn presets(&self) -> &PresetBook {
        &self.presets
    }

    /// Register a custom preset usable by later builds
    pub fn register_preset(&self, name: impl Into<String>, preset: Preset) -> Result<()> {
        self.presets.register(name, preset)
    }

    pub fn list_presets(&self) -> Vec<String> {
        self.presets.names()
    }

    /// Return the handle registered under `name`, building it if absent
    pub fn get_or_create(&self, name: &str, overrides: &ConfigOverrides) -> Result<Handle> {
        self.create(name, overrides, false)
    }

    /// Always build a new handle for `name`
    ///
    /// An existing entry is superseded exactly as `reinit` would.
    pub fn get_or_create_forced(&self, name: &str, overrides: &ConfigOverrides) -> Result<Handle> {
        self.create(name, overrides, true)
    }

    /// Shared implementation of the two `get_or_create` flavors
    pub fn create(&self, name: &str, overrides: &ConfigOverrides, force: bool) -> Result<Handle> {
        let name = name.trim();
        let (handle, announce) = {
            let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let existing = self.registry.lookup(name);
            if let (Some(existing), false) = (&existing, force) {
                return Ok(existing.clone());
            }

            let concrete = self.build(name, overrides)?;
            match existing {
                Some(previous) => {
                    let (handle, displaced) =
                        self.supersede(name, &previous, Arc::clone(&concrete));
                    (handle, Some((concrete, previous, displaced)))
                }
                None => {
                    let handle = self.wrap(name, concrete);
                    self.registry.register(name, handle.clone());
                    tracing::debug!(logger = %name, proxy = handle.is_proxy(), "Created logger");
                    (handle, None)
                }
            }
        };

        if let Some((concrete, previous, displaced)) = announce {
            self.announce(name, concrete);
            drop((previous, displaced));
        }
        Ok(handle)
    }

    /// Rebuild the logger `name` from `overrides` and repoint every proxy
    ///
    /// Returns `None` (with a warning) if `name` was never created or the
    /// new configuration is invalid; the previous entry is then untouched.
    pub fn reinit(&self, name: &str, overrides: &ConfigOverrides) -> Option<Handle> {
        match self.try_reinit(name, overrides) {
            Ok(handle) => Some(handle),
            Err(Error::NotFound(name)) => {
                tracing::warn!(logger = %name, "Cannot reinitialize unknown logger");
                None
            }
            Err(e) => {
                tracing::warn!(logger = %name, error = %e, "Logger reinitialization failed");
                None
            }
        }
    }

    /// `reinit` with the failure reason
    pub fn try_reinit(&self, name: &str, overrides: &ConfigOverrides) -> Result<Handle> {
        let name = name.trim();
        let (handle, concrete, previous, displaced) = {
            let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let previous = self
                .registry
                .lookup(name)
                .ok_or_else(|| Error::NotFound(name.to_string()))?;
            let concrete = self.build(name, overrides)?;
            let (handle, displaced) = self.supersede(name, &previous, Arc::clone(&concrete));
            (handle, concrete, previous, displaced)
        };

        tracing::info!(
            logger = %name,
            generation = concrete.generation(),
            "Reinitialized logger"
        );
        self.announce(name, concrete);
        drop((previous, displaced));
        Ok(handle)
    }

    pub fn get(&self, name: &str) -> Option<Handle> {
        self.registry.lookup(name.trim())
    }

    /// Forget `name`; existing holders keep their handle until they drop it
    pub fn unregister(&self, name: &str) -> bool {
        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.registry.unregister(name.trim())
    }

    pub fn list_names(&self) -> Vec<String> {
        self.registry.list_names()
    }

    /// A proxy following `name` across reinitialization
    ///
    /// If the slot already holds a proxy, that proxy is returned; otherwise
    /// a new, unregistered proxy is bound to the current concrete handle.
    pub fn proxy(&self, name: &str) -> Option<ProxyHandle> {
        let name = name.trim();
        match self.registry.lookup(name)? {
            Handle::Proxy(proxy) => Some(proxy),
            Handle::Concrete(concrete) => Some(ProxyHandle::new(name, concrete, &self.bus)),
        }
    }

    /// The `default_service` logger, created with defaults on first use
    pub fn default_handle(&self) -> Result<Handle> {
        self.get_or_create(DEFAULT_LOGGER_NAME, &ConfigOverrides::new())
    }

    /// Stop every sweeper, flush and drop every registered handle
    pub fn shutdown(&self) {
        self.sweepers.stop_all();
        let handles = {
            let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.registry.clear()
        };
        for handle in &handles {
            handle.resolve().flush();
        }
        tracing::debug!(count = handles.len(), "Logger manager shut down");
    }

    fn build(&self, name: &str, overrides: &ConfigOverrides) -> Result<Arc<ConcreteHandle>> {
        let config = LoggerConfig::resolve(name, overrides, &self.presets)?;
        let task = if config.start_cleaner {
            SweeperTask::for_logger(&config)
        } else {
            None
        };

        let handle = ConcreteHandle::new(
            config,
            self.console.clone(),
            Arc::clone(&self.namer),
            Arc::clone(&self.renderer),
        )?;

        if let Some(task) = task {
            // A rebuild of a logger keeps the sweeper already covering its directory
            if self.sweepers.is_running(&task.dir) {
                tracing::debug!(dir = %task.dir.display(), "Retention sweeper already covers directory");
            } else {
                self.sweepers.start(task)?;
            }
        }
        Ok(Arc::new(handle))
    }

    fn wrap(&self, name: &str, concrete: Arc<ConcreteHandle>) -> Handle {
        if concrete.config().use_proxy {
            Handle::Proxy(ProxyHandle::new(name, concrete, &self.bus))
        } else {
            Handle::Concrete(concrete)
        }
    }

    /// Put `concrete` in place of `previous`; caller holds the build lock
    ///
    /// Also returns the handle a proxy slot let go of. The caller drops it
    /// only after `handle_updated` has been published.
    fn supersede(
        &self,
        name: &str,
        previous: &Handle,
        concrete: Arc<ConcreteHandle>,
    ) -> (Handle, Option<Arc<ConcreteHandle>>) {
        match previous {
            Handle::Proxy(proxy) => {
                let displaced = proxy.update_target(&Handle::Concrete(concrete));
                (previous.clone(), displaced)
            }
            Handle::Concrete(_) => {
                let handle = self.wrap(name, concrete);
                self.registry.register(name, handle.clone());
                (handle, None)
            }
        }
    }

    fn announce(&self, name: &str, concrete: Arc<ConcreteHandle>) {
        let event = Event::handle_updated(name, Handle::Concrete(concrete));
        self.bus.publish(&event);
    }
}
