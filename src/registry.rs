//! Name → handle registry

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::handle::Handle;

/// Process-wide map from logger name to its currently active handle
///
/// At most one entry per name. Registration overwrites silently; it is up
/// to the caller (the manager) to announce replacements on the event bus.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    entries: Mutex<HashMap<String, Handle>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `name`
    pub fn register(&self, name: &str, handle: Handle) {
        self.replace(name, handle);
    }

    /// Insert or overwrite, returning the previous entry
    pub(crate) fn replace(&self, name: &str, handle: Handle) -> Option<Handle> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), handle)
    }

    pub fn lookup(&self, name: &str) -> Option<Handle> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Remove the entry for `name`; false if there was none
    ///
    /// Holders of the handle keep using it until they drop it.
    pub fn unregister(&self, name: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    /// Registered names, sorted
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry, returning the removed handles
    pub fn clear(&self) -> Vec<Handle> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, handle)| handle)
            .collect()
    }
}
