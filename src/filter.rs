//! Destination filters
//!
//! Each concrete handle gates its console sink and its file sink with one
//! filter each. A filter is a pure predicate over a record, driven by the
//! record's destination marker and the handle's tag rules.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::record::{Destination, Record};

/// Tag routing rules for a handle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagRules {
    /// Tags that may reach the console; when non-empty, untagged records stay off the console
    pub console_only: Vec<String>,
    /// Tags that may reach the file; when non-empty, untagged records stay out of the file
    pub file_only: Vec<String>,
    /// Tags never shown on the console
    pub console_exclude: Vec<String>,
    /// Tags never written to the file
    pub file_exclude: Vec<String>,
}

impl TagRules {
    /// Check if no rule is configured
    pub fn is_empty(&self) -> bool {
        self.console_only.is_empty()
            && self.file_only.is_empty()
            && self.console_exclude.is_empty()
            && self.file_exclude.is_empty()
    }
}

/// Which sink a filter guards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    File,
}

/// Predicate deciding whether a record reaches one sink
#[derive(Debug, Clone)]
pub struct DestinationFilter {
    kind: SinkKind,
    rules: Arc<TagRules>,
}

impl DestinationFilter {
    pub fn new(kind: SinkKind, rules: Arc<TagRules>) -> Self {
        Self { kind, rules }
    }

    /// Build the console/file filter pair sharing one rule set
    pub fn pair(rules: TagRules) -> (Self, Self) {
        let rules = Arc::new(rules);
        (
            Self::new(SinkKind::Console, Arc::clone(&rules)),
            Self::new(SinkKind::File, rules),
        )
    }

    pub fn kind(&self) -> SinkKind {
        self.kind
    }

    pub fn allows(&self, record: &Record) -> bool {
        allows(self.kind, &self.rules, record)
    }
}

/// Decide whether `record` reaches the sink of the given kind
///
/// Precedence: destination marker, then inclusion-only tags, then excluded
/// tags, then tags reserved for the other sink. An excluded tag wins over
/// an inclusion tag for the same sink.
pub fn allows(kind: SinkKind, rules: &TagRules, record: &Record) -> bool {
    match (record.destination, kind) {
        (Destination::ConsoleOnly, SinkKind::Console) | (Destination::FileOnly, SinkKind::File) => {
            return true
        }
        (Destination::ConsoleOnly, SinkKind::File) | (Destination::FileOnly, SinkKind::Console) => {
            return false
        }
        (Destination::Everywhere, _) => {}
    }

    let (only, exclude, other_only) = match kind {
        SinkKind::Console => (&rules.console_only, &rules.console_exclude, &rules.file_only),
        SinkKind::File => (&rules.file_only, &rules.file_exclude, &rules.console_only),
    };

    if !only.is_empty() && !record.has_any_tag(only) {
        return false;
    }
    if record.has_any_tag(exclude) {
        return false;
    }
    if record.has_any_tag(other_only) && !record.has_any_tag(only) {
        return false;
    }
    true
}
