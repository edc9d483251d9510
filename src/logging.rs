//! Structured activity logging
//!
//! Entries are collected in memory rather than written to a sink, so hosts
//! and tests can inspect exactly what the engine did during a session.

use crate::types::{GroupId, StateHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// A single activity log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Workspace the entry relates to, if any
    pub group_id: Option<GroupId>,
    /// Fingerprint of the session state after the logged event
    pub state_hash: Option<StateHash>,
    pub message: String,
    pub metadata: Vec<(String, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp,
            group_id: None,
            state_hash: None,
            message: message.into(),
            metadata: Vec::new(),
        }
    }

    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn with_state_hash(mut self, hash: StateHash) -> Self {
        self.state_hash = Some(hash);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory log that keeps entries at or above a minimum level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    entries: Vec<LogEntry>,
    min_level: LogLevel,
}

impl ActivityLog {
    pub fn new(min_level: LogLevel) -> Self {
        Self {
            entries: Vec::new(),
            min_level,
        }
    }

    /// Create a log that captures all levels
    pub fn all() -> Self {
        Self::new(LogLevel::Trace)
    }

    pub fn with_info_level() -> Self {
        Self::new(LogLevel::Info)
    }

    /// Whether an entry at `level` would be kept
    pub fn accepts(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    pub fn log(&mut self, entry: LogEntry) {
        if self.accepts(entry.level) {
            self.entries.push(entry);
        }
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Debug, Utc::now(), message));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, Utc::now(), message));
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Warn, Utc::now(), message));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Error, Utc::now(), message));
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn filter_by_level(&self, level: LogLevel) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| e.level == level).collect()
    }

    pub fn filter_by_group(&self, group_id: &GroupId) -> Vec<&LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.group_id.as_ref() == Some(group_id))
            .collect()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_info_level()
    }
}
