//! The append-only audit log kept by every automation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    Activated,
    Paused,
    RunSucceeded,
    RunFailed,
    ConsentRevoked,
}

impl AuditEvent {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Activated => "activated",
            Self::Paused => "paused",
            Self::RunSucceeded => "run_succeeded",
            Self::RunFailed => "run_failed",
            Self::ConsentRevoked => "consent_revoked",
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
    #[serde(default)]
    pub detail: String,
}

/// An ordered log that only grows.
///
/// Entries cannot be removed, edited or reordered once appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog(Vec<AuditEntry>);

impl AuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, timestamp: DateTime<Utc>, event: AuditEvent, detail: impl Into<String>) {
        self.0.push(AuditEntry {
            timestamp,
            event,
            detail: detail.into(),
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[AuditEntry] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuditEntry> {
        self.0.iter()
    }

    #[must_use]
    pub fn last(&self) -> Option<&AuditEntry> {
        self.0.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Counts entries of one event type.
    #[must_use]
    pub fn count(&self, event: AuditEvent) -> usize {
        self.0.iter().filter(|e| e.event == event).count()
    }
}

impl From<Vec<AuditEntry>> for AuditLog {
    fn from(entries: Vec<AuditEntry>) -> Self {
        Self(entries)
    }
}
