//! Durable records for automations.
//!
//! A record is the serialized form handed to persistence. It carries a
//! format version so stored data can outlive changes to the in-memory
//! model. Decoding rebuilds the graph through its checked operations, so a
//! record that violates a graph invariant is rejected rather than loaded.

use crate::audit::{AuditEntry, AuditLog};
use crate::automation::{Automation, Status};
use crate::error::RecordError;
use chrono::{DateTime, Utc};
use postflow_core::{AccountId, AutomationId};
use postflow_workflow::WorkflowGraph;
use serde::{Deserialize, Serialize};

/// The record format this build reads and writes.
pub const FORMAT_VERSION: u32 = 1;

/// The persisted shape of an [`Automation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRecord {
    pub format_version: u32,
    pub id: AutomationId,
    pub account_id: AccountId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: Status,
    /// The graph as `{ "nodes": [...], "edges": [...] }`.
    pub graph: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub runs_count: u64,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub audit_log: Vec<AuditEntry>,
    #[serde(default)]
    pub version: u64,
}

impl AutomationRecord {
    /// Captures an automation.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if the graph cannot be encoded.
    pub fn from_automation(automation: &Automation) -> Result<Self, RecordError> {
        let graph = serde_json::to_value(&automation.graph).map_err(|e| RecordError::Malformed {
            reason: e.to_string(),
        })?;
        Ok(Self {
            format_version: FORMAT_VERSION,
            id: automation.id,
            account_id: automation.account_id,
            name: automation.name.clone(),
            description: automation.description.clone(),
            status: automation.status,
            graph,
            created_at: automation.created_at,
            updated_at: automation.updated_at,
            activated_at: automation.activated_at,
            runs_count: automation.runs_count,
            last_run_at: automation.last_run_at,
            audit_log: automation.audit_log.entries().to_vec(),
            version: automation.version,
        })
    }

    /// Restores the automation.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` for a record from another format, or
    /// `Malformed` if the graph is invalid.
    pub fn into_automation(self) -> Result<Automation, RecordError> {
        if self.format_version != FORMAT_VERSION {
            return Err(RecordError::UnsupportedFormat {
                found: self.format_version,
                supported: FORMAT_VERSION,
            });
        }
        let graph: WorkflowGraph =
            serde_json::from_value(self.graph).map_err(|e| RecordError::Malformed {
                reason: e.to_string(),
            })?;
        Ok(Automation {
            id: self.id,
            account_id: self.account_id,
            name: self.name,
            description: self.description,
            graph,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            activated_at: self.activated_at,
            runs_count: self.runs_count,
            last_run_at: self.last_run_at,
            audit_log: AuditLog::from(self.audit_log),
            version: self.version,
        })
    }

    /// Encodes the record as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if encoding fails.
    pub fn to_json(&self) -> Result<String, RecordError> {
        serde_json::to_string_pretty(self).map_err(|e| RecordError::Malformed {
            reason: e.to_string(),
        })
    }

    /// Decodes a record from JSON.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if the text is not a record.
    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        serde_json::from_str(json).map_err(|e| RecordError::Malformed {
            reason: e.to_string(),
        })
    }
}

/// Serializes an automation to its durable JSON form.
///
/// # Errors
///
/// Returns `Malformed` if encoding fails.
pub fn serialize(automation: &Automation) -> Result<String, RecordError> {
    AutomationRecord::from_automation(automation)?.to_json()
}

/// Restores an automation from its durable JSON form.
///
/// # Errors
///
/// Returns `UnsupportedFormat` or `Malformed`.
pub fn deserialize(json: &str) -> Result<Automation, RecordError> {
    AutomationRecord::from_json(json)?.into_automation()
}
