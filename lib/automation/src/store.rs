//! Automation storage with optimistic concurrency.
//!
//! Every save names the version the caller last saw. A stale version is a
//! conflict: the save is refused and nothing is overwritten, so two editors
//! can never silently discard each other's compliance-relevant changes.

use crate::automation::Automation;
use crate::error::{ConflictError, StoreError};
use crate::record::AutomationRecord;
use async_trait::async_trait;
use postflow_core::{AccountId, AutomationId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Trait for automation storage.
#[async_trait]
pub trait AutomationStore: Send + Sync {
    /// Stores a new automation at its current version.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the id is taken.
    async fn insert(&self, automation: &Automation) -> Result<(), StoreError>;

    /// Loads an automation by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if absent.
    async fn load(&self, id: AutomationId) -> Result<Automation, StoreError>;

    /// Saves an automation if the stored version is `expected_version`.
    ///
    /// Returns the new version.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` when the stored version differs, `NotFound` if absent.
    async fn save(&self, automation: &Automation, expected_version: u64) -> Result<u64, StoreError>;

    /// Lists the automations governed by an account.
    async fn list_for_account(&self, account_id: AccountId) -> Result<Vec<Automation>, StoreError>;
}

/// An in-process store that keeps durable records.
///
/// Storing records rather than live values means every load goes through
/// the same decoding a real backend would.
#[derive(Debug, Default)]
pub struct InMemoryAutomationStore {
    records: RwLock<HashMap<AutomationId, AutomationRecord>>,
}

impl InMemoryAutomationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AutomationStore for InMemoryAutomationStore {
    async fn insert(&self, automation: &Automation) -> Result<(), StoreError> {
        let record = AutomationRecord::from_automation(automation)?;
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if records.contains_key(&automation.id()) {
            return Err(StoreError::AlreadyExists {
                automation_id: automation.id(),
            });
        }
        records.insert(automation.id(), record);
        debug!(automation_id = %automation.id(), "automation inserted");
        Ok(())
    }

    async fn load(&self, id: AutomationId) -> Result<Automation, StoreError> {
        let record = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { automation_id: id })?;
        Ok(record.into_automation()?)
    }

    async fn save(&self, automation: &Automation, expected_version: u64) -> Result<u64, StoreError> {
        let mut record = AutomationRecord::from_automation(automation)?;
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let stored = records.get(&automation.id()).ok_or(StoreError::NotFound {
            automation_id: automation.id(),
        })?;

        if stored.version != expected_version {
            return Err(StoreError::Conflict(ConflictError {
                automation_id: automation.id(),
                expected: expected_version,
                actual: stored.version,
            }));
        }

        let version = expected_version + 1;
        record.version = version;
        records.insert(automation.id(), record);
        debug!(automation_id = %automation.id(), version, "automation saved");
        Ok(version)
    }

    async fn list_for_account(&self, account_id: AccountId) -> Result<Vec<Automation>, StoreError> {
        let mut matching: Vec<AutomationRecord> = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.created_at);
        matching
            .into_iter()
            .map(|r| r.into_automation().map_err(StoreError::from))
            .collect()
    }
}
