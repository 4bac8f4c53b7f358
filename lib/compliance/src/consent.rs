//! Consent storage.
//!
//! Consent records live outside postflow. The engine reads an account's
//! consents at activation time and listens for revocations so it can pause
//! automations that depend on them.

use crate::error::ConsentError;
use async_trait::async_trait;
use futures::channel::mpsc;
use postflow_core::{AccountId, Capability, ConsentSet, Platform};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::debug;

/// A consent was withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRevoked {
    pub account_id: AccountId,
    pub platform: Platform,
    pub capability: Capability,
}

/// Trait for consent lookups.
#[async_trait]
pub trait ConsentStore: Send + Sync {
    /// Returns the capabilities the account has granted, per platform.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot answer.
    async fn get_consents(&self, account_id: AccountId) -> Result<ConsentSet, ConsentError>;
}

/// An in-process consent store.
///
/// Unknown accounts have granted nothing. Revocations are broadcast to
/// every live subscriber.
#[derive(Debug, Default)]
pub struct InMemoryConsentStore {
    consents: RwLock<HashMap<AccountId, ConsentSet>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ConsentRevoked>>>,
}

impl InMemoryConsentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces an account's consents wholesale.
    pub fn set(&self, account_id: AccountId, consents: ConsentSet) {
        let mut all = self.consents.write().unwrap_or_else(PoisonError::into_inner);
        all.insert(account_id, consents);
    }

    /// Grants a capability. Returns false if it was already granted.
    pub fn grant(&self, account_id: AccountId, platform: Platform, capability: Capability) -> bool {
        let mut all = self.consents.write().unwrap_or_else(PoisonError::into_inner);
        all.entry(account_id).or_default().grant(platform, capability)
    }

    /// Revokes a capability and notifies subscribers.
    ///
    /// Returns the event, or `None` if the capability was not granted.
    pub fn revoke(
        &self,
        account_id: AccountId,
        platform: Platform,
        capability: Capability,
    ) -> Option<ConsentRevoked> {
        let removed = {
            let mut all = self.consents.write().unwrap_or_else(PoisonError::into_inner);
            all.get_mut(&account_id)
                .is_some_and(|set| set.revoke(platform, capability))
        };
        if !removed {
            return None;
        }

        let event = ConsentRevoked {
            account_id,
            platform,
            capability,
        };
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.unbounded_send(event).is_ok());
        debug!(%account_id, %platform, %capability, subscribers = subscribers.len(), "consent revoked");
        Some(event)
    }

    /// Returns a stream of future revocations.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ConsentRevoked> {
        let (tx, rx) = mpsc::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Returns a snapshot of an account's consents.
    #[must_use]
    pub fn snapshot(&self, account_id: AccountId) -> ConsentSet {
        self.consents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&account_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ConsentStore for InMemoryConsentStore {
    async fn get_consents(&self, account_id: AccountId) -> Result<ConsentSet, ConsentError> {
        Ok(self.snapshot(account_id))
    }
}
