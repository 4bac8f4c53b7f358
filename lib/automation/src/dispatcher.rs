//! The seam to the external execution system.
//!
//! postflow decides *whether* an automation may run; executing a run is the
//! dispatcher's job. The dispatcher reports back through
//! `AutomationService::report_run`.

use crate::error::DispatchError;
use async_trait::async_trait;
use postflow_core::{AccountId, AutomationId, RunId};
use postflow_workflow::{NodeId, WorkflowGraph};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// A request to execute one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub run_id: RunId,
    pub automation_id: AutomationId,
    pub account_id: AccountId,
    /// The trigger that fired.
    pub trigger_node: NodeId,
    /// Event data supplied with the trigger.
    pub payload: JsonValue,
    /// The reachable subgraph to execute.
    pub subgraph: WorkflowGraph,
}

/// Trait for the external execution system.
#[async_trait]
pub trait ExecutionDispatcher: Send + Sync {
    /// An automation became Active with this reachable subgraph.
    async fn on_activation(&self, automation_id: AutomationId, subgraph: &WorkflowGraph) -> Result<(), DispatchError>;

    /// An automation left Active. Runs already dispatched are not cancelled.
    async fn on_deactivation(&self, automation_id: AutomationId) -> Result<(), DispatchError>;

    /// Queues a run.
    async fn dispatch(&self, request: ExecutionRequest) -> Result<(), DispatchError>;
}

/// What a [`RecordingDispatcher`] was told.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    Activated(AutomationId),
    Deactivated(AutomationId),
    Dispatched(ExecutionRequest),
}

/// A dispatcher that records calls and executes nothing.
///
/// Used for dry runs and tests. It refuses runs for automations it has not
/// been told are active.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    active: Mutex<HashSet<AutomationId>>,
    events: Mutex<Vec<DispatchEvent>>,
}

impl RecordingDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every call received so far.
    #[must_use]
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the requests dispatched so far.
    #[must_use]
    pub fn dispatched(&self) -> Vec<ExecutionRequest> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DispatchEvent::Dispatched(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn is_active(&self, automation_id: AutomationId) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&automation_id)
    }

    fn record(&self, event: DispatchEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[async_trait]
impl ExecutionDispatcher for RecordingDispatcher {
    async fn on_activation(&self, automation_id: AutomationId, _subgraph: &WorkflowGraph) -> Result<(), DispatchError> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(automation_id);
        self.record(DispatchEvent::Activated(automation_id));
        Ok(())
    }

    async fn on_deactivation(&self, automation_id: AutomationId) -> Result<(), DispatchError> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&automation_id);
        self.record(DispatchEvent::Deactivated(automation_id));
        Ok(())
    }

    async fn dispatch(&self, request: ExecutionRequest) -> Result<(), DispatchError> {
        if !self.is_active(request.automation_id) {
            return Err(DispatchError::Rejected {
                reason: format!("automation {} is not active", request.automation_id),
            });
        }
        self.record(DispatchEvent::Dispatched(request));
        Ok(())
    }
}
