//! The automation entity and its lifecycle state machine.
//!
//! States: `Draft -> Active <-> Paused`, and any non-terminal state to
//! `Archived`. Activation is guarded by save-time validation, the compliance
//! gate and the presence of a reachable Action. All operations here are
//! synchronous and leave the automation unchanged when they fail.

use crate::audit::{AuditEvent, AuditLog};
use crate::error::LifecycleError;
use chrono::{DateTime, Utc};
use postflow_compliance::{ComplianceGate, requires_capability};
use postflow_core::{AccountId, AutomationId, Capability, ConsentSet, Platform};
use postflow_workflow::{
    EditOutcome, GraphEdit, ValidationIssue, WorkflowEditor, WorkflowGraph, validate_for_save,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// The lifecycle state of an automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Being authored; the only state that accepts graph edits.
    Draft,
    /// Receiving trigger events and dispatching runs.
    Active,
    /// Stopped, by a user or by a consent revocation.
    Paused,
    /// Terminal.
    Archived,
}

impl Status {
    /// Returns whether the state machine allows moving to `to`.
    #[must_use]
    pub fn can_transition_to(self, to: Status) -> bool {
        use Status::*;
        matches!(
            (self, to),
            (Draft | Paused, Active) | (Active, Paused) | (Draft | Active | Paused, Archived)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Archived
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a dispatched run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    Failed,
}

/// A user-composed automation.
///
/// The automation exclusively owns its graph and audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct Automation {
    pub(crate) id: AutomationId,
    pub(crate) account_id: AccountId,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) graph: WorkflowGraph,
    pub(crate) status: Status,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) activated_at: Option<DateTime<Utc>>,
    pub(crate) runs_count: u64,
    pub(crate) last_run_at: Option<DateTime<Utc>>,
    pub(crate) audit_log: AuditLog,
    pub(crate) version: u64,
}

impl Automation {
    /// Creates an empty Draft automation.
    #[must_use]
    pub fn new(account_id: AccountId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: AutomationId::new(),
            account_id,
            name: name.into(),
            description: None,
            graph: WorkflowGraph::new(),
            status: Status::Draft,
            created_at: now,
            updated_at: now,
            activated_at: None,
            runs_count: 0,
            last_run_at: None,
            audit_log: AuditLog::new(),
            version: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> AutomationId {
        self.id
    }

    /// The social account whose consents govern this automation.
    #[must_use]
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn activated_at(&self) -> Option<DateTime<Utc>> {
        self.activated_at
    }

    #[must_use]
    pub fn runs_count(&self) -> u64 {
        self.runs_count
    }

    #[must_use]
    pub fn last_run_at(&self) -> Option<DateTime<Utc>> {
        self.last_run_at
    }

    #[must_use]
    pub fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }

    /// The optimistic-concurrency version last persisted.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Records the version assigned by a store after a successful save.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Renames the automation.
    ///
    /// # Errors
    ///
    /// Returns `NotEditable` once archived.
    pub fn rename(&mut self, name: impl Into<String>, description: Option<String>) -> Result<(), LifecycleError> {
        if self.status.is_terminal() {
            return Err(LifecycleError::NotEditable {
                status: self.status,
            });
        }
        self.name = name.into();
        self.description = description;
        self.touch();
        Ok(())
    }

    /// Applies one graph edit.
    ///
    /// # Errors
    ///
    /// Returns `NotEditable` outside Draft, or the graph's error.
    pub fn edit(&mut self, editor: &WorkflowEditor<'_>, edit: GraphEdit) -> Result<EditOutcome, LifecycleError> {
        self.ensure_editable()?;
        let outcome = editor.apply(&mut self.graph, edit)?;
        self.touch();
        Ok(outcome)
    }

    /// Applies a batch of graph edits atomically.
    ///
    /// # Errors
    ///
    /// Returns `NotEditable` outside Draft, or the first failing edit's error.
    pub fn edit_all(
        &mut self,
        editor: &WorkflowEditor<'_>,
        edits: impl IntoIterator<Item = GraphEdit>,
    ) -> Result<Vec<EditOutcome>, LifecycleError> {
        self.ensure_editable()?;
        let outcomes = editor.apply_all(&mut self.graph, edits)?;
        self.touch();
        Ok(outcomes)
    }

    /// Replaces the Draft graph and returns what validation thinks of it.
    ///
    /// Saving never fails on validation issues; a graph with issues simply
    /// cannot be activated yet.
    ///
    /// # Errors
    ///
    /// Returns `NotEditable` outside Draft.
    pub fn save_draft(&mut self, graph: WorkflowGraph) -> Result<Vec<ValidationIssue>, LifecycleError> {
        self.ensure_editable()?;
        self.graph = graph;
        self.touch();
        Ok(validate_for_save(&self.graph).err().unwrap_or_default())
    }

    /// Checks every activation guard without changing anything.
    ///
    /// Guards run in order: transition, validation, compliance, reachable
    /// Action. The first failing guard is reported.
    ///
    /// # Errors
    ///
    /// Returns the failing guard.
    pub fn check_activation(&self, consents: &ConsentSet, gate: &ComplianceGate) -> Result<(), LifecycleError> {
        self.ensure_transition(Status::Active)?;
        validate_for_save(&self.graph).map_err(LifecycleError::Validation)?;
        gate.evaluate(&self.graph, consents)
            .map_err(LifecycleError::Compliance)?;
        if self.graph.reachable_subgraph().actions().next().is_none() {
            return Err(LifecycleError::NoReachableAction);
        }
        Ok(())
    }

    /// Moves a Draft or Paused automation to Active.
    ///
    /// # Errors
    ///
    /// Returns the first failing guard; see [`Self::check_activation`].
    pub fn activate(&mut self, consents: &ConsentSet, gate: &ComplianceGate) -> Result<(), LifecycleError> {
        if let Err(err) = self.check_activation(consents, gate) {
            warn!(automation_id = %self.id, status = %self.status, error = %err, "activation rejected");
            return Err(err);
        }

        let now = Utc::now();
        self.status = Status::Active;
        self.activated_at = Some(now);
        self.updated_at = now;
        self.audit_log.append(now, AuditEvent::Activated, "");
        info!(automation_id = %self.id, "automation activated");
        Ok(())
    }

    /// Moves an Active automation to Paused.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless Active.
    pub fn pause(&mut self, detail: impl Into<String>) -> Result<(), LifecycleError> {
        self.ensure_transition(Status::Paused)?;
        let now = Utc::now();
        self.status = Status::Paused;
        self.updated_at = now;
        self.audit_log.append(now, AuditEvent::Paused, detail);
        info!(automation_id = %self.id, "automation paused");
        Ok(())
    }

    /// Moves the automation to the terminal Archived state.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if already archived.
    pub fn archive(&mut self) -> Result<(), LifecycleError> {
        self.ensure_transition(Status::Archived)?;
        self.status = Status::Archived;
        self.touch();
        info!(automation_id = %self.id, "automation archived");
        Ok(())
    }

    /// Records the outcome of a dispatched run.
    ///
    /// Reports may arrive after a pause; they are still recorded but never
    /// change the status.
    ///
    /// # Errors
    ///
    /// Returns `NotRunning` in Draft or Archived.
    pub fn report_run(&mut self, outcome: RunOutcome, detail: impl Into<String>) -> Result<(), LifecycleError> {
        if !matches!(self.status, Status::Active | Status::Paused) {
            return Err(LifecycleError::NotRunning {
                status: self.status,
            });
        }
        let now = Utc::now();
        let event = match outcome {
            RunOutcome::Succeeded => AuditEvent::RunSucceeded,
            RunOutcome::Failed => AuditEvent::RunFailed,
        };
        self.runs_count += 1;
        self.last_run_at = Some(now);
        self.updated_at = now;
        self.audit_log.append(now, event, detail);
        debug!(automation_id = %self.id, %event, runs_count = self.runs_count, "run reported");
        Ok(())
    }

    /// Applies a consent revocation.
    ///
    /// An Active automation whose reachable Actions need the capability is
    /// paused. Returns whether the automation was affected.
    pub fn revoke_consent(&mut self, platform: Platform, capability: Capability) -> bool {
        if self.status != Status::Active || !requires_capability(&self.graph, platform, capability) {
            return false;
        }
        let now = Utc::now();
        self.status = Status::Paused;
        self.updated_at = now;
        self.audit_log.append(
            now,
            AuditEvent::ConsentRevoked,
            format!("{capability} revoked on {platform}"),
        );
        warn!(automation_id = %self.id, %platform, %capability, "automation paused by consent revocation");
        true
    }

    fn ensure_transition(&self, to: Status) -> Result<(), LifecycleError> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                from: self.status,
                to,
            })
        }
    }

    fn ensure_editable(&self) -> Result<(), LifecycleError> {
        if self.status == Status::Draft {
            Ok(())
        } else {
            Err(LifecycleError::NotEditable {
                status: self.status,
            })
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
