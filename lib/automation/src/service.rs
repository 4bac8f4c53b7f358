//! The automation service: the boundary the outside world talks to.
//!
//! The service loads an automation, applies one lifecycle operation, saves it
//! with optimistic concurrency and tells the dispatcher. It never retries;
//! a conflict is reported and the caller retries against the current state.

use crate::automation::{Automation, RunOutcome, Status};
use crate::dispatcher::{ExecutionDispatcher, ExecutionRequest};
use crate::error::{AutomationError, ConflictError, LifecycleError, StoreError};
use crate::store::AutomationStore;
use futures::{Stream, StreamExt};
use postflow_compliance::{
    ComplianceGate, CompliancePolicy, ConsentRevoked, ConsentStore, RateLimitResult,
    RunRateLimiter, action_platforms,
};
use postflow_core::{AccountId, AutomationId, Result, RunId};
use postflow_workflow::{GraphEdit, Node, NodeId, ValidationIssue, WorkflowEditor, WorkflowGraph};
use rootcause::Report;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What a consent revocation did to an account's automations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevocationReport {
    /// Automations paused by the revocation.
    pub paused: Vec<AutomationId>,
    /// Automations that did not depend on the capability or were not Active.
    pub unaffected: Vec<AutomationId>,
    /// Automations that needed pausing but could not be saved.
    pub failed: Vec<AutomationId>,
}

impl RevocationReport {
    fn merge(&mut self, other: RevocationReport) {
        self.paused.extend(other.paused);
        self.unaffected.extend(other.unaffected);
        self.failed.extend(other.failed);
    }
}

fn store_error(err: StoreError) -> Report<AutomationError> {
    Report::new(AutomationError::Store(err))
}

fn lifecycle_error(err: LifecycleError) -> Report<AutomationError> {
    Report::new(AutomationError::Lifecycle(err))
}

/// Orchestrates automations across the store, consent store and dispatcher.
pub struct AutomationService {
    store: Arc<dyn AutomationStore>,
    consents: Arc<dyn ConsentStore>,
    dispatcher: Arc<dyn ExecutionDispatcher>,
    gate: ComplianceGate,
    limiter: RunRateLimiter,
    editor: WorkflowEditor<'static>,
}

impl AutomationService {
    /// Creates a service using the built-in node catalog.
    #[must_use]
    pub fn new(
        store: Arc<dyn AutomationStore>,
        consents: Arc<dyn ConsentStore>,
        dispatcher: Arc<dyn ExecutionDispatcher>,
        policy: CompliancePolicy,
    ) -> Self {
        let limiter = RunRateLimiter::new(policy.run_limits.clone());
        Self {
            store,
            consents,
            dispatcher,
            gate: ComplianceGate::new(policy),
            limiter,
            editor: WorkflowEditor::builtin(),
        }
    }

    /// Uses a different editor, for a custom catalog.
    #[must_use]
    pub fn with_editor(mut self, editor: WorkflowEditor<'static>) -> Self {
        self.editor = editor;
        self
    }

    #[must_use]
    pub fn gate(&self) -> &ComplianceGate {
        &self.gate
    }

    /// Creates and stores an empty Draft.
    #[instrument(skip(self))]
    pub async fn create(&self, account_id: AccountId, name: String) -> Result<Automation, AutomationError> {
        let automation = Automation::new(account_id, name);
        self.store.insert(&automation).await.map_err(store_error)?;
        info!(automation_id = %automation.id(), "automation created");
        Ok(automation)
    }

    /// Loads an automation.
    pub async fn get(&self, automation_id: AutomationId) -> Result<Automation, AutomationError> {
        self.store.load(automation_id).await.map_err(store_error)
    }

    /// Lists an account's automations.
    pub async fn list(&self, account_id: AccountId) -> Result<Vec<Automation>, AutomationError> {
        self.store.list_for_account(account_id).await.map_err(store_error)
    }

    /// Renames an automation.
    #[instrument(skip(self))]
    pub async fn rename(
        &self,
        automation_id: AutomationId,
        expected_version: u64,
        name: String,
        description: Option<String>,
    ) -> Result<Automation, AutomationError> {
        let mut automation = self.load_at(automation_id, expected_version).await?;
        automation.rename(name, description).map_err(lifecycle_error)?;
        self.persist(&mut automation, expected_version).await?;
        Ok(automation)
    }

    /// Applies graph edits to a Draft atomically.
    #[instrument(skip(self, edits), fields(edits = edits.len()))]
    pub async fn edit(
        &self,
        automation_id: AutomationId,
        expected_version: u64,
        edits: Vec<GraphEdit>,
    ) -> Result<Automation, AutomationError> {
        let mut automation = self.load_at(automation_id, expected_version).await?;
        automation
            .edit_all(&self.editor, edits)
            .map_err(lifecycle_error)?;
        self.persist(&mut automation, expected_version).await?;
        Ok(automation)
    }

    /// Replaces a Draft's graph, returning any validation issues.
    #[instrument(skip(self, graph))]
    pub async fn save_draft(
        &self,
        automation_id: AutomationId,
        expected_version: u64,
        graph: WorkflowGraph,
    ) -> Result<(Automation, Vec<ValidationIssue>), AutomationError> {
        let mut automation = self.load_at(automation_id, expected_version).await?;
        let issues = automation.save_draft(graph).map_err(lifecycle_error)?;
        self.persist(&mut automation, expected_version).await?;
        if !issues.is_empty() {
            debug!(issues = issues.len(), "draft saved with issues");
        }
        Ok((automation, issues))
    }

    /// Activates a Draft or Paused automation against current consents.
    ///
    /// The dispatcher is told before the Active status is saved. If it
    /// refuses, nothing is saved; if the save fails, the dispatcher is told
    /// to deactivate again.
    #[instrument(skip(self))]
    pub async fn activate(
        &self,
        automation_id: AutomationId,
        expected_version: u64,
    ) -> Result<Automation, AutomationError> {
        let mut automation = self.load_at(automation_id, expected_version).await?;
        let account_id = automation.account_id();
        let consents = self
            .consents
            .get_consents(account_id)
            .await
            .map_err(|e| Report::new(e).context(AutomationError::ConsentLookup { account_id }))?;

        automation
            .activate(&consents, &self.gate)
            .map_err(lifecycle_error)?;

        let subgraph = automation.graph().reachable_subgraph();
        self.dispatcher
            .on_activation(automation_id, &subgraph)
            .await
            .map_err(|e| Report::new(e).context(AutomationError::Dispatch { automation_id }))?;

        if let Err(err) = self.persist(&mut automation, expected_version).await {
            if let Err(undo) = self.deactivate(automation_id).await {
                warn!(%automation_id, error = %undo, "dispatcher kept an activation that was not saved");
            }
            return Err(err);
        }
        Ok(automation)
    }

    /// Pauses an Active automation.
    ///
    /// The dispatcher is told first, so a refused deactivation leaves the
    /// automation Active in storage.
    #[instrument(skip(self))]
    pub async fn pause(
        &self,
        automation_id: AutomationId,
        expected_version: u64,
        detail: String,
    ) -> Result<Automation, AutomationError> {
        let mut automation = self.load_at(automation_id, expected_version).await?;
        automation.pause(detail).map_err(lifecycle_error)?;
        self.deactivate(automation_id).await?;
        if let Err(err) = self.persist(&mut automation, expected_version).await {
            self.reactivate(&automation).await;
            return Err(err);
        }
        Ok(automation)
    }

    /// Archives an automation.
    #[instrument(skip(self))]
    pub async fn archive(
        &self,
        automation_id: AutomationId,
        expected_version: u64,
    ) -> Result<Automation, AutomationError> {
        let mut automation = self.load_at(automation_id, expected_version).await?;
        let was_active = automation.status() == Status::Active;
        automation.archive().map_err(lifecycle_error)?;
        if was_active {
            self.deactivate(automation_id).await?;
        }
        if let Err(err) = self.persist(&mut automation, expected_version).await {
            if was_active {
                self.reactivate(&automation).await;
            }
            return Err(err);
        }
        Ok(automation)
    }

    /// Records a run outcome reported by the dispatcher.
    #[instrument(skip(self))]
    pub async fn report_run(
        &self,
        automation_id: AutomationId,
        outcome: RunOutcome,
        detail: String,
    ) -> Result<Automation, AutomationError> {
        let mut automation = self.get(automation_id).await?;
        let expected_version = automation.version();
        automation
            .report_run(outcome, detail)
            .map_err(lifecycle_error)?;
        self.persist(&mut automation, expected_version).await?;
        Ok(automation)
    }

    /// Pauses every Active automation of the account that depends on the
    /// revoked capability.
    ///
    /// An automation that cannot be saved is logged and listed as failed;
    /// the rest are still processed.
    #[instrument(skip(self))]
    pub async fn consent_revoked(&self, event: ConsentRevoked) -> Result<RevocationReport, AutomationError> {
        let automations = self.list(event.account_id).await?;
        let mut report = RevocationReport::default();

        for mut automation in automations {
            let automation_id = automation.id();
            let expected_version = automation.version();
            if !automation.revoke_consent(event.platform, event.capability) {
                report.unaffected.push(automation_id);
                continue;
            }

            if let Err(err) = self.persist(&mut automation, expected_version).await {
                warn!(%automation_id, error = %err, "could not pause automation after consent revocation");
                report.failed.push(automation_id);
                continue;
            }
            if let Err(err) = self.deactivate(automation_id).await {
                warn!(%automation_id, error = %err, "dispatcher missed deactivation");
            }
            report.paused.push(automation_id);
        }

        info!(
            paused = report.paused.len(),
            failed = report.failed.len(),
            "consent revocation processed"
        );
        Ok(report)
    }

    /// Applies revocation events until the stream ends.
    ///
    /// Errors for one event are logged and do not stop the stream.
    pub async fn consume_consent_events(
        &self,
        events: impl Stream<Item = ConsentRevoked>,
    ) -> RevocationReport {
        let mut events = std::pin::pin!(events);
        let mut total = RevocationReport::default();
        while let Some(event) = events.next().await {
            match self.consent_revoked(event).await {
                Ok(report) => total.merge(report),
                Err(err) => {
                    warn!(account_id = %event.account_id, error = %err, "consent event not applied");
                }
            }
        }
        total
    }

    /// Fires a trigger of an Active automation and dispatches a run.
    ///
    /// The run is charged against the rate limits of every platform its
    /// Actions target. A run the dispatcher refuses is given back.
    #[instrument(skip(self, payload))]
    pub async fn fire_trigger(
        &self,
        automation_id: AutomationId,
        trigger_node: NodeId,
        payload: JsonValue,
    ) -> Result<RunId, AutomationError> {
        let automation = self.get(automation_id).await?;
        if automation.status() != Status::Active {
            return Err(Report::new(AutomationError::NotActive {
                automation_id,
                status: automation.status(),
            }));
        }

        let subgraph = automation.graph().reachable_subgraph();
        if !subgraph.node(trigger_node).is_some_and(Node::is_trigger) {
            return Err(Report::new(AutomationError::TriggerNotReachable {
                automation_id,
                node_id: trigger_node,
            }));
        }

        let account_id = automation.account_id();
        let platforms = action_platforms(automation.graph());
        if let RateLimitResult::Exceeded {
            platform,
            retry_after,
            ..
        } = self.limiter.try_acquire(account_id, &platforms)
        {
            warn!(%automation_id, %platform, "run rejected by rate limit");
            return Err(Report::new(AutomationError::RateLimited {
                platform,
                retry_after_secs: retry_after.num_seconds(),
            }));
        }

        let run_id = RunId::new();
        let request = ExecutionRequest {
            run_id,
            automation_id,
            account_id,
            trigger_node,
            payload,
            subgraph,
        };
        if let Err(err) = self.dispatcher.dispatch(request).await {
            self.limiter.release(account_id, &platforms);
            return Err(Report::new(err).context(AutomationError::Dispatch { automation_id }));
        }
        debug!(%run_id, "run dispatched");
        Ok(run_id)
    }

    /// Loads an automation and checks the caller saw its current version.
    async fn load_at(&self, automation_id: AutomationId, expected_version: u64) -> Result<Automation, AutomationError> {
        let automation = self.get(automation_id).await?;
        if automation.version() != expected_version {
            return Err(store_error(StoreError::Conflict(ConflictError {
                automation_id,
                expected: expected_version,
                actual: automation.version(),
            })));
        }
        Ok(automation)
    }

    async fn persist(&self, automation: &mut Automation, expected_version: u64) -> Result<(), AutomationError> {
        let version = self
            .store
            .save(automation, expected_version)
            .await
            .map_err(store_error)?;
        automation.set_version(version);
        Ok(())
    }

    /// Re-registers an automation whose deactivation could not be saved.
    async fn reactivate(&self, automation: &Automation) {
        let automation_id = automation.id();
        let subgraph = automation.graph().reachable_subgraph();
        if let Err(err) = self.dispatcher.on_activation(automation_id, &subgraph).await {
            warn!(%automation_id, error = %err, "dispatcher lost an activation after a failed save");
        }
    }

    async fn deactivate(&self, automation_id: AutomationId) -> Result<(), AutomationError> {
        self.dispatcher
            .on_deactivation(automation_id)
            .await
            .map_err(|e| Report::new(e).context(AutomationError::Dispatch { automation_id }))
    }
}
