//! End-to-end lifecycle scenarios through `AutomationService`.

use async_trait::async_trait;
use futures::StreamExt;
use postflow_automation::{
    AuditEvent, AutomationError, AutomationService, DispatchError, DispatchEvent,
    ExecutionDispatcher, ExecutionRequest, InMemoryAutomationStore, LifecycleError,
    RecordingDispatcher, RunOutcome, Status,
};
use postflow_compliance::{CompliancePolicy, InMemoryConsentStore, RunLimit, ViolationKind};
use postflow_core::{AccountId, AutomationId, Capability, Platform};
use postflow_workflow::{GraphEdit, NodeId, NodeKind, ValidationIssue, WorkflowGraph};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A recording dispatcher whose calls can be made to fail.
#[derive(Default)]
struct FlakyDispatcher {
    inner: RecordingDispatcher,
    refuse_activation: AtomicBool,
    refuse_deactivation: AtomicBool,
    refuse_dispatch: AtomicBool,
}

fn unavailable() -> DispatchError {
    DispatchError::Unavailable {
        reason: "connection refused".to_string(),
    }
}

#[async_trait]
impl ExecutionDispatcher for FlakyDispatcher {
    async fn on_activation(&self, automation_id: AutomationId, subgraph: &WorkflowGraph) -> Result<(), DispatchError> {
        if self.refuse_activation.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.on_activation(automation_id, subgraph).await
    }

    async fn on_deactivation(&self, automation_id: AutomationId) -> Result<(), DispatchError> {
        if self.refuse_deactivation.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.on_deactivation(automation_id).await
    }

    async fn dispatch(&self, request: ExecutionRequest) -> Result<(), DispatchError> {
        if self.refuse_dispatch.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.dispatch(request).await
    }
}

struct Harness<D = RecordingDispatcher> {
    service: AutomationService,
    consents: Arc<InMemoryConsentStore>,
    dispatcher: Arc<D>,
    account: AccountId,
}

impl Harness {
    fn new(policy: CompliancePolicy) -> Self {
        Harness::with_dispatcher(policy, RecordingDispatcher::new())
    }
}

impl<D: ExecutionDispatcher + 'static> Harness<D> {
    fn with_dispatcher(policy: CompliancePolicy, dispatcher: D) -> Self {
        let consents = Arc::new(InMemoryConsentStore::new());
        let dispatcher = Arc::new(dispatcher);
        let service = AutomationService::new(
            Arc::new(InMemoryAutomationStore::new()),
            consents.clone(),
            dispatcher.clone(),
            policy,
        );
        Self {
            service,
            consents,
            dispatcher,
            account: AccountId::new(),
        }
    }

    /// Creates a Draft wired `trigger -> action` and returns the node ids.
    async fn wired(&self, trigger: (&str, Value), action: (&str, Value)) -> (AutomationId, NodeId, NodeId) {
        let automation = self
            .service
            .create(self.account, "scenario".to_string())
            .await
            .expect("create");
        let edited = self
            .service
            .edit(
                automation.id(),
                automation.version(),
                vec![add(NodeKind::Trigger, trigger), add(NodeKind::Action, action)],
            )
            .await
            .expect("add nodes");

        let ids: Vec<NodeId> = edited.graph().display_order().to_vec();
        self.service
            .edit(
                edited.id(),
                edited.version(),
                vec![GraphEdit::Connect {
                    from: ids[0],
                    to: ids[1],
                }],
            )
            .await
            .expect("connect");
        (automation.id(), ids[0], ids[1])
    }

    async fn version(&self, id: AutomationId) -> u64 {
        self.service.get(id).await.expect("load").version()
    }
}

fn add(kind: NodeKind, (node_type, config): (&str, Value)) -> GraphEdit {
    GraphEdit::AddNode {
        kind,
        node_type: node_type.to_string(),
        config: config.as_object().cloned().expect("object"),
    }
}

fn new_follower() -> (&'static str, Value) {
    ("new_follower", json!({ "platform": "instagram" }))
}

fn notification() -> (&'static str, Value) {
    ("send_notification", json!({ "message": "You have a new follower" }))
}

fn mention() -> (&'static str, Value) {
    ("mention", json!({ "platform": "x" }))
}

fn auto_reply() -> (&'static str, Value) {
    ("auto_reply", json!({ "platform": "x", "template": "Thanks for the mention!" }))
}

#[tokio::test]
async fn notification_automation_runs() {
    let h = Harness::new(CompliancePolicy::default());
    let (id, trigger, _) = h.wired(new_follower(), notification()).await;

    let active = h.service.activate(id, h.version(id).await).await.expect("activate");
    assert_eq!(active.status(), Status::Active);
    assert_eq!(active.runs_count(), 0);
    assert!(h.dispatcher.is_active(id));

    let run_id = h
        .service
        .fire_trigger(id, trigger, json!({ "follower": "@ada" }))
        .await
        .expect("fire");
    let dispatched = h.dispatcher.dispatched();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].run_id, run_id);
    assert_eq!(dispatched[0].subgraph.node_count(), 2);

    let after = h
        .service
        .report_run(id, RunOutcome::Succeeded, run_id.to_string())
        .await
        .expect("report");
    assert_eq!(after.runs_count(), 1);
    assert_eq!(
        after.audit_log().last().map(|e| e.event),
        Some(AuditEvent::RunSucceeded)
    );
}

#[tokio::test]
async fn missing_consent_blocks_activation() {
    let h = Harness::new(CompliancePolicy::default());
    let (id, _, action) = h.wired(mention(), auto_reply()).await;

    let err = h.service.activate(id, h.version(id).await).await.unwrap_err();
    match err.current_context() {
        AutomationError::Lifecycle(LifecycleError::Compliance(violations)) => {
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].node_id, action);
            assert_eq!(violations[0].platform, Platform::X);
            assert_eq!(
                violations[0].kind,
                ViolationKind::MissingCapability {
                    capability: Capability::ExplicitConsent
                }
            );
        }
        other => panic!("expected a compliance failure, got {other:?}"),
    }
    assert_eq!(h.service.get(id).await.expect("load").status(), Status::Draft);
    assert!(h.dispatcher.events().is_empty());
}

#[tokio::test]
async fn empty_draft_cannot_activate() {
    let h = Harness::new(CompliancePolicy::default());
    let automation = h
        .service
        .create(h.account, "empty".to_string())
        .await
        .expect("create");

    let err = h
        .service
        .activate(automation.id(), automation.version())
        .await
        .unwrap_err();
    assert_eq!(
        err.current_context(),
        &AutomationError::Lifecycle(LifecycleError::Validation(vec![ValidationIssue::NoTrigger]))
    );
    assert_eq!(
        h.service.get(automation.id()).await.expect("load").status(),
        Status::Draft
    );
}

#[tokio::test]
async fn revocation_pauses_and_blocks_reactivation() {
    let h = Harness::new(CompliancePolicy::default());
    h.consents
        .grant(h.account, Platform::X, Capability::ExplicitConsent);
    let (id, _, _) = h.wired(mention(), auto_reply()).await;
    h.service.activate(id, h.version(id).await).await.expect("activate");

    let event = h
        .consents
        .revoke(h.account, Platform::X, Capability::ExplicitConsent)
        .expect("revoked");
    let report = h.service.consent_revoked(event).await.expect("revocation");
    assert_eq!(report.paused, vec![id]);

    let paused = h.service.get(id).await.expect("load");
    assert_eq!(paused.status(), Status::Paused);
    assert_eq!(
        paused.audit_log().last().map(|e| e.event),
        Some(AuditEvent::ConsentRevoked)
    );
    assert!(!h.dispatcher.is_active(id));

    let err = h.service.activate(id, paused.version()).await.unwrap_err();
    assert!(matches!(
        err.current_context(),
        AutomationError::Lifecycle(LifecycleError::Compliance(_))
    ));
    assert_eq!(h.service.get(id).await.expect("load").status(), Status::Paused);
}

#[tokio::test]
async fn consent_event_stream_drives_pauses() {
    let h = Harness::new(CompliancePolicy::default());
    h.consents
        .grant(h.account, Platform::X, Capability::ExplicitConsent);
    let (dependent, _, _) = h.wired(mention(), auto_reply()).await;
    let (independent, _, _) = h.wired(new_follower(), notification()).await;
    h.service
        .activate(dependent, h.version(dependent).await)
        .await
        .expect("activate");
    h.service
        .activate(independent, h.version(independent).await)
        .await
        .expect("activate");

    let events = h.consents.subscribe();
    h.consents
        .revoke(h.account, Platform::X, Capability::ExplicitConsent)
        .expect("revoked");
    // Only the one event; the stream ends once it is drained.
    let report = h.service.consume_consent_events(events.take(1)).await;

    assert_eq!(report.paused, vec![dependent]);
    assert_eq!(report.unaffected, vec![independent]);
    assert_eq!(h.service.get(independent).await.expect("load").status(), Status::Active);
}

#[tokio::test]
async fn stale_version_conflicts() {
    let h = Harness::new(CompliancePolicy::default());
    let automation = h
        .service
        .create(h.account, "shared".to_string())
        .await
        .expect("create");
    let seen = automation.version();

    h.service
        .edit(automation.id(), seen, vec![add(NodeKind::Trigger, new_follower())])
        .await
        .expect("first tab");

    let err = h
        .service
        .edit(automation.id(), seen, vec![add(NodeKind::Trigger, mention())])
        .await
        .unwrap_err();
    let conflict = err.current_context().conflict().expect("conflict");
    assert_eq!(conflict.expected, seen);
    assert_eq!(conflict.actual, seen + 1);
    assert_eq!(
        h.service.get(automation.id()).await.expect("load").graph().node_count(),
        1
    );
}

#[tokio::test]
async fn report_after_pause_keeps_status() {
    let h = Harness::new(CompliancePolicy::default());
    let (id, _, _) = h.wired(new_follower(), notification()).await;
    h.service.activate(id, h.version(id).await).await.expect("activate");
    h.service
        .pause(id, h.version(id).await, "holiday".to_string())
        .await
        .expect("pause");

    let after = h
        .service
        .report_run(id, RunOutcome::Failed, "late".to_string())
        .await
        .expect("report");
    assert_eq!(after.status(), Status::Paused);
    assert_eq!(after.runs_count(), 1);
    assert_eq!(
        h.dispatcher.events().last(),
        Some(&DispatchEvent::Deactivated(id))
    );
}

#[tokio::test]
async fn triggers_fire_only_while_active() {
    let h = Harness::new(CompliancePolicy::default());
    let (id, trigger, action) = h.wired(new_follower(), notification()).await;

    let err = h
        .service
        .fire_trigger(id, trigger, Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(
        err.current_context(),
        AutomationError::NotActive {
            status: Status::Draft,
            ..
        }
    ));

    h.service.activate(id, h.version(id).await).await.expect("activate");
    let err = h
        .service
        .fire_trigger(id, action, Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(
        err.current_context(),
        AutomationError::TriggerNotReachable { .. }
    ));
}

#[tokio::test]
async fn run_limit_rejects_excess_runs() {
    let policy = CompliancePolicy::default().with_run_limit(Platform::Instagram, RunLimit::per_hour(1));
    let h = Harness::new(policy);
    let (id, trigger, _) = h
        .wired(
            new_follower(),
            ("create_draft", json!({ "platform": "instagram", "template": "Welcome!" })),
        )
        .await;
    h.service.activate(id, h.version(id).await).await.expect("activate");

    h.service
        .fire_trigger(id, trigger, Value::Null)
        .await
        .expect("first run");
    let err = h
        .service
        .fire_trigger(id, trigger, Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(
        err.current_context(),
        AutomationError::RateLimited {
            platform: Platform::Instagram,
            ..
        }
    ));
    assert_eq!(h.dispatcher.dispatched().len(), 1);
}

#[tokio::test]
async fn archive_is_terminal() {
    let h = Harness::new(CompliancePolicy::default());
    let (id, _, _) = h.wired(new_follower(), notification()).await;
    h.service.activate(id, h.version(id).await).await.expect("activate");

    let archived = h.service.archive(id, h.version(id).await).await.expect("archive");
    assert_eq!(archived.status(), Status::Archived);
    assert!(!h.dispatcher.is_active(id));

    let err = h.service.activate(id, archived.version()).await.unwrap_err();
    assert_eq!(
        err.current_context(),
        &AutomationError::Lifecycle(LifecycleError::InvalidTransition {
            from: Status::Archived,
            to: Status::Active,
        })
    );
}

#[tokio::test]
async fn save_draft_reports_issues() {
    let h = Harness::new(CompliancePolicy::default());
    let (id, _, _) = h.wired(new_follower(), notification()).await;

    let (saved, issues) = h
        .service
        .save_draft(id, h.version(id).await, postflow_workflow::WorkflowGraph::new())
        .await
        .expect("save");
    assert_eq!(issues, vec![ValidationIssue::NoTrigger]);
    assert!(saved.graph().is_empty());
    assert_eq!(h.service.get(id).await.expect("load"), saved);
}

#[tokio::test]
async fn refused_activation_leaves_automation_unchanged() {
    let h = Harness::with_dispatcher(CompliancePolicy::default(), FlakyDispatcher::default());
    let (id, _, _) = h.wired(new_follower(), notification()).await;
    let version = h.version(id).await;
    h.dispatcher.refuse_activation.store(true, Ordering::SeqCst);

    let err = h.service.activate(id, version).await.unwrap_err();
    assert!(matches!(err.current_context(), AutomationError::Dispatch { .. }));
    let stored = h.service.get(id).await.expect("load");
    assert_eq!(stored.status(), Status::Draft);
    assert_eq!(stored.version(), version);
    assert!(!h.dispatcher.inner.is_active(id));

    h.dispatcher.refuse_activation.store(false, Ordering::SeqCst);
    let active = h.service.activate(id, version).await.expect("retry");
    assert_eq!(active.status(), Status::Active);
    assert!(h.dispatcher.inner.is_active(id));
}

#[tokio::test]
async fn refused_deactivation_keeps_automation_active() {
    let h = Harness::with_dispatcher(CompliancePolicy::default(), FlakyDispatcher::default());
    let (id, _, _) = h.wired(new_follower(), notification()).await;
    h.service.activate(id, h.version(id).await).await.expect("activate");
    let version = h.version(id).await;
    h.dispatcher.refuse_deactivation.store(true, Ordering::SeqCst);

    let err = h
        .service
        .pause(id, version, "holiday".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err.current_context(), AutomationError::Dispatch { .. }));
    let stored = h.service.get(id).await.expect("load");
    assert_eq!(stored.status(), Status::Active);
    assert_eq!(stored.version(), version);
    assert!(h.dispatcher.inner.is_active(id));
}

#[tokio::test]
async fn refused_dispatch_does_not_use_run_quota() {
    let policy = CompliancePolicy::default().with_run_limit(Platform::Instagram, RunLimit::per_hour(1));
    let h = Harness::with_dispatcher(policy, FlakyDispatcher::default());
    let (id, trigger, _) = h
        .wired(
            new_follower(),
            ("create_draft", json!({ "platform": "instagram", "template": "Welcome!" })),
        )
        .await;
    h.service.activate(id, h.version(id).await).await.expect("activate");

    h.dispatcher.refuse_dispatch.store(true, Ordering::SeqCst);
    let err = h
        .service
        .fire_trigger(id, trigger, Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(err.current_context(), AutomationError::Dispatch { .. }));

    h.dispatcher.refuse_dispatch.store(false, Ordering::SeqCst);
    h.service
        .fire_trigger(id, trigger, Value::Null)
        .await
        .expect("quota was given back");
    assert_eq!(h.dispatcher.inner.dispatched().len(), 1);
}
