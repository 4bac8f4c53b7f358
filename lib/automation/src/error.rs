//! Error types for the automation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `LifecycleError`: A rejected operation on one automation
//! - `StoreError`: Errors from automation storage
//! - `RecordError`: Errors decoding a durable record
//! - `DispatchError`: Errors from the execution dispatcher
//! - `AutomationError`: Service-level context over all of the above

use crate::automation::Status;
use postflow_compliance::Violation;
use postflow_core::{AccountId, AutomationId, Platform};
use postflow_workflow::{BatchEditError, GraphError, NodeId, ValidationIssue};
use std::fmt;

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from lifecycle operations.
///
/// The automation is unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// The state machine does not allow this move.
    InvalidTransition { from: Status, to: Status },
    /// The graph failed save-time validation.
    Validation(Vec<ValidationIssue>),
    /// The graph failed the compliance gate.
    Compliance(Vec<Violation>),
    /// No Action is reachable from a Trigger, so activation would do nothing.
    NoReachableAction,
    /// The graph can only be edited in Draft.
    NotEditable { status: Status },
    /// Run reports are only accepted while Active or Paused.
    NotRunning { status: Status },
    /// A graph edit failed.
    Graph(GraphError),
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid transition from {from} to {to}")
            }
            Self::Validation(issues) => write!(f, "validation failed: {}", join(issues)),
            Self::Compliance(violations) => {
                write!(f, "compliance check failed: {}", join(violations))
            }
            Self::NoReachableAction => {
                write!(f, "no action is reachable from a trigger")
            }
            Self::NotRunning { status } => {
                write!(f, "automation is {status}; it has no runs to report")
            }
            Self::NotEditable { status } => {
                write!(f, "automation is {status}; only drafts can be edited")
            }
            Self::Graph(err) => write!(f, "graph edit failed: {err}"),
        }
    }
}

impl std::error::Error for LifecycleError {}

impl From<GraphError> for LifecycleError {
    fn from(err: GraphError) -> Self {
        Self::Graph(err)
    }
}

impl From<BatchEditError> for LifecycleError {
    fn from(err: BatchEditError) -> Self {
        Self::Graph(err.error)
    }
}

/// A save referenced a stale version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictError {
    pub automation_id: AutomationId,
    pub expected: u64,
    pub actual: u64,
}

impl fmt::Display for ConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "automation {} is at version {}, not {}",
            self.automation_id, self.actual, self.expected
        )
    }
}

impl std::error::Error for ConflictError {}

/// Errors from automation storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No automation with this id.
    NotFound { automation_id: AutomationId },
    /// An automation with this id already exists.
    AlreadyExists { automation_id: AutomationId },
    /// Optimistic concurrency check failed.
    Conflict(ConflictError),
    /// The stored record could not be encoded or decoded.
    Record(RecordError),
    /// Storage backend failure.
    StorageFailed { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { automation_id } => {
                write!(f, "automation not found: {automation_id}")
            }
            Self::AlreadyExists { automation_id } => {
                write!(f, "automation already exists: {automation_id}")
            }
            Self::Conflict(conflict) => write!(f, "version conflict: {conflict}"),
            Self::Record(err) => write!(f, "bad record: {err}"),
            Self::StorageFailed { reason } => write!(f, "storage failed: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<RecordError> for StoreError {
    fn from(err: RecordError) -> Self {
        Self::Record(err)
    }
}

/// Errors decoding or encoding a durable record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The record was written by a newer or unknown format.
    UnsupportedFormat { found: u32, supported: u32 },
    /// The record is not valid JSON or violates a graph invariant.
    Malformed { reason: String },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFormat { found, supported } => {
                write!(f, "unsupported record format {found} (supported: {supported})")
            }
            Self::Malformed { reason } => write!(f, "malformed record: {reason}"),
        }
    }
}

impl std::error::Error for RecordError {}

/// Errors from the execution dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The dispatcher could not be reached.
    Unavailable { reason: String },
    /// The dispatcher refused the request.
    Rejected { reason: String },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "dispatcher unavailable: {reason}"),
            Self::Rejected { reason } => write!(f, "dispatch rejected: {reason}"),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Service-level errors, reported through `rootcause::Report`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomationError {
    /// The lifecycle rejected the operation.
    Lifecycle(LifecycleError),
    /// The store rejected the operation.
    Store(StoreError),
    /// Consents for the account could not be read.
    ConsentLookup { account_id: AccountId },
    /// The dispatcher could not be notified.
    Dispatch { automation_id: AutomationId },
    /// Triggers only fire for Active automations.
    NotActive {
        automation_id: AutomationId,
        status: Status,
    },
    /// The node is not a Trigger in the automation's reachable subgraph.
    TriggerNotReachable {
        automation_id: AutomationId,
        node_id: NodeId,
    },
    /// The account exhausted its run window for a platform.
    RateLimited {
        platform: Platform,
        retry_after_secs: i64,
    },
}

impl AutomationError {
    /// Returns the version conflict, if this is one.
    #[must_use]
    pub fn conflict(&self) -> Option<&ConflictError> {
        match self {
            Self::Store(StoreError::Conflict(conflict)) => Some(conflict),
            _ => None,
        }
    }
}

impl fmt::Display for AutomationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lifecycle(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::ConsentLookup { account_id } => {
                write!(f, "could not read consents for account {account_id}")
            }
            Self::Dispatch { automation_id } => {
                write!(f, "could not notify dispatcher for automation {automation_id}")
            }
            Self::NotActive {
                automation_id,
                status,
            } => write!(f, "automation {automation_id} is {status}, not active"),
            Self::TriggerNotReachable {
                automation_id,
                node_id,
            } => write!(
                f,
                "node {node_id} is not a connected trigger of automation {automation_id}"
            ),
            Self::RateLimited {
                platform,
                retry_after_secs,
            } => write!(f, "run limit reached on {platform}, retry after {retry_after_secs}s"),
        }
    }
}

impl std::error::Error for AutomationError {}

impl From<LifecycleError> for AutomationError {
    fn from(err: LifecycleError) -> Self {
        Self::Lifecycle(err)
    }
}

impl From<StoreError> for AutomationError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
