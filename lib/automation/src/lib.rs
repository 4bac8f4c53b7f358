//! Automation lifecycle for postflow.
//!
//! This crate owns the automation entity and everything around it:
//!
//! - **Lifecycle**: The Draft/Active/Paused/Archived state machine with its
//!   activation guards and append-only audit log
//! - **Records**: The durable, versioned serialized form
//! - **Store**: Storage with optimistic concurrency
//! - **Dispatcher**: The seam to the external execution system
//! - **Service**: Boundary orchestration over store, consents and dispatcher

pub mod audit;
pub mod automation;
pub mod dispatcher;
pub mod error;
pub mod record;
pub mod service;
pub mod store;

pub use audit::{AuditEntry, AuditEvent, AuditLog};
pub use automation::{Automation, RunOutcome, Status};
pub use dispatcher::{DispatchEvent, ExecutionDispatcher, ExecutionRequest, RecordingDispatcher};
pub use error::{
    AutomationError, ConflictError, DispatchError, LifecycleError, RecordError, StoreError,
};
pub use record::{AutomationRecord, FORMAT_VERSION};
pub use service::{AutomationService, RevocationReport};
pub use store::{AutomationStore, InMemoryAutomationStore};
