//! Compliance checks for postflow automations.
//!
//! This crate decides whether an automation may run:
//!
//! - **Gate**: Structural consent evaluation over a workflow's reachable
//!   actions, plus per-run action ceilings
//! - **Consent**: The consent store seam and revocation events
//! - **Rate limits**: Per-account, per-platform run windows

pub mod consent;
pub mod error;
pub mod gate;
pub mod policy;
pub mod rate_limit;

pub use consent::{ConsentRevoked, ConsentStore, InMemoryConsentStore};
pub use error::ConsentError;
pub use gate::{ComplianceGate, Violation, ViolationKind, action_platforms, evaluate, requires_capability};
pub use policy::CompliancePolicy;
pub use rate_limit::{RateLimitResult, RunLimit, RunRateLimiter};
