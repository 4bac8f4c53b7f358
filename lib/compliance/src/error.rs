//! Error types for the compliance crate.
//!
//! Violations found by the gate are findings, not errors, and live in
//! [`crate::gate`]. The errors here come from collaborators.

use postflow_core::AccountId;
use std::fmt;

/// Errors from consent store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentError {
    /// The store could not be reached.
    Unavailable { reason: String },
    /// The store has no record of the account.
    UnknownAccount { account_id: AccountId },
}

impl fmt::Display for ConsentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "consent store unavailable: {reason}"),
            Self::UnknownAccount { account_id } => {
                write!(f, "no consent record for account {account_id}")
            }
        }
    }
}

impl std::error::Error for ConsentError {}
