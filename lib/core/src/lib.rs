//! Core domain types and utilities for postflow.
//!
//! This crate provides the foundational types shared by the workflow,
//! compliance and automation crates: typed identifiers, the platform and
//! capability vocabulary, and the rootcause-based `Result` alias.

pub mod error;
pub mod id;
pub mod platform;

pub use error::Result;
pub use id::{AccountId, AutomationId, ParseIdError, RunId};
pub use platform::{Capability, ConsentSet, Platform, PlatformRequirement, UnknownNameError};
