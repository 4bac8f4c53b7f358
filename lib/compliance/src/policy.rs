//! Compliance policy: per-platform limits that apply on top of consent.

use crate::rate_limit::RunLimit;
use postflow_core::Platform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-platform limits loaded from configuration.
///
/// A platform with no entry has no limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompliancePolicy {
    /// Most Action nodes a single run may execute against a platform.
    pub max_actions_per_run: BTreeMap<Platform, u32>,
    /// Most runs an account may dispatch against a platform per window.
    pub run_limits: BTreeMap<Platform, RunLimit>,
}

impl CompliancePolicy {
    /// Returns a policy with no limits.
    #[must_use]
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Sets the per-run action ceiling for a platform.
    #[must_use]
    pub fn with_action_ceiling(mut self, platform: Platform, ceiling: u32) -> Self {
        self.max_actions_per_run.insert(platform, ceiling);
        self
    }

    /// Sets the run limit for a platform.
    #[must_use]
    pub fn with_run_limit(mut self, platform: Platform, limit: RunLimit) -> Self {
        self.run_limits.insert(platform, limit);
        self
    }

    #[must_use]
    pub fn action_ceiling(&self, platform: Platform) -> Option<u32> {
        self.max_actions_per_run.get(&platform).copied()
    }

    #[must_use]
    pub fn run_limit(&self, platform: Platform) -> Option<RunLimit> {
        self.run_limits.get(&platform).copied()
    }
}
