//! The compliance gate: decides whether a graph may be activated.
//!
//! Consent is evaluated against the graph structure, not a flat list of
//! toggles. Every reachable Action is checked, so a graph with several
//! actions on different platforms surfaces all of its problems at once.

use crate::policy::CompliancePolicy;
use postflow_core::{Capability, ConsentSet, Platform, PlatformRequirement};
use postflow_workflow::{NodeId, WorkflowGraph};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Why a node failed the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// The account has not granted a capability the node requires.
    MissingCapability { capability: Capability },
    /// The node is past the platform's per-run action ceiling.
    RateCeilingExceeded { ceiling: u32 },
}

/// A single compliance finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub node_id: NodeId,
    pub platform: Platform,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl Violation {
    #[must_use]
    pub fn missing(node_id: NodeId, requirement: PlatformRequirement) -> Self {
        Self {
            node_id,
            platform: requirement.platform,
            kind: ViolationKind::MissingCapability {
                capability: requirement.capability,
            },
        }
    }

    /// Returns the missing capability, if that is the cause.
    #[must_use]
    pub fn missing_capability(&self) -> Option<Capability> {
        match self.kind {
            ViolationKind::MissingCapability { capability } => Some(capability),
            ViolationKind::RateCeilingExceeded { .. } => None,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ViolationKind::MissingCapability { capability } => write!(
                f,
                "node {} requires {capability} on {}",
                self.node_id, self.platform
            ),
            ViolationKind::RateCeilingExceeded { ceiling } => write!(
                f,
                "node {} exceeds the {} limit of {ceiling} actions per run",
                self.node_id, self.platform
            ),
        }
    }
}

/// Evaluates graphs against consents and a policy.
#[derive(Debug, Clone, Default)]
pub struct ComplianceGate {
    policy: CompliancePolicy,
}

impl ComplianceGate {
    #[must_use]
    pub fn new(policy: CompliancePolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &CompliancePolicy {
        &self.policy
    }

    /// Checks every reachable Action of `graph`.
    ///
    /// Violations come in display order, then requirement order within a
    /// node. A graph with no reachable Action is vacuously compliant.
    ///
    /// # Errors
    ///
    /// Returns every violation found.
    pub fn evaluate(&self, graph: &WorkflowGraph, consents: &ConsentSet) -> Result<(), Vec<Violation>> {
        let reachable = graph.reachable_subgraph();
        let mut violations = Vec::new();
        let mut actions_per_platform: BTreeMap<Platform, u32> = BTreeMap::new();

        for node in reachable.actions() {
            for requirement in node.platform_requirements() {
                if !consents.satisfies(requirement) {
                    violations.push(Violation::missing(node.id(), *requirement));
                }
            }

            let Some(platform) = node.target_platform() else {
                continue;
            };
            let count = actions_per_platform.entry(platform).or_default();
            *count += 1;
            if let Some(ceiling) = self.policy.action_ceiling(platform)
                && *count > ceiling
            {
                violations.push(Violation {
                    node_id: node.id(),
                    platform,
                    kind: ViolationKind::RateCeilingExceeded { ceiling },
                });
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Checks a graph's consent requirements with no policy limits.
///
/// # Errors
///
/// Returns every missing capability.
pub fn evaluate(graph: &WorkflowGraph, consents: &ConsentSet) -> Result<(), Vec<Violation>> {
    ComplianceGate::default().evaluate(graph, consents)
}

/// Returns whether a reachable Action requires the capability on the platform.
#[must_use]
pub fn requires_capability(graph: &WorkflowGraph, platform: Platform, capability: Capability) -> bool {
    let wanted = PlatformRequirement::new(platform, capability);
    graph
        .reachable_subgraph()
        .actions()
        .any(|node| node.platform_requirements().contains(&wanted))
}

/// Returns the platforms targeted by the reachable Actions, deduplicated.
#[must_use]
pub fn action_platforms(graph: &WorkflowGraph) -> Vec<Platform> {
    let mut platforms: Vec<Platform> = graph
        .reachable_subgraph()
        .actions()
        .filter_map(|node| node.target_platform())
        .collect();
    platforms.sort();
    platforms.dedup();
    platforms
}
