//! Workflow node types.
//!
//! Nodes are the building blocks of an automation. Each node has:
//! - A unique ID, fixed at creation
//! - A kind (Trigger, Condition, Action)
//! - A node type naming its catalog entry
//! - A configuration payload validated against the catalog schema
//! - The platform requirements its catalog entry implies

use crate::catalog::{CatalogEntry, NodeCatalog};
use crate::error::GraphError;
use postflow_core::{Platform, PlatformRequirement, define_id};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::borrow::Borrow;
use std::fmt;

define_id!(
    /// A unique identifier for a node within a workflow.
    NodeId,
    "node"
);

/// Configuration payload for a node: option name to value.
pub type Config = Map<String, JsonValue>;

/// The config field naming the platform a node observes or acts on.
pub const PLATFORM_FIELD: &str = "platform";

/// The kind of a workflow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Entry points: an external event that starts evaluation.
    Trigger,
    /// Gates whether downstream nodes execute.
    Condition,
    /// Terminal effects (create content, notify, request approval).
    Action,
}

impl NodeKind {
    /// Returns whether an edge from this kind to `to` respects kind ordering.
    ///
    /// Edges leave Triggers and Conditions, and enter Conditions and Actions.
    #[must_use]
    pub fn can_precede(self, to: NodeKind) -> bool {
        matches!(self, Self::Trigger | Self::Condition)
            && matches!(to, Self::Condition | Self::Action)
    }

    /// Returns the wire name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Condition => "condition",
            Self::Action => "action",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The name of a catalog entry, such as `new_follower` or `auto_reply`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeType(String);

impl NodeType {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Borrow<str> for NodeType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A workflow node.
///
/// Identity and kind are fixed once created. Requirements are derived from
/// the catalog and only change when the config retargets the node to
/// another platform.
///
/// Decoding trusts only the id, kind, type and config. The node is rebuilt
/// against the built-in catalog, so stored requirements are ignored and a
/// kind or config the catalog disagrees with is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredNode")]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    #[serde(rename = "type")]
    node_type: NodeType,
    config: Config,
    platform_requirements: Vec<PlatformRequirement>,
}

impl Node {
    /// Creates a node for a catalog entry, validating its config.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the config does not match the entry's schema.
    pub fn from_catalog(entry: &CatalogEntry, config: Config) -> Result<Self, GraphError> {
        Self::with_id(NodeId::new(), entry, config)
    }

    /// Creates a node with a specific ID.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the config does not match the entry's schema.
    pub fn with_id(id: NodeId, entry: &CatalogEntry, config: Config) -> Result<Self, GraphError> {
        entry.validate_config(&config)?;
        let platform_requirements = entry.requirements_for(&config);
        Ok(Self {
            id,
            kind: entry.kind,
            node_type: entry.node_type.clone(),
            config,
            platform_requirements,
        })
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Capabilities this node needs, each tied to a platform.
    #[must_use]
    pub fn platform_requirements(&self) -> &[PlatformRequirement] {
        &self.platform_requirements
    }

    /// Returns the platform this node targets, if its config names one.
    #[must_use]
    pub fn target_platform(&self) -> Option<Platform> {
        target_platform(&self.config)
    }

    #[must_use]
    pub fn is_trigger(&self) -> bool {
        self.kind == NodeKind::Trigger
    }

    #[must_use]
    pub fn is_action(&self) -> bool {
        self.kind == NodeKind::Action
    }

    /// Replaces the config, re-deriving requirements.
    ///
    /// The node is unchanged if validation fails.
    pub(crate) fn replace_config(
        &mut self,
        entry: &CatalogEntry,
        config: Config,
    ) -> Result<(), GraphError> {
        entry.validate_config(&config)?;
        self.platform_requirements = entry.requirements_for(&config);
        self.config = config;
        Ok(())
    }
}

/// The decoded form of a [`Node`] before it is checked against the catalog.
#[derive(Deserialize)]
struct StoredNode {
    id: NodeId,
    kind: NodeKind,
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(default)]
    config: Config,
}

impl TryFrom<StoredNode> for Node {
    type Error = GraphError;

    fn try_from(stored: StoredNode) -> Result<Self, Self::Error> {
        let entry = NodeCatalog::builtin().lookup(stored.node_type.as_str())?;
        if entry.kind != stored.kind {
            return Err(GraphError::KindMismatch {
                node_type: stored.node_type.to_string(),
                declared: entry.kind,
                requested: stored.kind,
            });
        }
        Self::with_id(stored.id, entry, stored.config)
    }
}

/// Reads the target platform out of a config payload.
#[must_use]
pub fn target_platform(config: &Config) -> Option<Platform> {
    config
        .get(PLATFORM_FIELD)
        .and_then(JsonValue::as_str)
        .and_then(|name| name.parse().ok())
}
