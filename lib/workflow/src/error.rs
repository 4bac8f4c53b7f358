//! Error types for the workflow crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `GraphError`: Graph mutations and catalog lookups (one failed operation)
//! - `ValidationIssue`: Findings from save-time validation (many at once)
//! - `CatalogError`: Building a node catalog from entries
//! - `BatchEditError`: A failed edit inside an atomic batch
//!
//! Automation-level context (like the automation id) is added by callers.

use crate::node::{NodeId, NodeKind};
use std::fmt;

/// Errors from graph operations.
///
/// Every operation that returns one of these leaves the graph unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The catalog has no entry for the node type.
    UnknownNodeType { node_type: String },
    /// The requested kind differs from the kind the catalog declares.
    KindMismatch {
        node_type: String,
        declared: NodeKind,
        requested: NodeKind,
    },
    /// The configuration does not match the catalog entry's schema.
    InvalidConfig { node_type: String, reason: String },
    /// Node with the given ID was not found in the graph.
    NodeNotFound { node_id: NodeId },
    /// A node with the given ID already exists.
    DuplicateNode { node_id: NodeId },
    /// The edge would leave an Action or enter a Trigger.
    InvalidEdgeDirection {
        from: NodeId,
        from_kind: NodeKind,
        to: NodeId,
        to_kind: NodeKind,
    },
    /// Adding the edge would close a directed cycle.
    CycleDetected { from: NodeId, to: NodeId },
    /// The display position is past the end of the node list.
    PositionOutOfRange { position: usize, len: usize },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNodeType { node_type } => {
                write!(f, "unknown node type: {node_type}")
            }
            Self::KindMismatch {
                node_type,
                declared,
                requested,
            } => {
                write!(
                    f,
                    "node type '{node_type}' is declared as {declared}, not {requested}"
                )
            }
            Self::InvalidConfig { node_type, reason } => {
                write!(f, "invalid config for '{node_type}': {reason}")
            }
            Self::NodeNotFound { node_id } => {
                write!(f, "node not found: {node_id}")
            }
            Self::DuplicateNode { node_id } => {
                write!(f, "duplicate node: {node_id}")
            }
            Self::InvalidEdgeDirection {
                from,
                from_kind,
                to,
                to_kind,
            } => {
                write!(
                    f,
                    "invalid edge direction: {from_kind} {from} -> {to_kind} {to}"
                )
            }
            Self::CycleDetected { from, to } => {
                write!(f, "edge {from} -> {to} would create a cycle")
            }
            Self::PositionOutOfRange { position, len } => {
                write!(f, "position {position} out of range for {len} nodes")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// A problem found by save-time validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// The graph has no Trigger node, so it can never run.
    NoTrigger,
    /// An edge references a node that is not in the graph.
    DanglingEdge { from: NodeId, to: NodeId },
    /// An edge violates the kind-adjacency rule.
    InvalidEdgeDirection { from: NodeId, to: NodeId },
    /// The graph contains a directed cycle.
    CycleDetected,
    /// The display order does not list exactly the graph's nodes.
    DisplayOrderMismatch,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTrigger => write!(f, "workflow has no trigger"),
            Self::DanglingEdge { from, to } => {
                write!(f, "edge {from} -> {to} references a missing node")
            }
            Self::InvalidEdgeDirection { from, to } => {
                write!(f, "edge {from} -> {to} violates node kind ordering")
            }
            Self::CycleDetected => write!(f, "graph contains cycles"),
            Self::DisplayOrderMismatch => {
                write!(f, "display order is out of sync with graph nodes")
            }
        }
    }
}

impl std::error::Error for ValidationIssue {}

/// Errors from building a node catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Two entries share a node type.
    DuplicateNodeType { node_type: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNodeType { node_type } => {
                write!(f, "duplicate catalog entry for node type '{node_type}'")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// A batch of edits failed; none of them were applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEditError {
    /// Position of the failing edit in the batch.
    pub index: usize,
    pub error: GraphError,
}

impl fmt::Display for BatchEditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edit {} failed: {}", self.index, self.error)
    }
}

impl std::error::Error for BatchEditError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
