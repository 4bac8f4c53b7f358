//! Workflow model for postflow automations.
//!
//! This crate provides the graph an automation is authored as:
//!
//! - **Node Catalog**: The registry of trigger, condition and action types,
//!   their config schemas and the platform capabilities they imply
//! - **Graph Model**: A petgraph DAG of typed nodes with kind-ordered edges
//!   and a display order that never affects semantics
//! - **Editor**: Command-style edits with atomic batches and save-time
//!   validation

pub mod catalog;
pub mod edge;
pub mod editor;
pub mod error;
pub mod graph;
pub mod node;
pub mod schema;

pub use catalog::{CapabilityRule, CatalogEntry, NodeCatalog};
pub use edge::Edge;
pub use editor::{EditOutcome, GraphEdit, WorkflowEditor, validate_for_save};
pub use error::{BatchEditError, CatalogError, GraphError, ValidationIssue};
pub use graph::WorkflowGraph;
pub use node::{Config, Node, NodeId, NodeKind, NodeType};
pub use schema::{ConfigField, ConfigSchema, FieldType};
