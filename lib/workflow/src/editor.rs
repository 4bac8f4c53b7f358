//! Graph editor operations for the authoring surface.
//!
//! The editor is a thin command layer over [`WorkflowGraph`]: a drag, drop or
//! form submit on the authoring surface becomes a [`GraphEdit`], and the editor
//! applies it with the graph's own validation. Batches are all-or-nothing.

use crate::catalog::NodeCatalog;
use crate::error::{BatchEditError, GraphError, ValidationIssue};
use crate::graph::WorkflowGraph;
use crate::node::{Config, NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One editing command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GraphEdit {
    AddNode {
        kind: NodeKind,
        node_type: String,
        #[serde(default)]
        config: Config,
    },
    RemoveNode {
        node_id: NodeId,
    },
    Connect {
        from: NodeId,
        to: NodeId,
    },
    Disconnect {
        from: NodeId,
        to: NodeId,
    },
    Reorder {
        node_id: NodeId,
        position: usize,
    },
    UpdateConfig {
        node_id: NodeId,
        config: Config,
    },
}

/// The result of a successfully applied edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    NodeAdded(NodeId),
    NodeRemoved(NodeId),
    /// `false` when the edge already existed.
    Connected(bool),
    /// `false` when there was no edge to remove.
    Disconnected(bool),
    Reordered,
    ConfigUpdated,
}

/// Applies edits against a catalog.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowEditor<'a> {
    catalog: &'a NodeCatalog,
}

impl<'a> WorkflowEditor<'a> {
    #[must_use]
    pub fn new(catalog: &'a NodeCatalog) -> Self {
        Self { catalog }
    }

    /// An editor over the built-in catalog.
    #[must_use]
    pub fn builtin() -> WorkflowEditor<'static> {
        WorkflowEditor::new(NodeCatalog::builtin())
    }

    #[must_use]
    pub fn catalog(&self) -> &'a NodeCatalog {
        self.catalog
    }

    /// Applies a single edit.
    ///
    /// # Errors
    ///
    /// Returns the graph's error; the graph is unchanged on failure.
    pub fn apply(&self, graph: &mut WorkflowGraph, edit: GraphEdit) -> Result<EditOutcome, GraphError> {
        let outcome = match edit {
            GraphEdit::AddNode {
                kind,
                node_type,
                config,
            } => EditOutcome::NodeAdded(graph.add_node(self.catalog, kind, &node_type, config)?),
            GraphEdit::RemoveNode { node_id } => {
                graph.remove_node(node_id)?;
                EditOutcome::NodeRemoved(node_id)
            }
            GraphEdit::Connect { from, to } => EditOutcome::Connected(graph.add_edge(from, to)?),
            GraphEdit::Disconnect { from, to } => {
                EditOutcome::Disconnected(graph.remove_edge(from, to))
            }
            GraphEdit::Reorder { node_id, position } => {
                graph.reorder(node_id, position)?;
                EditOutcome::Reordered
            }
            GraphEdit::UpdateConfig { node_id, config } => {
                graph.update_config(self.catalog, node_id, config)?;
                EditOutcome::ConfigUpdated
            }
        };
        debug!(?outcome, "applied graph edit");
        Ok(outcome)
    }

    /// Applies a batch of edits atomically.
    ///
    /// Edits run against a working copy that replaces `graph` only once every
    /// edit has succeeded.
    ///
    /// # Errors
    ///
    /// Returns the first failing edit and its position; `graph` is untouched.
    pub fn apply_all(
        &self,
        graph: &mut WorkflowGraph,
        edits: impl IntoIterator<Item = GraphEdit>,
    ) -> Result<Vec<EditOutcome>, BatchEditError> {
        let mut working = graph.clone();
        let mut outcomes = Vec::new();
        for (index, edit) in edits.into_iter().enumerate() {
            match self.apply(&mut working, edit) {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) => {
                    debug!(index, %error, "discarding edit batch");
                    return Err(BatchEditError { index, error });
                }
            }
        }
        *graph = working;
        Ok(outcomes)
    }
}

/// Checks whether a graph is well formed enough to save.
///
/// Reports every issue: a missing Trigger and any structural problem.
/// Compliance is not checked here since consent can change after saving.
///
/// # Errors
///
/// Returns all issues found.
pub fn validate_for_save(graph: &WorkflowGraph) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    if graph.triggers().next().is_none() {
        issues.push(ValidationIssue::NoTrigger);
    }
    issues.extend(graph.structural_issues());

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
