//! Workflow graph implementation using petgraph.
//!
//! An automation's graph is a DAG where:
//! - Nodes are triggers, conditions and actions drawn from the catalog
//! - Edges leave triggers/conditions and enter conditions/actions
//!
//! A display order is kept beside the graph for the authoring surface.
//! Reordering never affects structure or validity.

use crate::catalog::NodeCatalog;
use crate::edge::Edge;
use crate::error::{GraphError, ValidationIssue};
use crate::node::{Config, Node, NodeId, NodeKind};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::Bfs;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};

/// A workflow graph backed by petgraph's stable directed graph.
///
/// Stable indices survive node removal, so the id map never goes stale.
#[derive(Debug, Clone, Default)]
pub struct WorkflowGraph {
    graph: StableDiGraph<Node, ()>,
    /// Map from NodeId to petgraph's NodeIndex for O(1) lookup.
    node_index_map: HashMap<NodeId, NodeIndex>,
    /// Node ids in the order the authoring surface shows them.
    display_order: Vec<NodeId>,
}

impl WorkflowGraph {
    /// Creates a new empty workflow graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an unconnected node of a catalog type.
    ///
    /// The node is appended to the display order.
    ///
    /// # Errors
    ///
    /// - `UnknownNodeType` if the catalog has no entry for `node_type`
    /// - `KindMismatch` if the entry is not of `kind`
    /// - `InvalidConfig` if `config` does not match the entry's schema
    pub fn add_node(
        &mut self,
        catalog: &NodeCatalog,
        kind: NodeKind,
        node_type: &str,
        config: Config,
    ) -> Result<NodeId, GraphError> {
        let entry = catalog.lookup(node_type)?;
        if entry.kind != kind {
            return Err(GraphError::KindMismatch {
                node_type: node_type.to_string(),
                declared: entry.kind,
                requested: kind,
            });
        }
        let node = Node::from_catalog(entry, config)?;
        self.insert_node(node)
    }

    /// Inserts an already-built node.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNode` if a node with the same id exists.
    pub fn insert_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let node_id = node.id();
        if self.node_index_map.contains_key(&node_id) {
            return Err(GraphError::DuplicateNode { node_id });
        }
        let index = self.graph.add_node(node);
        self.node_index_map.insert(node_id, index);
        self.display_order.push(node_id);
        Ok(node_id)
    }

    /// Removes a node and every edge incident to it.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node is absent.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Node, GraphError> {
        let index = self.index_of(node_id)?;
        let node = self
            .graph
            .remove_node(index)
            .ok_or(GraphError::NodeNotFound { node_id })?;
        self.node_index_map.remove(&node_id);
        self.display_order.retain(|id| *id != node_id);
        Ok(node)
    }

    /// Replaces a node's config, re-deriving its platform requirements.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound`, `UnknownNodeType` or `InvalidConfig`; the node
    /// is unchanged on failure.
    pub fn update_config(
        &mut self,
        catalog: &NodeCatalog,
        node_id: NodeId,
        config: Config,
    ) -> Result<(), GraphError> {
        let index = self.index_of(node_id)?;
        let node = self
            .graph
            .node_weight_mut(index)
            .ok_or(GraphError::NodeNotFound { node_id })?;
        let entry = catalog.lookup(node.node_type().as_str())?;
        node.replace_config(entry, config)
    }

    /// Adds a directed edge.
    ///
    /// Edges form a set: adding an existing edge returns `Ok(false)` and
    /// changes nothing.
    ///
    /// # Errors
    ///
    /// - `NodeNotFound` if either endpoint is absent
    /// - `InvalidEdgeDirection` if the kinds may not be connected this way
    /// - `CycleDetected` if `from` is reachable from `to`
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<bool, GraphError> {
        let from_index = self.index_of(from)?;
        let to_index = self.index_of(to)?;

        let from_kind = self.kind_at(from_index, from)?;
        let to_kind = self.kind_at(to_index, to)?;
        if !from_kind.can_precede(to_kind) {
            return Err(GraphError::InvalidEdgeDirection {
                from,
                from_kind,
                to,
                to_kind,
            });
        }

        if self.graph.find_edge(from_index, to_index).is_some() {
            return Ok(false);
        }

        if petgraph::algo::has_path_connecting(&self.graph, to_index, from_index, None) {
            return Err(GraphError::CycleDetected { from, to });
        }

        self.graph.add_edge(from_index, to_index, ());
        Ok(true)
    }

    /// Removes an edge if present.
    ///
    /// Returns whether an edge was removed; a missing edge is not an error.
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        let (Some(&from_index), Some(&to_index)) =
            (self.node_index_map.get(&from), self.node_index_map.get(&to))
        else {
            return false;
        };
        match self.graph.find_edge(from_index, to_index) {
            Some(edge) => self.graph.remove_edge(edge).is_some(),
            None => false,
        }
    }

    /// Moves a node to `position` in the display order.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` or `PositionOutOfRange`.
    pub fn reorder(&mut self, node_id: NodeId, position: usize) -> Result<(), GraphError> {
        let current = self
            .position(node_id)
            .ok_or(GraphError::NodeNotFound { node_id })?;
        let len = self.display_order.len();
        if position >= len {
            return Err(GraphError::PositionOutOfRange { position, len });
        }
        let id = self.display_order.remove(current);
        self.display_order.insert(position, id);
        Ok(())
    }

    /// Returns a node's display position.
    #[must_use]
    pub fn position(&self, node_id: NodeId) -> Option<usize> {
        self.display_order.iter().position(|id| *id == node_id)
    }

    /// Returns a reference to a node by its ID.
    #[must_use]
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        let index = self.node_index_map.get(&node_id)?;
        self.graph.node_weight(*index)
    }

    #[must_use]
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.node_index_map.contains_key(&node_id)
    }

    #[must_use]
    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        match (self.node_index_map.get(&from), self.node_index_map.get(&to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Returns all nodes in display order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.display_order.iter().filter_map(|id| self.node(*id))
    }

    /// Returns the node ids in display order.
    #[must_use]
    pub fn display_order(&self) -> &[NodeId] {
        &self.display_order
    }

    /// Returns every edge, ordered by the display position of its endpoints.
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .filter_map(|(a, b)| {
                let from = self.graph.node_weight(a)?.id();
                let to = self.graph.node_weight(b)?.id();
                Some(Edge::new(from, to))
            })
            .collect();
        edges.sort_by_key(|edge| (self.position(edge.from), self.position(edge.to)));
        edges
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns the Trigger nodes in display order.
    pub fn triggers(&self) -> impl Iterator<Item = &Node> {
        self.nodes().filter(|n| n.kind() == NodeKind::Trigger)
    }

    /// Returns the Action nodes in display order.
    pub fn actions(&self) -> impl Iterator<Item = &Node> {
        self.nodes().filter(|n| n.kind() == NodeKind::Action)
    }

    /// Returns the downstream neighbors of a node.
    #[must_use]
    pub fn successors(&self, node_id: NodeId) -> Vec<&Node> {
        self.neighbors(node_id, Direction::Outgoing)
    }

    /// Returns the upstream neighbors of a node.
    #[must_use]
    pub fn predecessors(&self, node_id: NodeId) -> Vec<&Node> {
        self.neighbors(node_id, Direction::Incoming)
    }

    /// Returns the induced subgraph of nodes reachable from a Trigger.
    ///
    /// A Trigger belongs to it only when it has outgoing edges; nodes with
    /// no incident edges are scratch nodes and are left out. Display order
    /// is preserved.
    #[must_use]
    pub fn reachable_subgraph(&self) -> WorkflowGraph {
        let mut reachable: HashSet<NodeIndex> = HashSet::new();
        for trigger in self.triggers() {
            let Some(&start) = self.node_index_map.get(&trigger.id()) else {
                continue;
            };
            if self
                .graph
                .neighbors_directed(start, Direction::Outgoing)
                .next()
                .is_none()
            {
                continue;
            }
            let mut bfs = Bfs::new(&self.graph, start);
            while let Some(index) = bfs.next(&self.graph) {
                reachable.insert(index);
            }
        }

        let mut subgraph = WorkflowGraph::new();
        let mut index_map: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        for node_id in &self.display_order {
            let Some(&index) = self.node_index_map.get(node_id) else {
                continue;
            };
            if !reachable.contains(&index) {
                continue;
            }
            if let Some(node) = self.graph.node_weight(index) {
                let new_index = subgraph.graph.add_node(node.clone());
                subgraph.node_index_map.insert(*node_id, new_index);
                subgraph.display_order.push(*node_id);
                index_map.insert(index, new_index);
            }
        }

        for edge in self.graph.edge_indices() {
            let Some((a, b)) = self.graph.edge_endpoints(edge) else {
                continue;
            };
            if let (Some(&a), Some(&b)) = (index_map.get(&a), index_map.get(&b)) {
                subgraph.graph.add_edge(a, b, ());
            }
        }

        subgraph
    }

    /// Checks structural well-formedness, reporting every problem found.
    ///
    /// Graphs built through this type's operations are always well formed;
    /// this guards graphs assembled elsewhere.
    #[must_use]
    pub fn structural_issues(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for edge in self.graph.edge_indices() {
            let Some((a, b)) = self.graph.edge_endpoints(edge) else {
                continue;
            };
            match (self.graph.node_weight(a), self.graph.node_weight(b)) {
                (Some(from), Some(to)) => {
                    if !from.kind().can_precede(to.kind()) {
                        issues.push(ValidationIssue::InvalidEdgeDirection {
                            from: from.id(),
                            to: to.id(),
                        });
                    }
                }
                (from, to) => {
                    if let (Some(from), Some(to)) = (
                        from.map(Node::id).or_else(|| self.id_at(a)),
                        to.map(Node::id).or_else(|| self.id_at(b)),
                    ) {
                        issues.push(ValidationIssue::DanglingEdge { from, to });
                    }
                }
            }
        }

        if petgraph::algo::is_cyclic_directed(&self.graph) {
            issues.push(ValidationIssue::CycleDetected);
        }

        let listed: HashSet<NodeId> = self.display_order.iter().copied().collect();
        if listed.len() != self.display_order.len()
            || listed.len() != self.node_index_map.len()
            || !listed.iter().all(|id| self.node_index_map.contains_key(id))
        {
            issues.push(ValidationIssue::DisplayOrderMismatch);
        }

        issues
    }

    fn index_of(&self, node_id: NodeId) -> Result<NodeIndex, GraphError> {
        self.node_index_map
            .get(&node_id)
            .copied()
            .ok_or(GraphError::NodeNotFound { node_id })
    }

    fn id_at(&self, index: NodeIndex) -> Option<NodeId> {
        self.node_index_map
            .iter()
            .find_map(|(id, i)| (*i == index).then_some(*id))
    }

    fn kind_at(&self, index: NodeIndex, node_id: NodeId) -> Result<NodeKind, GraphError> {
        self.graph
            .node_weight(index)
            .map(Node::kind)
            .ok_or(GraphError::NodeNotFound { node_id })
    }

    fn neighbors(&self, node_id: NodeId, direction: Direction) -> Vec<&Node> {
        let Some(&index) = self.node_index_map.get(&node_id) else {
            return Vec::new();
        };
        let mut neighbors: Vec<&Node> = self
            .graph
            .neighbors_directed(index, direction)
            .filter_map(|i| self.graph.node_weight(i))
            .collect();
        neighbors.sort_by_key(|n| self.position(n.id()));
        neighbors
    }
}

impl PartialEq for WorkflowGraph {
    fn eq(&self, other: &Self) -> bool {
        self.display_order == other.display_order
            && self.nodes().eq(other.nodes())
            && self.edges() == other.edges()
    }
}

/// Serialized shape of a graph: nodes in display order plus an edge list.
#[derive(Serialize, Deserialize)]
struct GraphRepr {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

impl Serialize for WorkflowGraph {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        GraphRepr {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WorkflowGraph {
    /// Rebuilds the graph through the checked operations, so a record that
    /// violates an invariant is rejected instead of loaded.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr = GraphRepr::deserialize(deserializer)?;
        let mut graph = WorkflowGraph::new();
        for node in repr.nodes {
            graph.insert_node(node).map_err(serde::de::Error::custom)?;
        }
        for edge in repr.edges {
            graph
                .add_edge(edge.from, edge.to)
                .map_err(serde::de::Error::custom)?;
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: serde_json::Value) -> Config {
        value.as_object().cloned().expect("object")
    }

    fn trigger(graph: &mut WorkflowGraph) -> NodeId {
        graph
            .add_node(
                NodeCatalog::builtin(),
                NodeKind::Trigger,
                "new_follower",
                config(json!({ "platform": "instagram" })),
            )
            .expect("trigger")
    }

    fn condition(graph: &mut WorkflowGraph) -> NodeId {
        graph
            .add_node(
                NodeCatalog::builtin(),
                NodeKind::Condition,
                "keyword_match",
                config(json!({ "keywords": ["launch"] })),
            )
            .expect("condition")
    }

    fn action(graph: &mut WorkflowGraph) -> NodeId {
        graph
            .add_node(
                NodeCatalog::builtin(),
                NodeKind::Action,
                "send_notification",
                config(json!({ "message": "hello" })),
            )
            .expect("action")
    }

    #[test]
    fn add_and_get_node() {
        let mut graph = WorkflowGraph::new();
        let id = trigger(&mut graph);

        let node = graph.node(id).expect("node");
        assert_eq!(node.node_type().as_str(), "new_follower");
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.display_order(), &[id]);
    }

    #[test]
    fn add_node_rejects_unknown_type() {
        let mut graph = WorkflowGraph::new();
        let err = graph
            .add_node(NodeCatalog::builtin(), NodeKind::Action, "teleport", Config::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownNodeType { .. }));
        assert!(graph.is_empty());
    }

    #[test]
    fn add_node_rejects_kind_mismatch() {
        let mut graph = WorkflowGraph::new();
        let err = graph
            .add_node(
                NodeCatalog::builtin(),
                NodeKind::Trigger,
                "send_notification",
                Config::new(),
            )
            .unwrap_err();
        assert!(matches!(err, GraphError::KindMismatch { .. }));
        assert!(graph.is_empty());
    }

    #[test]
    fn remove_node_drops_incident_edges() {
        let mut graph = WorkflowGraph::new();
        let t = trigger(&mut graph);
        let c = condition(&mut graph);
        let a = action(&mut graph);
        graph.add_edge(t, c).expect("edge");
        graph.add_edge(c, a).expect("edge");

        let removed = graph.remove_node(c).expect("remove");
        assert_eq!(removed.id(), c);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.display_order(), &[t, a]);

        // Remaining ids still resolve after removal.
        assert!(graph.node(a).is_some());
        assert!(graph.add_edge(t, a).expect("edge"));
    }

    #[test]
    fn remove_missing_node_fails() {
        let mut graph = WorkflowGraph::new();
        let missing = NodeId::new();
        assert_eq!(
            graph.remove_node(missing).unwrap_err(),
            GraphError::NodeNotFound { node_id: missing }
        );
    }

    #[test]
    fn add_edge_missing_endpoint() {
        let mut graph = WorkflowGraph::new();
        let t = trigger(&mut graph);
        let missing = NodeId::new();
        assert_eq!(
            graph.add_edge(t, missing).unwrap_err(),
            GraphError::NodeNotFound { node_id: missing }
        );
    }

    #[test]
    fn add_edge_enforces_direction() {
        let mut graph = WorkflowGraph::new();
        let t = trigger(&mut graph);
        let t2 = trigger(&mut graph);
        let a = action(&mut graph);
        let c = condition(&mut graph);

        assert!(matches!(
            graph.add_edge(a, c),
            Err(GraphError::InvalidEdgeDirection { .. })
        ));
        assert!(matches!(
            graph.add_edge(c, t),
            Err(GraphError::InvalidEdgeDirection { .. })
        ));
        assert!(matches!(
            graph.add_edge(t, t2),
            Err(GraphError::InvalidEdgeDirection { .. })
        ));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn add_edge_is_idempotent() {
        let mut graph = WorkflowGraph::new();
        let t = trigger(&mut graph);
        let a = action(&mut graph);

        assert!(graph.add_edge(t, a).expect("first"));
        assert!(!graph.add_edge(t, a).expect("second"));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn add_edge_rejects_cycles_without_change() {
        let mut graph = WorkflowGraph::new();
        let c1 = condition(&mut graph);
        let c2 = condition(&mut graph);
        let c3 = condition(&mut graph);
        graph.add_edge(c1, c2).expect("edge");
        graph.add_edge(c2, c3).expect("edge");
        let before = graph.edges();

        assert_eq!(
            graph.add_edge(c3, c1).unwrap_err(),
            GraphError::CycleDetected { from: c3, to: c1 }
        );
        assert_eq!(
            graph.add_edge(c2, c2).unwrap_err(),
            GraphError::CycleDetected { from: c2, to: c2 }
        );
        assert_eq!(graph.edges(), before);
    }

    #[test]
    fn no_edge_sequence_produces_a_cycle() {
        let mut graph = WorkflowGraph::new();
        let ids: Vec<NodeId> = (0..5).map(|_| condition(&mut graph)).collect();

        for &from in &ids {
            for &to in &ids {
                let _ = graph.add_edge(from, to);
                assert!(!petgraph::algo::is_cyclic_directed(&graph.graph));
            }
        }
        assert!(graph.structural_issues().is_empty());
    }

    #[test]
    fn remove_edge_is_a_noop_when_absent() {
        let mut graph = WorkflowGraph::new();
        let t = trigger(&mut graph);
        let a = action(&mut graph);

        assert!(!graph.remove_edge(t, a));
        assert!(!graph.remove_edge(NodeId::new(), NodeId::new()));
        graph.add_edge(t, a).expect("edge");
        assert!(graph.remove_edge(t, a));
        assert!(!graph.remove_edge(t, a));
    }

    #[test]
    fn reorder_changes_only_display_order() {
        let mut graph = WorkflowGraph::new();
        let t = trigger(&mut graph);
        let c = condition(&mut graph);
        let a = action(&mut graph);
        graph.add_edge(t, c).expect("edge");
        graph.add_edge(c, a).expect("edge");
        let edges_before = graph.edge_count();

        graph.reorder(a, 0).expect("reorder");
        assert_eq!(graph.display_order(), &[a, t, c]);
        assert_eq!(graph.edge_count(), edges_before);
        assert!(graph.structural_issues().is_empty());

        assert_eq!(
            graph.reorder(a, 3).unwrap_err(),
            GraphError::PositionOutOfRange { position: 3, len: 3 }
        );
    }

    #[test]
    fn update_config_validates() {
        let mut graph = WorkflowGraph::new();
        let a = action(&mut graph);
        let catalog = NodeCatalog::builtin();

        graph
            .update_config(catalog, a, config(json!({ "message": "updated" })))
            .expect("update");
        assert_eq!(graph.node(a).expect("node").config()["message"], "updated");

        let err = graph
            .update_config(catalog, a, config(json!({ "channel": "carrier_pigeon" })))
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidConfig { .. }));
        assert_eq!(graph.node(a).expect("node").config()["message"], "updated");
    }

    #[test]
    fn reachable_subgraph_skips_scratch_nodes() {
        let mut graph = WorkflowGraph::new();
        let t = trigger(&mut graph);
        let c = condition(&mut graph);
        let a = action(&mut graph);
        let lonely_trigger = trigger(&mut graph);
        let scratch_action = action(&mut graph);
        let orphan_condition = condition(&mut graph);
        let orphan_action = action(&mut graph);
        graph.add_edge(t, c).expect("edge");
        graph.add_edge(c, a).expect("edge");
        // Connected, but not reachable from any trigger.
        graph.add_edge(orphan_condition, orphan_action).expect("edge");

        let reachable = graph.reachable_subgraph();
        assert_eq!(reachable.display_order(), &[t, c, a]);
        assert_eq!(reachable.edge_count(), 2);
        assert!(!reachable.contains_node(lonely_trigger));
        assert!(!reachable.contains_node(scratch_action));
        assert!(!reachable.contains_node(orphan_action));
    }

    #[test]
    fn reachable_subgraph_of_empty_graph_is_empty() {
        assert!(WorkflowGraph::new().reachable_subgraph().is_empty());
    }

    #[test]
    fn successors_and_predecessors() {
        let mut graph = WorkflowGraph::new();
        let t = trigger(&mut graph);
        let a1 = action(&mut graph);
        let a2 = action(&mut graph);
        graph.add_edge(t, a2).expect("edge");
        graph.add_edge(t, a1).expect("edge");

        let successors: Vec<NodeId> = graph.successors(t).iter().map(|n| n.id()).collect();
        assert_eq!(successors, vec![a1, a2]);
        assert_eq!(graph.predecessors(a1)[0].id(), t);
        assert!(graph.successors(NodeId::new()).is_empty());
    }

    #[test]
    fn graph_serde_roundtrip() {
        let mut graph = WorkflowGraph::new();
        let t = trigger(&mut graph);
        let c = condition(&mut graph);
        let a = action(&mut graph);
        graph.add_edge(t, c).expect("edge");
        graph.add_edge(c, a).expect("edge");
        graph.reorder(a, 1).expect("reorder");

        let json = serde_json::to_string(&graph).expect("serialize");
        let parsed: WorkflowGraph = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(parsed, graph);
        assert_eq!(parsed.display_order(), &[t, a, c]);
        assert!(parsed.node(t).is_some());
    }

    #[test]
    fn deserialize_rejects_cycles() {
        let mut graph = WorkflowGraph::new();
        let c1 = condition(&mut graph);
        let c2 = condition(&mut graph);
        graph.add_edge(c1, c2).expect("edge");

        let mut json = serde_json::to_value(&graph).expect("serialize");
        json["edges"]
            .as_array_mut()
            .expect("edges")
            .push(json!({ "from": c2, "to": c1 }));

        let err = serde_json::from_value::<WorkflowGraph>(json).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn deserialize_rejects_dangling_edges() {
        let json = json!({
            "nodes": [],
            "edges": [{ "from": NodeId::new(), "to": NodeId::new() }]
        });
        let err = serde_json::from_value::<WorkflowGraph>(json).unwrap_err();
        assert!(err.to_string().contains("node not found"));
    }
}
