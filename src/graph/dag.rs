//! dag.rs
//! Wraps a petgraph `DiGraph` with the traversals the executor needs.
//! Edges point from an input node to the node that consumes it.

use super::error::GraphError;
use super::node::DependencyNode;
use crate::value::ValueSpecification;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::ops::Index;

/// A unique, stable identifier for a node within one graph.
pub type NodeId = NodeIndex;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    calculation_configuration: String,
    graph: DiGraph<DependencyNode, ()>,
    terminal_outputs: BTreeSet<ValueSpecification>,
}

impl DependencyGraph {
    pub fn new(calculation_configuration: impl Into<String>) -> Self {
        Self { calculation_configuration: calculation_configuration.into(), ..Default::default() }
    }

    pub fn calculation_configuration(&self) -> &str { &self.calculation_configuration }

    pub fn add_node(&mut self, node: DependencyNode) -> NodeId {
        self.graph.add_node(node)
    }

    /// Records that `dependent` consumes an output of `input`.
    pub fn add_dependency(&mut self, input: NodeId, dependent: NodeId) -> Result<(), GraphError> {
        for id in [input, dependent] {
            if self.graph.node_weight(id).is_none() {
                return Err(GraphError::UnknownNode(id.index()));
            }
        }
        if input == dependent {
            return Err(GraphError::SelfDependency(input.index()));
        }
        self.graph.update_edge(input, dependent, ());
        Ok(())
    }

    /// Marks a value the graph must ultimately produce for the cycle's results.
    pub fn add_terminal_output(&mut self, spec: ValueSpecification) {
        self.terminal_outputs.insert(spec);
    }

    pub fn terminal_outputs(&self) -> &BTreeSet<ValueSpecification> { &self.terminal_outputs }

    pub fn node(&self, id: NodeId) -> Option<&DependencyNode> { self.graph.node_weight(id) }
    pub fn node_count(&self) -> usize { self.graph.node_count() }
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ { self.graph.node_indices() }

    /// Nodes whose outputs `id` consumes.
    pub fn inputs(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.neighbors_directed(id, Direction::Incoming)
    }

    /// Nodes consuming the outputs of `id`.
    pub fn dependents(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.neighbors_directed(id, Direction::Outgoing)
    }

    /// The node producing `spec`, if any.
    pub fn producer_of(&self, spec: &ValueSpecification) -> Option<NodeId> {
        self.graph.node_indices().find(|&id| self.graph[id].output_values.contains(spec))
    }

    // --- Graph Algorithms ---

    /// Inputs before dependents.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        toposort(&self.graph, None).map_err(|cycle| GraphError::CycleDetected(cycle.node_id().index()))
    }

    /// The start nodes plus everything that transitively consumes them.
    pub fn downstream_from(&self, start_nodes: &[NodeId]) -> HashSet<NodeId> {
        self.closure(start_nodes, Direction::Outgoing)
    }

    /// The start nodes plus everything they transitively consume.
    pub fn upstream_from(&self, start_nodes: &[NodeId]) -> HashSet<NodeId> {
        self.closure(start_nodes, Direction::Incoming)
    }

    fn closure(&self, start_nodes: &[NodeId], direction: Direction) -> HashSet<NodeId> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from(start_nodes.to_vec());

        while let Some(node) = queue.pop_front() {
            if visited.insert(node) {
                queue.extend(self.graph.neighbors_directed(node, direction));
            }
        }
        visited
    }
}

impl Index<NodeId> for DependencyGraph {
    type Output = DependencyNode;

    /// Panics if `id` is not a node of this graph.
    fn index(&self, id: NodeId) -> &DependencyNode { &self.graph[id] }
}
