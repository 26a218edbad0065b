use crate::graph::NodeKey;
use dashmap::DashMap;

/// Final state of a node within one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Executed,
    Failed,
}

/// Cycle-wide record of which nodes have already run, consulted by every
/// executor working on the cycle.
pub trait CycleStateOracle: Send + Sync {
    fn is_executed(&self, node: &NodeKey) -> bool;
    fn is_failed(&self, node: &NodeKey) -> bool;
    fn mark_executed(&self, node: &NodeKey);
    fn mark_failed(&self, node: &NodeKey);
}

/// In-memory oracle. A failure is final: a node marked failed stays failed.
#[derive(Debug, Default)]
pub struct NodeStateLedger {
    states: DashMap<NodeKey, NodeState>,
}

impl NodeStateLedger {
    pub fn new() -> Self { Self::default() }

    pub fn state(&self, node: &NodeKey) -> Option<NodeState> {
        self.states.get(node).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize { self.states.len() }
    pub fn is_empty(&self) -> bool { self.states.is_empty() }

    pub fn failed(&self) -> Vec<NodeKey> {
        self.states
            .iter()
            .filter(|entry| *entry.value() == NodeState::Failed)
            .map(|entry| entry.key().clone())
            .collect()
    }
}

impl CycleStateOracle for NodeStateLedger {
    fn is_executed(&self, node: &NodeKey) -> bool { self.state(node) == Some(NodeState::Executed) }

    fn is_failed(&self, node: &NodeKey) -> bool { self.state(node) == Some(NodeState::Failed) }

    fn mark_executed(&self, node: &NodeKey) {
        self.states.entry(node.clone()).or_insert(NodeState::Executed);
    }

    fn mark_failed(&self, node: &NodeKey) {
        self.states.insert(node.clone(), NodeState::Failed);
    }
}
