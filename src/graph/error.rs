use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Cycle detected involving node {0}")]
    CycleDetected(usize),
    #[error("Node {0} does not exist in the graph")]
    UnknownNode(usize),
    #[error("Node {0} cannot depend on itself")]
    SelfDependency(usize),
}
