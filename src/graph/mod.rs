//! The per-cycle DAG of calculation nodes.
//!
//! Graphs arrive fully resolved from the graph builder; this module only stores
//! them and answers the traversal questions the executor asks.
pub mod dag;
pub mod error;
pub mod node;

pub use dag::{DependencyGraph, NodeId};
pub use error::GraphError;
pub use node::{DependencyNode, NodeKey, ParameterizedFunction};
