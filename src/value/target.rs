//! The entity a function is evaluated against.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetKind {
    PortfolioNode,
    Position,
    Security,
    /// A bare identifier with no backing entity (e.g. a currency or curve name).
    Primitive,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComputationTarget {
    pub kind: TargetKind,
    pub id: String,
}

impl ComputationTarget {
    pub fn new(kind: TargetKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    pub fn security(id: impl Into<String>) -> Self { Self::new(TargetKind::Security, id) }
    pub fn position(id: impl Into<String>) -> Self { Self::new(TargetKind::Position, id) }
    pub fn portfolio_node(id: impl Into<String>) -> Self { Self::new(TargetKind::PortfolioNode, id) }
    pub fn primitive(id: impl Into<String>) -> Self { Self::new(TargetKind::Primitive, id) }
}

impl fmt::Display for ComputationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}~{}", self.kind, self.id)
    }
}
