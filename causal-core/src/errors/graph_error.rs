use crate::dag::NodeId;

/// Graph-layer errors. Cycle rejection is part of the `Dag` contract;
/// a `CycleDetected` escaping the search layer indicates a search bug.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("adding edge {parent} -> {child} would create a cycle")]
    CycleDetected { parent: NodeId, child: NodeId },

    #[error("self-loop rejected on node {node}")]
    SelfLoop { node: NodeId },

    #[error("duplicate edge {parent} -> {child}")]
    DuplicateEdge { parent: NodeId, child: NodeId },

    #[error("node {node} out of range for graph with {n_nodes} nodes")]
    NodeOutOfRange { node: NodeId, n_nodes: usize },
}
