//! DAG over a fixed node arena. Nodes are integer indices `0..n_nodes`
//! with stable names; adjacency lives in a `petgraph` stable graph so
//! reachability and toposort come from the library. Every structural
//! mutation bumps a version counter, which is what downstream caches
//! (topological order here, score caches elsewhere) key on.

use petgraph::algo::toposort;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::Dfs;
use petgraph::Directed;

use crate::errors::GraphError;

/// Index of a variable in the fixed node set.
pub type NodeId = usize;

/// A directed edge `(parent, child)`.
pub type Edge = (NodeId, NodeId);

/// Directed acyclic graph over a fixed variable set.
///
/// Invariants: no cycles, no self-loops, no duplicate edges. `add_edge`
/// re-checks acyclicity before insertion; `remove_edge` is always safe.
#[derive(Debug, Clone)]
pub struct Dag {
    graph: StableGraph<NodeId, (), Directed>,
    /// `indices[id]` is the petgraph index of node `id`. Nodes are never
    /// removed, so this mapping is stable for the life of the graph.
    indices: Vec<NodeIndex>,
    names: Vec<String>,
    version: u64,
    cached_order: Option<Vec<NodeId>>,
}

impl Dag {
    /// Empty DAG over `n_nodes` variables named `x0..x{n-1}`.
    pub fn new(n_nodes: usize) -> Self {
        Self::with_names(crate::dataset::default_node_names(n_nodes))
    }

    /// Empty DAG with caller-supplied node names.
    pub fn with_names(names: Vec<String>) -> Self {
        let mut graph = StableGraph::default();
        let indices = (0..names.len()).map(|id| graph.add_node(id)).collect();
        Self {
            graph,
            indices,
            names,
            version: 0,
            cached_order: None,
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.indices.len()
    }

    pub fn n_edges(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_name(&self, node: NodeId) -> &str {
        &self.names[node]
    }

    pub fn node_names(&self) -> &[String] {
        &self.names
    }

    /// Monotonic counter bumped by every structural mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    fn check_node(&self, node: NodeId) -> Result<NodeIndex, GraphError> {
        self.indices
            .get(node)
            .copied()
            .ok_or(GraphError::NodeOutOfRange {
                node,
                n_nodes: self.n_nodes(),
            })
    }

    /// Whether inserting `parent -> child` would create a cycle: true
    /// when `parent` is already reachable from `child`.
    pub fn would_create_cycle(&self, parent: NodeId, child: NodeId) -> bool {
        if parent == child {
            return true;
        }
        let (Some(&from), Some(&to)) = (self.indices.get(child), self.indices.get(parent)) else {
            return false;
        };
        let mut dfs = Dfs::new(&self.graph, from);
        while let Some(ix) = dfs.next(&self.graph) {
            if ix == to {
                return true;
            }
        }
        false
    }

    /// Insert `parent -> child`, rejecting self-loops, duplicates, and
    /// cycle-creating edges.
    pub fn add_edge(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        let p_ix = self.check_node(parent)?;
        let c_ix = self.check_node(child)?;
        if parent == child {
            return Err(GraphError::SelfLoop { node: parent });
        }
        if self.graph.find_edge(p_ix, c_ix).is_some() {
            return Err(GraphError::DuplicateEdge { parent, child });
        }
        if self.would_create_cycle(parent, child) {
            return Err(GraphError::CycleDetected { parent, child });
        }
        self.graph.add_edge(p_ix, c_ix, ());
        self.bump();
        Ok(())
    }

    /// Remove `parent -> child` if present. Returns whether an edge was
    /// actually removed.
    pub fn remove_edge(&mut self, parent: NodeId, child: NodeId) -> bool {
        let (Some(&p_ix), Some(&c_ix)) = (self.indices.get(parent), self.indices.get(child))
        else {
            return false;
        };
        match self.graph.find_edge(p_ix, c_ix) {
            Some(edge) => {
                self.graph.remove_edge(edge);
                self.bump();
                true
            }
            None => false,
        }
    }

    pub fn has_edge(&self, parent: NodeId, child: NodeId) -> bool {
        match (self.indices.get(parent), self.indices.get(child)) {
            (Some(&p), Some(&c)) => self.graph.find_edge(p, c).is_some(),
            _ => false,
        }
    }

    /// Parents of `node`, ascending.
    pub fn parents_of(&self, node: NodeId) -> Vec<NodeId> {
        let Some(&ix) = self.indices.get(node) else {
            return Vec::new();
        };
        let mut parents: Vec<NodeId> = self
            .graph
            .neighbors_directed(ix, petgraph::Incoming)
            .map(|p| self.graph[p])
            .collect();
        parents.sort_unstable();
        parents
    }

    /// Children of `node`, ascending.
    pub fn children_of(&self, node: NodeId) -> Vec<NodeId> {
        let Some(&ix) = self.indices.get(node) else {
            return Vec::new();
        };
        let mut children: Vec<NodeId> = self
            .graph
            .neighbors_directed(ix, petgraph::Outgoing)
            .map(|c| self.graph[c])
            .collect();
        children.sort_unstable();
        children
    }

    /// All edges `(parent, child)`, sorted ascending for stable output.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(p, c)| (self.graph[p], self.graph[c]))
            .collect();
        edges.sort_unstable();
        edges
    }

    /// A topological order of the nodes, recomputed lazily and cached
    /// until the next structural mutation.
    pub fn topological_order(&mut self) -> &[NodeId] {
        if self.cached_order.is_none() {
            // The insert-time cycle check guarantees toposort succeeds.
            let order = toposort(&self.graph, None)
                .map(|ixs| ixs.into_iter().map(|ix| self.graph[ix]).collect())
                .unwrap_or_else(|_| (0..self.n_nodes()).collect());
            self.cached_order = Some(order);
        }
        self.cached_order.as_deref().unwrap_or(&[])
    }

    /// True when the adjacency contains no cycle. Held by construction;
    /// exposed so tests can assert it directly.
    pub fn is_acyclic(&self) -> bool {
        toposort(&self.graph, None).is_ok()
    }

    fn bump(&mut self) {
        self.version += 1;
        self.cached_order = None;
    }
}

impl PartialEq for Dag {
    /// Structural equality: same node count and same edge set.
    fn eq(&self, other: &Self) -> bool {
        self.n_nodes() == other.n_nodes() && self.edges() == other.edges()
    }
}

impl Eq for Dag {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_cycle_and_self_loop() {
        let mut dag = Dag::new(3);
        dag.add_edge(0, 1).unwrap();
        dag.add_edge(1, 2).unwrap();

        assert!(matches!(
            dag.add_edge(2, 0),
            Err(GraphError::CycleDetected { parent: 2, child: 0 })
        ));
        assert!(matches!(
            dag.add_edge(1, 1),
            Err(GraphError::SelfLoop { node: 1 })
        ));
        assert!(matches!(
            dag.add_edge(0, 1),
            Err(GraphError::DuplicateEdge { .. })
        ));
        assert_eq!(dag.n_edges(), 2);
    }

    #[test]
    fn remove_is_always_safe() {
        let mut dag = Dag::new(2);
        assert!(!dag.remove_edge(0, 1));
        dag.add_edge(0, 1).unwrap();
        assert!(dag.remove_edge(0, 1));
        assert_eq!(dag.n_edges(), 0);
        // Removing the blocking edge makes the reverse direction legal.
        dag.add_edge(1, 0).unwrap();
    }

    #[test]
    fn adjacency_queries() {
        let mut dag = Dag::new(4);
        dag.add_edge(2, 0).unwrap();
        dag.add_edge(1, 0).unwrap();
        dag.add_edge(0, 3).unwrap();

        assert_eq!(dag.parents_of(0), vec![1, 2]);
        assert_eq!(dag.children_of(0), vec![3]);
        assert_eq!(dag.edges(), vec![(0, 3), (1, 0), (2, 0)]);
    }

    #[test]
    fn version_bumps_and_order_cache_invalidates() {
        let mut dag = Dag::new(3);
        let v0 = dag.version();
        dag.add_edge(2, 1).unwrap();
        assert!(dag.version() > v0);

        let order = dag.topological_order().to_vec();
        let pos = |n: NodeId| order.iter().position(|&x| x == n).unwrap();
        assert!(pos(2) < pos(1));

        dag.add_edge(1, 0).unwrap();
        let order = dag.topological_order().to_vec();
        let pos = |n: NodeId| order.iter().position(|&x| x == n).unwrap();
        assert!(pos(2) < pos(1) && pos(1) < pos(0));
    }

    #[test]
    fn out_of_range_node_is_an_error() {
        let mut dag = Dag::new(2);
        assert!(matches!(
            dag.add_edge(0, 5),
            Err(GraphError::NodeOutOfRange { node: 5, .. })
        ));
    }

    #[test]
    fn structural_equality_ignores_insertion_order() {
        let mut a = Dag::new(3);
        a.add_edge(0, 1).unwrap();
        a.add_edge(1, 2).unwrap();

        let mut b = Dag::new(3);
        b.add_edge(1, 2).unwrap();
        b.add_edge(0, 1).unwrap();

        assert_eq!(a, b);
    }
}
