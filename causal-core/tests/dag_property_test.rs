//! Property tests for the DAG invariants: whatever edge sequence is
//! thrown at it, the graph stays acyclic and self-consistent.

use proptest::prelude::*;

use causal_core::Dag;

fn edge_strategy(n: usize) -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0..n, 0..n), 0..n * 3)
}

proptest! {
    #[test]
    fn random_insertions_never_create_cycles(edges in edge_strategy(12)) {
        let mut dag = Dag::new(12);
        for (p, c) in edges {
            // Rejected insertions are fine; accepted ones must keep the
            // graph acyclic.
            let _ = dag.add_edge(p, c);
        }
        prop_assert!(dag.is_acyclic());
    }

    #[test]
    fn topological_order_respects_all_edges(edges in edge_strategy(10)) {
        let mut dag = Dag::new(10);
        for (p, c) in edges {
            let _ = dag.add_edge(p, c);
        }
        let order = dag.topological_order().to_vec();
        prop_assert_eq!(order.len(), 10);
        let pos: Vec<usize> = {
            let mut pos = vec![0; 10];
            for (i, &n) in order.iter().enumerate() {
                pos[n] = i;
            }
            pos
        };
        for (p, c) in dag.edges() {
            prop_assert!(pos[p] < pos[c], "parent {} after child {}", p, c);
        }
    }

    #[test]
    fn add_then_remove_is_identity(edges in edge_strategy(8)) {
        let mut dag = Dag::new(8);
        let mut accepted = Vec::new();
        for (p, c) in edges {
            if dag.add_edge(p, c).is_ok() {
                accepted.push((p, c));
            }
        }
        for (p, c) in accepted {
            assert!(dag.remove_edge(p, c));
        }
        prop_assert_eq!(dag.n_edges(), 0);
    }
}
