//! # causal-gen
//!
//! Synthetic data with known ground truth: a seeded random DAG, linear
//! mechanisms with Gaussian noise, and a contextual variant where one
//! context breaks a single edge's mechanism. Everything is
//! deterministic given the seed, so tests and benchmarks can pin exact
//! scenarios.

use std::collections::HashMap;

use causal_core::{Dag, Dataset, Edge, Matrix, NodeId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Probability of drawing each forward edge of the generating order.
const EDGE_PROB: f64 = 0.4;
/// Cap on parents per node in the generated graph.
const MAX_PARENTS: usize = 3;
/// Mechanism weight magnitudes, kept well away from zero so edges are
/// detectable at moderate sample sizes.
const WEIGHT_RANGE: (f64, f64) = (0.7, 1.5);

/// Ground truth accompanying a generated dataset.
#[derive(Debug, Clone)]
pub struct Truths {
    /// The generating DAG.
    pub true_g: Dag,
    /// Mechanism weight per edge.
    pub weights: HashMap<Edge, f64>,
    /// The edge whose mechanism differs in `broken_context`, if any.
    pub broken_edge: Option<Edge>,
    /// The context index carrying the structural break, if any.
    pub broken_context: Option<usize>,
}

/// Generate a continuous-mode example: one matrix, one truth DAG.
pub fn gen_example_continuous(n_nodes: usize, n_samples: usize, seed: u64) -> (Dataset, Truths) {
    let mut rng = StdRng::seed_from_u64(seed);
    let (dag, order) = random_dag(n_nodes, &mut rng);
    let weights = random_weights(&dag, &mut rng);

    let matrix = sample_matrix(&order, &weights, n_nodes, n_samples, &mut rng);
    (
        Dataset::continuous(matrix),
        Truths {
            true_g: dag,
            weights,
            broken_edge: None,
            broken_context: None,
        },
    )
}

/// Generate a contexts-mode example: `n_contexts` matrices sharing one
/// truth DAG, with the final context flipping the sign of one edge's
/// weight (a single-edge mechanism change).
pub fn gen_example_context(
    n_nodes: usize,
    n_contexts: usize,
    n_samples: usize,
    seed: u64,
) -> (Dataset, Truths) {
    assert!(n_contexts >= 2, "contexts mode needs at least two contexts");
    let mut rng = StdRng::seed_from_u64(seed);
    let (dag, order) = random_dag(n_nodes, &mut rng);
    let weights = random_weights(&dag, &mut rng);

    // Break the first edge (sorted order) in the last context.
    let broken_edge = dag.edges().first().copied();
    let broken_context = n_contexts - 1;

    let mut matrices = Vec::with_capacity(n_contexts);
    for ctx in 0..n_contexts {
        let ctx_weights = if ctx == broken_context {
            let mut w = weights.clone();
            if let Some(edge) = broken_edge {
                if let Some(v) = w.get_mut(&edge) {
                    *v = -*v;
                }
            }
            w
        } else {
            weights.clone()
        };
        matrices.push(sample_matrix(&order, &ctx_weights, n_nodes, n_samples, &mut rng));
    }

    (
        Dataset::contexts(matrices),
        Truths {
            true_g: dag,
            weights,
            broken_edge,
            broken_context: Some(broken_context),
        },
    )
}

/// Random DAG over a shuffled ordering. Returns the graph and the
/// generating topological order.
fn random_dag(n_nodes: usize, rng: &mut StdRng) -> (Dag, Vec<NodeId>) {
    use rand::seq::SliceRandom;

    let mut order: Vec<NodeId> = (0..n_nodes).collect();
    order.shuffle(rng);

    let mut dag = Dag::new(n_nodes);
    for j in 1..n_nodes {
        for i in 0..j {
            if dag.parents_of(order[j]).len() >= MAX_PARENTS {
                break;
            }
            if rng.gen_bool(EDGE_PROB) {
                // Forward edges of the order can never cycle.
                dag.add_edge(order[i], order[j])
                    .expect("forward edge of a topological order is acyclic");
            }
        }
    }
    // Degenerate draw with no edges: force one so the truth is nontrivial.
    if dag.n_edges() == 0 && n_nodes >= 2 {
        dag.add_edge(order[0], order[1])
            .expect("forward edge of a topological order is acyclic");
    }
    (dag, order)
}

fn random_weights(dag: &Dag, rng: &mut StdRng) -> HashMap<Edge, f64> {
    dag.edges()
        .into_iter()
        .map(|edge| {
            let magnitude = rng.gen_range(WEIGHT_RANGE.0..WEIGHT_RANGE.1);
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            (edge, sign * magnitude)
        })
        .collect()
}

/// Sample `n_samples` rows: each node is the weighted sum of its
/// parents plus unit Gaussian noise, evaluated in topological order.
/// Parent terms are summed in sorted order so output is bit-stable.
fn sample_matrix(
    order: &[NodeId],
    weights: &HashMap<Edge, f64>,
    n_nodes: usize,
    n_samples: usize,
    rng: &mut StdRng,
) -> Matrix {
    let mut mechanisms: Vec<Vec<(NodeId, f64)>> = vec![Vec::new(); n_nodes];
    let mut edges: Vec<(&Edge, &f64)> = weights.iter().collect();
    edges.sort_by_key(|(edge, _)| **edge);
    for (&(parent, child), &w) in edges {
        mechanisms[child].push((parent, w));
    }

    let noise = Normal::new(0.0, 1.0).expect("unit normal is well-formed");
    let mut rows = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let mut values = vec![0.0; n_nodes];
        for &node in order {
            let mut v: f64 = noise.sample(rng);
            for &(parent, w) in &mechanisms[node] {
                v += w * values[parent];
            }
            values[node] = v;
        }
        rows.push(values);
    }
    Matrix::from_rows(rows)
}
