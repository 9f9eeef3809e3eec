//! Order-based search: maintain a candidate topological ordering, pick
//! each node's parents greedily from its predecessors, and hill-climb
//! over adjacent transpositions of the ordering. The final DAG is
//! acyclic by construction (every parent precedes its child).

use causal_context::ContextScore;
use causal_core::{Dag, FitError, NodeId};
use causal_score::ParentSet;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::{EvalBudget, SearchOutcome, SearchStrategy, IMPROVEMENT_EPS};

/// Topological-order search, deterministic given the seed.
pub struct OrderSearch {
    seed: u64,
    max_parents: usize,
}

impl OrderSearch {
    pub fn new(seed: u64, max_parents: usize) -> Self {
        Self { seed, max_parents }
    }
}

/// Chosen parents and score for one node under the current ordering.
#[derive(Debug, Clone)]
struct Selection {
    parents: ParentSet,
    score: f64,
}

/// Greedy forward selection of parents for `node` among `candidates`.
///
/// Returns `None` when the budget is exhausted before the mandatory
/// empty-set evaluation. Mid-selection exhaustion returns the best
/// selection reached so far, which is always valid.
fn select_parents(
    score: &dyn ContextScore,
    node: NodeId,
    candidates: &[NodeId],
    max_parents: usize,
    budget: &mut EvalBudget,
) -> Result<Option<Selection>, FitError> {
    if !budget.charge() {
        return Ok(None);
    }
    // The marginal fit must be scorable; in contexts mode the aggregator
    // already absorbed per-context insufficiency before this surfaces.
    let base = score.combined_score(node, &ParentSet::empty())?;
    let mut current = Selection {
        parents: ParentSet::empty(),
        score: base,
    };

    while current.parents.len() < max_parents && !budget.exhausted() {
        // Best strictly-improving extension; ascending enumeration keeps
        // the smallest node on ties.
        let mut best: Option<(NodeId, f64)> = None;
        for &cand in candidates {
            if current.parents.contains(cand) {
                continue;
            }
            if !budget.charge() {
                break;
            }
            match score.combined_score(node, &current.parents.with(cand)) {
                Ok(s) if s > current.score + IMPROVEMENT_EPS => {
                    if best.map_or(true, |(_, bs)| s > bs) {
                        best = Some((cand, s));
                    }
                }
                Ok(_) => {}
                Err(err) if err.is_recoverable() => {
                    debug!(node, cand, %err, "candidate parent skipped");
                }
                Err(err) => return Err(err.into()),
            }
        }
        match best {
            Some((cand, s)) => {
                current = Selection {
                    parents: current.parents.with(cand),
                    score: s,
                };
            }
            None => break,
        }
    }
    Ok(Some(current))
}

impl SearchStrategy for OrderSearch {
    fn run(
        &self,
        score: &dyn ContextScore,
        n_nodes: usize,
        budget: &mut EvalBudget,
    ) -> Result<SearchOutcome, FitError> {
        let mut order: Vec<NodeId> = (0..n_nodes).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        order.shuffle(&mut rng);

        // Initial parent assignment along the starting order.
        let mut selections: Vec<Selection> = (0..n_nodes)
            .map(|_| Selection {
                parents: ParentSet::empty(),
                score: 0.0,
            })
            .collect();
        let mut scored = vec![false; n_nodes];
        for i in 0..n_nodes {
            let node = order[i];
            let mut preds = order[..i].to_vec();
            preds.sort_unstable();
            match select_parents(score, node, &preds, self.max_parents, budget)? {
                Some(sel) => {
                    selections[node] = sel;
                    scored[node] = true;
                }
                // Budget died before this node was ever scored; the
                // remaining nodes keep empty parents, which is valid.
                None => return finish(order, selections, &scored, budget, true),
            }
        }

        // Adjacent-transposition hill climbing. Only the two swapped
        // nodes see a different predecessor set, so only they reselect.
        let mut improved = true;
        while improved && !budget.exhausted() {
            improved = false;
            for i in 0..n_nodes.saturating_sub(1) {
                if budget.exhausted() {
                    break;
                }
                let (a, b) = (order[i], order[i + 1]);

                let mut preds_b = order[..i].to_vec();
                preds_b.sort_unstable();
                let mut preds_a = order[..i].to_vec();
                preds_a.push(b);
                preds_a.sort_unstable();

                let Some(new_b) = select_parents(score, b, &preds_b, self.max_parents, budget)?
                else {
                    break;
                };
                let Some(new_a) = select_parents(score, a, &preds_a, self.max_parents, budget)?
                else {
                    break;
                };

                let old_total = selections[a].score + selections[b].score;
                let new_total = new_a.score + new_b.score;
                if new_total > old_total + IMPROVEMENT_EPS {
                    debug!(
                        pos = i,
                        left = b,
                        right = a,
                        gain = new_total - old_total,
                        "order swap accepted"
                    );
                    order.swap(i, i + 1);
                    selections[a] = new_a;
                    selections[b] = new_b;
                    improved = true;
                }
            }
        }

        finish(order, selections, &scored, budget, budget.exhausted())
    }
}

/// Materialize the chosen parent sets into a DAG and close the run.
/// Nodes the budget never reached hold placeholder selections, so only
/// scored nodes contribute to the reported total.
fn finish(
    order: Vec<NodeId>,
    selections: Vec<Selection>,
    scored: &[bool],
    budget: &EvalBudget,
    budget_exhausted: bool,
) -> Result<SearchOutcome, FitError> {
    let n_nodes = order.len();
    let mut dag = Dag::new(n_nodes);
    for (node, sel) in selections.iter().enumerate() {
        for &parent in sel.parents.as_slice() {
            dag.add_edge(parent, node).map_err(|err| FitError::Internal {
                details: format!("order search proposed an illegal edge: {err}"),
            })?;
        }
    }
    let total: f64 = selections
        .iter()
        .zip(scored)
        .filter(|(_, &was_scored)| was_scored)
        .map(|(s, _)| s.score)
        .sum();
    info!(
        n_edges = dag.n_edges(),
        score = total,
        evaluations = budget.used(),
        budget_exhausted,
        "order search finished"
    );
    Ok(SearchOutcome {
        dag,
        score: total,
        evaluations: budget.used(),
        budget_exhausted,
    })
}
