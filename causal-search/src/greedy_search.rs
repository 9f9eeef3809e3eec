//! Greedy structural search: start empty, repeatedly apply the single
//! best strictly-improving edge move. Deletions are scanned before
//! reversals before additions, so among equal improvements the move
//! producing fewer edges wins, and within a category the ascending
//! `(parent, child)` scan keeps the lexicographically smallest edge.

use causal_context::ContextScore;
use causal_core::{Dag, FitError, NodeId};
use causal_score::ParentSet;
use tracing::{debug, info};

use crate::{EvalBudget, SearchOutcome, SearchStrategy, IMPROVEMENT_EPS};

/// Hill climbing over single-edge additions, deletions, and reversals.
pub struct GreedySearch {
    max_parents: usize,
}

impl GreedySearch {
    pub fn new(max_parents: usize) -> Self {
        Self { max_parents }
    }
}

#[derive(Debug, Clone, Copy)]
enum Move {
    Delete {
        parent: NodeId,
        child: NodeId,
        new_child_score: f64,
    },
    Reverse {
        parent: NodeId,
        child: NodeId,
        new_child_score: f64,
        new_parent_score: f64,
    },
    Add {
        parent: NodeId,
        child: NodeId,
        new_child_score: f64,
    },
}

impl SearchStrategy for GreedySearch {
    fn run(
        &self,
        score: &dyn ContextScore,
        n_nodes: usize,
        budget: &mut EvalBudget,
    ) -> Result<SearchOutcome, FitError> {
        let mut dag = Dag::new(n_nodes);
        let mut node_scores = vec![0.0; n_nodes];

        // Marginal fit per node; the empty graph is the starting point.
        for node in 0..n_nodes {
            if !budget.charge() {
                return Ok(close(dag, &node_scores, budget, true));
            }
            node_scores[node] = score.combined_score(node, &ParentSet::empty())?;
        }

        loop {
            let mut best: Option<(f64, Move)> = None;
            let mut ran_dry = false;

            // Candidate scoring for a child under a hypothetical set.
            // Insufficient data disqualifies the move, nothing more.
            macro_rules! try_score {
                ($child:expr, $parents:expr) => {
                    match score.combined_score($child, &$parents) {
                        Ok(s) => Some(s),
                        Err(err) if err.is_recoverable() => {
                            debug!(child = $child, %err, "move skipped");
                            None
                        }
                        Err(err) => return Err(err.into()),
                    }
                };
            }

            // Deletions.
            for (parent, child) in dag.edges() {
                if !budget.charge() {
                    ran_dry = true;
                    break;
                }
                let parents = ParentSet::new(dag.parents_of(child)).without(parent);
                if let Some(s) = try_score!(child, parents) {
                    let delta = s - node_scores[child];
                    if delta > IMPROVEMENT_EPS && best.map_or(true, |(d, _)| delta > d) {
                        best = Some((
                            delta,
                            Move::Delete {
                                parent,
                                child,
                                new_child_score: s,
                            },
                        ));
                    }
                }
            }

            // Reversals. Legal when the reversed edge cannot close a
            // cycle once the original edge is gone.
            if !ran_dry {
                for (parent, child) in dag.edges() {
                    if budget.exhausted() {
                        ran_dry = true;
                        break;
                    }
                    if dag.parents_of(parent).len() >= self.max_parents {
                        continue;
                    }
                    dag.remove_edge(parent, child);
                    let legal = !dag.would_create_cycle(child, parent);
                    dag.add_edge(parent, child).map_err(|err| FitError::Internal {
                        details: format!("failed to restore probed edge: {err}"),
                    })?;
                    if !legal {
                        continue;
                    }

                    if !budget.charge() {
                        ran_dry = true;
                        break;
                    }
                    let child_parents = ParentSet::new(dag.parents_of(child)).without(parent);
                    let Some(new_child) = try_score!(child, child_parents) else {
                        continue;
                    };
                    if !budget.charge() {
                        ran_dry = true;
                        break;
                    }
                    let parent_parents = ParentSet::new(dag.parents_of(parent)).with(child);
                    let Some(new_parent) = try_score!(parent, parent_parents) else {
                        continue;
                    };

                    let delta = new_child + new_parent
                        - node_scores[child]
                        - node_scores[parent];
                    if delta > IMPROVEMENT_EPS && best.map_or(true, |(d, _)| delta > d) {
                        best = Some((
                            delta,
                            Move::Reverse {
                                parent,
                                child,
                                new_child_score: new_child,
                                new_parent_score: new_parent,
                            },
                        ));
                    }
                }
            }

            // Additions.
            if !ran_dry {
                'adds: for parent in 0..n_nodes {
                    for child in 0..n_nodes {
                        if parent == child
                            || dag.has_edge(parent, child)
                            || dag.parents_of(child).len() >= self.max_parents
                            || dag.would_create_cycle(parent, child)
                        {
                            continue;
                        }
                        if !budget.charge() {
                            ran_dry = true;
                            break 'adds;
                        }
                        let parents = ParentSet::new(dag.parents_of(child)).with(parent);
                        if let Some(s) = try_score!(child, parents) {
                            let delta = s - node_scores[child];
                            if delta > IMPROVEMENT_EPS && best.map_or(true, |(d, _)| delta > d) {
                                best = Some((
                                    delta,
                                    Move::Add {
                                        parent,
                                        child,
                                        new_child_score: s,
                                    },
                                ));
                            }
                        }
                    }
                }
            }

            if ran_dry {
                // Budget cut the scan short; current graph is best-so-far.
                return Ok(close(dag, &node_scores, budget, true));
            }

            match best {
                Some((delta, mv)) => {
                    debug!(?mv, delta, "applying move");
                    apply(&mut dag, &mut node_scores, mv)?;
                }
                None => break,
            }
        }

        Ok(close(dag, &node_scores, budget, budget.exhausted()))
    }
}

fn apply(dag: &mut Dag, node_scores: &mut [f64], mv: Move) -> Result<(), FitError> {
    match mv {
        Move::Delete {
            parent,
            child,
            new_child_score,
        } => {
            dag.remove_edge(parent, child);
            node_scores[child] = new_child_score;
        }
        Move::Reverse {
            parent,
            child,
            new_child_score,
            new_parent_score,
        } => {
            dag.remove_edge(parent, child);
            dag.add_edge(child, parent).map_err(|err| FitError::Internal {
                details: format!("greedy search proposed an illegal reversal: {err}"),
            })?;
            node_scores[child] = new_child_score;
            node_scores[parent] = new_parent_score;
        }
        Move::Add {
            parent,
            child,
            new_child_score,
        } => {
            dag.add_edge(parent, child).map_err(|err| FitError::Internal {
                details: format!("greedy search proposed an illegal addition: {err}"),
            })?;
            node_scores[child] = new_child_score;
        }
    }
    Ok(())
}

fn close(dag: Dag, node_scores: &[f64], budget: &EvalBudget, budget_exhausted: bool) -> SearchOutcome {
    let total: f64 = node_scores.iter().sum();
    info!(
        n_edges = dag.n_edges(),
        score = total,
        evaluations = budget.used(),
        budget_exhausted,
        "greedy search finished"
    );
    SearchOutcome {
        dag,
        score: total,
        evaluations: budget.used(),
        budget_exhausted,
    }
}
