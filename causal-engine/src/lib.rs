//! # causal-engine
//!
//! The fitting façade. [`CausalChange`] owns a [`CausalConfig`], and
//! `fit()` runs the whole pipeline: validate the input shape, build the
//! score function, wrap it for the data mode, run the configured search
//! under the evaluation budget, and hand back the estimated DAG.
//!
//! ```no_run
//! use causal_core::{CausalConfig, Dataset, Matrix};
//! use causal_engine::CausalChange;
//!
//! let data = Dataset::continuous(Matrix::from_rows(vec![
//!     vec![0.1, 0.2],
//!     vec![0.3, 0.1],
//!     vec![0.5, 0.4],
//!     vec![0.2, 0.6],
//! ]));
//! let mut cc = CausalChange::new(CausalConfig::default());
//! let g_hat = cc.fit(&data).unwrap();
//! println!("{} edges", g_hat.n_edges());
//! ```

pub mod export;

use std::sync::Arc;

use causal_context::{ContextAggregator, ContextScore, Disagreement, SingleContext};
use causal_core::{
    CausalConfig, Dag, DataMode, Dataset, FitError, GraphSearch, Matrix, ScoreType,
};
use causal_score::{BaselineScore, ScoreFunction, SplineScore};
use causal_search::{EvalBudget, GreedySearch, OrderSearch, SearchOutcome, SearchStrategy};
use tracing::{debug, info, warn};

/// Lifecycle of a fit. One `CausalChange` can fit repeatedly; each call
/// moves through `Running` and ends in `Done` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitState {
    #[default]
    Configured,
    Running,
    Done,
    Failed,
}

/// Estimates a causal DAG from observational data.
pub struct CausalChange {
    config: CausalConfig,
    state: FitState,
    last_outcome: Option<SearchOutcome>,
    last_disagreements: Vec<Disagreement>,
}

impl CausalChange {
    pub fn new(config: CausalConfig) -> Self {
        Self {
            config,
            state: FitState::Configured,
            last_outcome: None,
            last_disagreements: Vec::new(),
        }
    }

    pub fn config(&self) -> &CausalConfig {
        &self.config
    }

    pub fn state(&self) -> FitState {
        self.state
    }

    /// Outcome of the most recent successful fit.
    pub fn outcome(&self) -> Option<&SearchOutcome> {
        self.last_outcome.as_ref()
    }

    /// Mechanism-change flags recorded during the most recent
    /// contexts-mode fit, sorted. Empty for continuous fits.
    pub fn disagreements(&self) -> &[Disagreement] {
        &self.last_disagreements
    }

    /// Fit a causal structure to `data` under the current configuration.
    ///
    /// Validation runs before any scoring, so a shape or mode mismatch
    /// never costs budget. The returned DAG is always acyclic, and the
    /// whole run is deterministic given the configured seed.
    pub fn fit(&mut self, data: &Dataset) -> Result<Dag, FitError> {
        let n_nodes = match validate(&self.config, data) {
            Ok(n) => n,
            Err(err) => {
                warn!(%err, "input rejected");
                self.state = FitState::Failed;
                return Err(err);
            }
        };
        self.state = FitState::Running;
        self.last_outcome = None;
        self.last_disagreements.clear();

        if self.config.verbosity >= 2 {
            info!(
                score = ?self.config.score_type,
                search = ?self.config.graph_search,
                mode = ?self.config.data_mode,
                seed = self.config.seed,
                n_nodes,
                n_contexts = data.n_contexts(),
                "starting fit"
            );
        }

        match self.run_search(data, n_nodes) {
            Ok(outcome) => {
                if self.config.verbosity >= 1 {
                    info!(
                        n_edges = outcome.dag.n_edges(),
                        score = outcome.score,
                        evaluations = outcome.evaluations,
                        "fit complete"
                    );
                    if outcome.budget_exhausted {
                        info!(
                            budget = self.config.eval_budget,
                            "evaluation budget reached; returning best structure found"
                        );
                    }
                }
                let dag = outcome.dag.clone();
                self.last_outcome = Some(outcome);
                self.state = FitState::Done;
                Ok(dag)
            }
            Err(err) => {
                warn!(%err, "fit failed");
                self.state = FitState::Failed;
                Err(err)
            }
        }
    }

    fn run_search(&mut self, data: &Dataset, n_nodes: usize) -> Result<SearchOutcome, FitError> {
        let matrices = data.matrices();
        let score = self.build_score(matrices.clone());
        score.clear_cache();

        let strategy: Box<dyn SearchStrategy> = match self.config.graph_search {
            GraphSearch::Topic => {
                Box::new(OrderSearch::new(self.config.seed, self.config.max_parents))
            }
            GraphSearch::Greedy => Box::new(GreedySearch::new(self.config.max_parents)),
        };
        let mut budget = EvalBudget::new(self.config.eval_budget);

        let outcome = match self.config.data_mode {
            DataMode::Continuous => {
                let combined = SingleContext::new(score);
                strategy.run(&combined, n_nodes, &mut budget)?
            }
            DataMode::Contexts => {
                let counts: Vec<usize> = matrices.iter().map(|m| m.n_rows()).collect();
                let aggregator = ContextAggregator::new(
                    score,
                    &counts,
                    self.config.min_context_samples,
                    self.config.disagreement_tolerance,
                    self.config.disagreement_penalty,
                );
                let outcome = strategy.run(&aggregator, n_nodes, &mut budget)?;
                self.last_disagreements = aggregator.disagreements();
                if self.config.verbosity >= 1 && !self.last_disagreements.is_empty() {
                    for d in &self.last_disagreements {
                        debug!(
                            node = d.node,
                            parent = d.parent,
                            ctx = d.ctx,
                            "mechanism change flagged"
                        );
                    }
                }
                outcome
            }
        };
        Ok(outcome)
    }

    fn build_score(&self, matrices: Vec<Arc<Matrix>>) -> Arc<dyn ScoreFunction> {
        match self.config.score_type {
            ScoreType::Baseline => Arc::new(BaselineScore::new(matrices)),
            ScoreType::Spline => Arc::new(SplineScore::new(matrices)),
        }
    }
}

/// Checks data mode and shape consistency, returning the node count.
fn validate(config: &CausalConfig, data: &Dataset) -> Result<usize, FitError> {
    match (config.data_mode, data) {
        (DataMode::Continuous, Dataset::Contexts(_)) => {
            return Err(FitError::DataModeMismatch {
                expected_mode: "continuous",
                found_mode: "contexts",
            });
        }
        (DataMode::Contexts, Dataset::Continuous(_)) => {
            return Err(FitError::DataModeMismatch {
                expected_mode: "contexts",
                found_mode: "continuous",
            });
        }
        _ => {}
    }

    let matrices = data.matrices();
    let expected = match matrices.first() {
        Some(m) if m.n_cols() > 0 => m.n_cols(),
        _ => return Err(FitError::EmptyDataset),
    };
    for (context, m) in matrices.iter().enumerate() {
        if m.n_cols() != expected {
            return Err(FitError::ShapeMismatch {
                context,
                expected,
                found: m.n_cols(),
            });
        }
    }
    Ok(expected)
}
