//! # causal-search
//!
//! Strategies exploring the space of DAGs (or topological orderings)
//! for a high-scoring structure. Strategies consume the combined-score
//! view from `causal-context`, so they are context-agnostic; both
//! guarantee an acyclic result and respect the evaluation budget.

pub mod budget;
pub mod greedy_search;
pub mod order_search;

pub use budget::EvalBudget;
pub use greedy_search::GreedySearch;
pub use order_search::OrderSearch;

use causal_context::ContextScore;
use causal_core::{Dag, FitError};

/// Minimal strict-improvement margin. Candidates tying within this keep
/// the incumbent, which is what makes tie-breaking deterministic:
/// the incumbent has no more edges, and candidates are enumerated in
/// ascending node order so the lexicographically smallest edge set wins
/// among equal improvements.
pub(crate) const IMPROVEMENT_EPS: f64 = 1e-9;

/// Result of one search run.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Best structure found; always acyclic.
    pub dag: Dag,
    /// Aggregate score of `dag`: the sum of combined scores over the
    /// nodes the search evaluated before any budget cutoff.
    pub score: f64,
    /// Candidate evaluations actually performed.
    pub evaluations: usize,
    /// Whether the budget cut the search short.
    pub budget_exhausted: bool,
}

/// The search capability selected by configuration.
pub trait SearchStrategy {
    fn run(
        &self,
        score: &dyn ContextScore,
        n_nodes: usize,
        budget: &mut EvalBudget,
    ) -> Result<SearchOutcome, FitError>;
}
