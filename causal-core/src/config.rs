//! Fit configuration. Immutable once a fit starts: the façade reads it
//! at `fit()` entry to instantiate the score function, aggregator, and
//! search strategy, and never consults ambient state.

use serde::{Deserialize, Serialize};

/// Default values for [`CausalConfig`].
pub mod defaults {
    /// Maximum parents considered per node during search.
    pub const DEFAULT_MAX_PARENTS: usize = 3;
    /// Maximum candidate (node, parent-set) evaluations per fit.
    pub const DEFAULT_EVAL_BUDGET: usize = 10_000;
    /// Contexts with fewer rows than this are excluded from aggregation.
    pub const DEFAULT_MIN_CONTEXT_SAMPLES: usize = 10;
    /// Relative deviation of a per-context effect from the pooled mean
    /// beyond which the context counts as disagreeing on that parent.
    pub const DEFAULT_DISAGREEMENT_TOLERANCE: f64 = 0.5;
    /// Scale of the per-disagreement penalty subtracted from the
    /// combined score.
    pub const DEFAULT_DISAGREEMENT_PENALTY: f64 = 1.0;
}

/// Which local score is fitted per (node, parent-set) candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoreType {
    /// Penalized least squares with a linear-Gaussian fit.
    #[default]
    Baseline,
    /// Additive spline regression for nonlinear mechanisms.
    Spline,
}

/// Which strategy explores the structure space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GraphSearch {
    /// Topological-order search with adjacent-transposition moves.
    #[default]
    Topic,
    /// Greedy single-edge addition/deletion/reversal hill climbing.
    Greedy,
}

/// Shape of the input data the fit expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataMode {
    /// One observation matrix.
    #[default]
    Continuous,
    /// One matrix per context (environment / intervention regime).
    Contexts,
}

/// Configuration for one causal-structure fit.
///
/// `Default` yields the continuous/baseline/order-search configuration,
/// so a zero-argument construction is always valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CausalConfig {
    /// Local score variant.
    pub score_type: ScoreType,
    /// Search strategy variant.
    pub graph_search: GraphSearch,
    /// Expected input shape.
    pub data_mode: DataMode,
    /// Diagnostic output volume (0 = quiet, higher = chattier).
    pub verbosity: u8,
    /// Seed for the order initialization; fits are deterministic given it.
    pub seed: u64,
    /// Maximum parents per node considered during search.
    pub max_parents: usize,
    /// Maximum candidate evaluations before search returns best-so-far.
    pub eval_budget: usize,
    /// Minimum rows for a context to participate in aggregation.
    pub min_context_samples: usize,
    /// Relative tolerance for per-context effect disagreement.
    pub disagreement_tolerance: f64,
    /// Scale of the disagreement penalty in the combined score.
    pub disagreement_penalty: f64,
}

impl Default for CausalConfig {
    fn default() -> Self {
        Self {
            score_type: ScoreType::default(),
            graph_search: GraphSearch::default(),
            data_mode: DataMode::default(),
            verbosity: 0,
            seed: 0,
            max_parents: defaults::DEFAULT_MAX_PARENTS,
            eval_budget: defaults::DEFAULT_EVAL_BUDGET,
            min_context_samples: defaults::DEFAULT_MIN_CONTEXT_SAMPLES,
            disagreement_tolerance: defaults::DEFAULT_DISAGREEMENT_TOLERANCE,
            disagreement_penalty: defaults::DEFAULT_DISAGREEMENT_PENALTY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_continuous_baseline() {
        let config = CausalConfig::default();
        assert_eq!(config.score_type, ScoreType::Baseline);
        assert_eq!(config.graph_search, GraphSearch::Topic);
        assert_eq!(config.data_mode, DataMode::Continuous);
        assert_eq!(config.verbosity, 0);
    }

    #[test]
    fn serde_round_trip() {
        let config = CausalConfig {
            score_type: ScoreType::Spline,
            data_mode: DataMode::Contexts,
            verbosity: 4,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: CausalConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.score_type, ScoreType::Spline);
        assert_eq!(back.data_mode, DataMode::Contexts);
        assert_eq!(back.verbosity, 4);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: CausalConfig = serde_json::from_str(r#"{"score_type":"spline"}"#).unwrap();
        assert_eq!(config.score_type, ScoreType::Spline);
        assert_eq!(config.eval_budget, defaults::DEFAULT_EVAL_BUDGET);
    }
}
