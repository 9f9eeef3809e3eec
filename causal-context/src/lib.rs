//! # causal-context
//!
//! Multi-context score aggregation. The search layer sees a single
//! combined score per candidate `(node, parent-set)`; this crate folds
//! per-context evidence into that number. Contexts count as independent
//! evidence (scores sum), and an explicit penalty charges candidates
//! whose per-parent effects disagree across contexts, so invariant
//! edges are favored and mechanism-change edges are flagged rather than
//! silently averaged away.

use std::sync::Arc;

use causal_core::{NodeId, ScoreError};
use causal_score::{ParentSet, ScoreFunction};
use dashmap::DashSet;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Absolute floor for the disagreement comparison baseline, so weak
/// pooled effects do not flag every context.
const EFFECT_FLOOR: f64 = 0.1;

/// The single-score view handed to search strategies: one combined
/// score per candidate, regardless of data mode.
pub trait ContextScore: Sync {
    fn combined_score(&self, node: NodeId, parents: &ParentSet) -> Result<f64, ScoreError>;
}

/// Continuous-mode adapter: one context, no aggregation.
pub struct SingleContext {
    score: Arc<dyn ScoreFunction>,
}

impl SingleContext {
    pub fn new(score: Arc<dyn ScoreFunction>) -> Self {
        Self { score }
    }
}

impl ContextScore for SingleContext {
    fn combined_score(&self, node: NodeId, parents: &ParentSet) -> Result<f64, ScoreError> {
        self.score.local_score(node, parents, None)
    }
}

/// A recorded mechanism-change flag: context `ctx` disagrees with the
/// pooled effect of `parent` on `node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Disagreement {
    pub node: NodeId,
    pub parent: NodeId,
    pub ctx: usize,
}

/// Sums per-context scores and subtracts a disagreement penalty.
///
/// Contexts below the configured minimum sample count are excluded up
/// front (warned, recorded, never fatal); a context that cannot score a
/// particular candidate is skipped for that candidate only.
pub struct ContextAggregator {
    score: Arc<dyn ScoreFunction>,
    /// Context indices participating in aggregation.
    usable: Vec<usize>,
    /// Context indices excluded for having too few samples.
    excluded: Vec<usize>,
    /// Total rows across usable contexts; scales the penalty.
    total_samples: usize,
    tolerance: f64,
    penalty_scale: f64,
    flagged: DashSet<Disagreement>,
}

impl ContextAggregator {
    /// `sample_counts[i]` is the row count of context `i`.
    pub fn new(
        score: Arc<dyn ScoreFunction>,
        sample_counts: &[usize],
        min_context_samples: usize,
        tolerance: f64,
        penalty_scale: f64,
    ) -> Self {
        let mut usable = Vec::new();
        let mut excluded = Vec::new();
        for (ctx, &n) in sample_counts.iter().enumerate() {
            if n < min_context_samples {
                warn!(
                    ctx,
                    n_samples = n,
                    min = min_context_samples,
                    "excluding context from aggregation"
                );
                excluded.push(ctx);
            } else {
                usable.push(ctx);
            }
        }
        let total_samples = usable.iter().map(|&c| sample_counts[c]).sum();
        Self {
            score,
            usable,
            excluded,
            total_samples,
            tolerance,
            penalty_scale,
            flagged: DashSet::new(),
        }
    }

    pub fn usable_contexts(&self) -> &[usize] {
        &self.usable
    }

    pub fn excluded_contexts(&self) -> &[usize] {
        &self.excluded
    }

    /// Snapshot of flagged mechanism-change edges, sorted.
    pub fn disagreements(&self) -> Vec<Disagreement> {
        let mut all: Vec<Disagreement> = self.flagged.iter().map(|d| *d).collect();
        all.sort_unstable();
        all
    }

    /// Count of contexts disagreeing with the pooled per-parent effects,
    /// recording each flag. `effects[k]` aligns with `self.usable`
    /// filtered to the contexts that scored (`ctxs`).
    fn count_disagreements(
        &self,
        node: NodeId,
        parents: &ParentSet,
        ctxs: &[usize],
        effects: &[Vec<f64>],
    ) -> usize {
        if effects.len() < 2 {
            return 0;
        }
        let mut count = 0;
        for (j, &parent) in parents.as_slice().iter().enumerate() {
            let mean: f64 =
                effects.iter().map(|e| e[j]).sum::<f64>() / effects.len() as f64;
            let threshold = self.tolerance * mean.abs().max(EFFECT_FLOOR);
            for (k, effect) in effects.iter().enumerate() {
                if (effect[j] - mean).abs() > threshold {
                    count += 1;
                    if self.flagged.insert(Disagreement {
                        node,
                        parent,
                        ctx: ctxs[k],
                    }) {
                        debug!(
                            node,
                            parent,
                            ctx = ctxs[k],
                            effect = effect[j],
                            pooled = mean,
                            "context disagrees on parent effect"
                        );
                    }
                }
            }
        }
        count
    }
}

impl ContextScore for ContextAggregator {
    fn combined_score(&self, node: NodeId, parents: &ParentSet) -> Result<f64, ScoreError> {
        // Per-context evaluations are independent; fan out, then fold in
        // context order so the result is deterministic.
        let per_ctx: Vec<(usize, Result<(f64, Vec<f64>), ScoreError>)> = self
            .usable
            .par_iter()
            .map(|&ctx| {
                let result = self.score.local_score(node, parents, Some(ctx)).and_then(
                    |score| {
                        let effects = if parents.is_empty() {
                            Vec::new()
                        } else {
                            self.score.parent_effects(node, parents, Some(ctx))?
                        };
                        Ok((score, effects))
                    },
                );
                (ctx, result)
            })
            .collect();

        let mut sum = 0.0;
        let mut ctxs = Vec::new();
        let mut effects = Vec::new();
        let mut first_insufficiency = None;
        for (ctx, result) in per_ctx {
            match result {
                Ok((score, eff)) => {
                    sum += score;
                    ctxs.push(ctx);
                    effects.push(eff);
                }
                // Per-context insufficiency skips that context for this
                // candidate only.
                Err(err @ ScoreError::InsufficientData { .. }) => {
                    debug!(node, ctx, %err, "context skipped for candidate");
                    if first_insufficiency.is_none() {
                        first_insufficiency = Some(err);
                    }
                }
                Err(err) => return Err(err),
            }
        }

        if ctxs.is_empty() {
            return Err(first_insufficiency.unwrap_or(ScoreError::InsufficientData {
                node,
                n_samples: 0,
                needed: parents.len() + 3,
            }));
        }

        let n_disagreements = self.count_disagreements(node, parents, &ctxs, &effects);
        let penalty = self.penalty_scale
            * (self.total_samples.max(2) as f64).ln()
            * n_disagreements as f64;
        Ok(sum - penalty)
    }
}
