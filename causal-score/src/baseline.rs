//! Baseline score: linear-Gaussian fit with a BIC complexity penalty.
//! The cheap closed-form alternative when nonlinearity is not expected.

use std::sync::Arc;

use causal_core::dataset::Matrix;
use causal_core::{NodeId, ScoreError};
use tracing::debug;

use crate::numerics;
use crate::score::{gather_column, ParentSet, ScoreCache, ScoreFunction};

/// Jitter-only regularization; the baseline is plain least squares.
const BASELINE_LAMBDA: f64 = 0.0;

/// Penalized least-squares local score over one or more contexts.
pub struct BaselineScore {
    data: Vec<Arc<Matrix>>,
    cache: ScoreCache,
}

impl BaselineScore {
    pub fn new(data: Vec<Arc<Matrix>>) -> Self {
        Self {
            data,
            cache: ScoreCache::new(),
        }
    }

    fn fit(
        &self,
        node: NodeId,
        parents: &ParentSet,
        ctx: Option<usize>,
    ) -> Result<(numerics::LocalFit, Vec<Vec<f64>>, Vec<f64>), ScoreError> {
        let y = gather_column(&self.data, ctx, node)?;
        let columns: Vec<Vec<f64>> = parents
            .as_slice()
            .iter()
            .map(|&p| gather_column(&self.data, ctx, p))
            .collect::<Result<_, _>>()?;

        let dof = parents.len() + 1;
        let needed = dof + 2;
        if y.len() < needed {
            return Err(ScoreError::InsufficientData {
                node,
                n_samples: y.len(),
                needed,
            });
        }

        match numerics::penalized_fit(&columns, &y, BASELINE_LAMBDA) {
            Ok(fit) => Ok((fit, columns, y)),
            // Non-finite numbers disqualify this candidate only.
            Err(numerics::FitBreakdown::NonFinite) => {
                debug!(node, parents = ?parents.as_slice(), "non-finite fit; candidate excluded");
                Err(ScoreError::InsufficientData {
                    node,
                    n_samples: y.len(),
                    needed,
                })
            }
            Err(numerics::FitBreakdown::Singular) => {
                debug!(node, parents = ?parents.as_slice(), "least-squares breakdown");
                Err(ScoreError::SingularFit {
                    node,
                    details: format!(
                        "least-squares breakdown with parents {:?}",
                        parents.as_slice()
                    ),
                })
            }
        }
    }
}

impl ScoreFunction for BaselineScore {
    fn local_score(
        &self,
        node: NodeId,
        parents: &ParentSet,
        ctx: Option<usize>,
    ) -> Result<f64, ScoreError> {
        self.cache.get_or_compute(node, parents, ctx, || {
            let (fit, _, y) = self.fit(node, parents, ctx)?;
            let dof = parents.len() + 1;
            // A non-finite likelihood disqualifies the candidate rather
            // than poisoning the search.
            let ll = numerics::gaussian_loglik(&fit.residuals).ok_or(
                ScoreError::InsufficientData {
                    node,
                    n_samples: y.len(),
                    needed: dof + 2,
                },
            )?;
            Ok(numerics::bic_score(ll, dof, y.len()))
        })
    }

    fn parent_effects(
        &self,
        node: NodeId,
        parents: &ParentSet,
        ctx: Option<usize>,
    ) -> Result<Vec<f64>, ScoreError> {
        if parents.is_empty() {
            return Ok(Vec::new());
        }
        let (fit, columns, y) = self.fit(node, parents, ctx)?;
        let sd_y = numerics::std_dev(&y).max(1e-9);
        Ok(columns
            .iter()
            .enumerate()
            .map(|(j, col)| fit.coefs[j + 1] * numerics::std_dev(col) / sd_y)
            .collect())
    }

    fn n_contexts(&self) -> usize {
        self.data.len()
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causal_core::dataset::Matrix;

    fn line_data(n: usize) -> Vec<Arc<Matrix>> {
        // x1 = t, x0 = 2*x1 + small wiggle (deterministic).
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let t = i as f64 / n as f64;
                vec![2.0 * t + 0.01 * (i as f64).sin(), t]
            })
            .collect();
        vec![Arc::new(Matrix::from_rows(rows))]
    }

    #[test]
    fn true_parent_beats_empty_set() {
        let score = BaselineScore::new(line_data(200));
        let with_parent = score
            .local_score(0, &ParentSet::new(vec![1]), None)
            .unwrap();
        let marginal = score.local_score(0, &ParentSet::empty(), None).unwrap();
        assert!(with_parent > marginal);
    }

    #[test]
    fn score_is_idempotent() {
        let score = BaselineScore::new(line_data(100));
        let ps = ParentSet::new(vec![1]);
        let a = score.local_score(0, &ps, None).unwrap();
        let b = score.local_score(0, &ps, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn too_few_samples_is_insufficient_data() {
        let rows = vec![vec![1.0, 2.0], vec![2.0, 3.0]];
        let score = BaselineScore::new(vec![Arc::new(Matrix::from_rows(rows))]);
        let err = score
            .local_score(0, &ParentSet::new(vec![1]), None)
            .unwrap_err();
        assert!(matches!(err, ScoreError::InsufficientData { .. }));
    }

    #[test]
    fn effects_carry_the_mechanism_sign() {
        let score = BaselineScore::new(line_data(200));
        let effects = score
            .parent_effects(0, &ParentSet::new(vec![1]), None)
            .unwrap();
        assert_eq!(effects.len(), 1);
        assert!(effects[0] > 0.5, "strong positive effect, got {}", effects[0]);
    }

    #[test]
    fn clear_cache_resets_memoization() {
        let score = BaselineScore::new(line_data(100));
        let ps = ParentSet::empty();
        let a = score.local_score(0, &ps, None).unwrap();
        score.clear_cache();
        let b = score.local_score(0, &ps, None).unwrap();
        assert_eq!(a, b);
    }
}
