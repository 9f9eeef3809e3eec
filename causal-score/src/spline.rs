//! Spline score: additive regression on a truncated-power cubic basis
//! per parent, ridge-penalized, scored with an explicit degrees-of-
//! freedom BIC penalty. Handles smooth nonlinear mechanisms the linear
//! baseline misses.

use std::sync::Arc;

use causal_core::dataset::Matrix;
use causal_core::{NodeId, ScoreError};
use tracing::debug;

use crate::numerics;
use crate::score::{gather_column, ParentSet, ScoreCache, ScoreFunction};

/// Interior knots per parent, at the 25/50/75% quantiles.
const KNOT_QUANTILES: [f64; 3] = [0.25, 0.5, 0.75];
/// Basis columns per parent: x, x^2, x^3 plus one per knot.
const BASIS_PER_PARENT: usize = 3 + KNOT_QUANTILES.len();
/// Ridge penalty on the basis coefficients.
const SPLINE_LAMBDA: f64 = 1e-3;

/// Additive spline local score over one or more contexts.
pub struct SplineScore {
    data: Vec<Arc<Matrix>>,
    cache: ScoreCache,
}

impl SplineScore {
    pub fn new(data: Vec<Arc<Matrix>>) -> Self {
        Self {
            data,
            cache: ScoreCache::new(),
        }
    }

    fn dof(parents: &ParentSet) -> usize {
        1 + BASIS_PER_PARENT * parents.len()
    }

    /// Truncated-power cubic basis for one predictor, knots at its
    /// empirical quantiles. Deterministic for a given column.
    fn basis_columns(x: &[f64]) -> Vec<Vec<f64>> {
        let knots: Vec<f64> = KNOT_QUANTILES
            .iter()
            .map(|&q| numerics::quantile(x, q))
            .collect();

        let mut cols = Vec::with_capacity(BASIS_PER_PARENT);
        cols.push(x.to_vec());
        cols.push(x.iter().map(|v| v * v).collect());
        cols.push(x.iter().map(|v| v * v * v).collect());
        for &k in &knots {
            cols.push(
                x.iter()
                    .map(|v| {
                        let d = (v - k).max(0.0);
                        d * d * d
                    })
                    .collect(),
            );
        }
        cols
    }

    fn fit(
        &self,
        node: NodeId,
        parents: &ParentSet,
        ctx: Option<usize>,
    ) -> Result<(numerics::LocalFit, Vec<Vec<Vec<f64>>>, Vec<f64>), ScoreError> {
        let y = gather_column(&self.data, ctx, node)?;
        let dof = Self::dof(parents);
        let needed = dof + 2;
        if y.len() < needed {
            return Err(ScoreError::InsufficientData {
                node,
                n_samples: y.len(),
                needed,
            });
        }

        // Per-parent basis blocks, flattened into one design.
        let mut blocks = Vec::with_capacity(parents.len());
        for &p in parents.as_slice() {
            let x = gather_column(&self.data, ctx, p)?;
            blocks.push(Self::basis_columns(&x));
        }
        let design: Vec<Vec<f64>> = blocks.iter().flatten().cloned().collect();

        match numerics::penalized_fit(&design, &y, SPLINE_LAMBDA) {
            Ok(fit) => Ok((fit, blocks, y)),
            // Cubing large finite values overflows the basis; not fatal.
            Err(numerics::FitBreakdown::NonFinite) => {
                debug!(node, parents = ?parents.as_slice(), "non-finite spline fit; candidate excluded");
                Err(ScoreError::InsufficientData {
                    node,
                    n_samples: y.len(),
                    needed,
                })
            }
            Err(numerics::FitBreakdown::Singular) => {
                debug!(node, parents = ?parents.as_slice(), "spline fit breakdown");
                Err(ScoreError::SingularFit {
                    node,
                    details: format!(
                        "spline fit breakdown with parents {:?}",
                        parents.as_slice()
                    ),
                })
            }
        }
    }
}

impl ScoreFunction for SplineScore {
    fn local_score(
        &self,
        node: NodeId,
        parents: &ParentSet,
        ctx: Option<usize>,
    ) -> Result<f64, ScoreError> {
        self.cache.get_or_compute(node, parents, ctx, || {
            let (fit, _, y) = self.fit(node, parents, ctx)?;
            let dof = Self::dof(parents);
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
        let (fit, blocks, y) = self.fit(node, parents, ctx)?;
        let n = y.len();
        let sd_y = numerics::std_dev(&y).max(1e-9);
        let mean_y = numerics::mean(&y);

        // Effect of parent j: the fitted additive component's spread,
        // signed by its covariance with the response.
        let mut effects = Vec::with_capacity(parents.len());
        for (j, block) in blocks.iter().enumerate() {
            let offset = 1 + j * BASIS_PER_PARENT;
            let component: Vec<f64> = (0..n)
                .map(|i| {
                    block
                        .iter()
                        .enumerate()
                        .map(|(b, col)| fit.coefs[offset + b] * col[i])
                        .sum()
                })
                .collect();
            let mean_c = numerics::mean(&component);
            let cov: f64 = component
                .iter()
                .zip(&y)
                .map(|(c, v)| (c - mean_c) * (v - mean_y))
                .sum::<f64>()
                / n as f64;
            let magnitude = numerics::std_dev(&component) / sd_y;
            effects.push(if cov < 0.0 { -magnitude } else { magnitude });
        }
        Ok(effects)
    }

    fn n_contexts(&self) -> usize {
        self.data.len()
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }
}
