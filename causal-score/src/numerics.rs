//! Shared numerics: ridge-stabilized least squares on small systems and
//! the Gaussian log-likelihood of residuals. Everything here guards
//! against non-finite values; a breakdown surfaces as `None` and the
//! caller decides how to classify it.

use statrs::distribution::{Continuous, Normal};

/// Variance floor, keeps the log-likelihood finite on perfect fits.
const VARIANCE_FLOOR: f64 = 1e-12;
/// Diagonal jitter making the normal equations numerically SPD.
const DIAGONAL_JITTER: f64 = 1e-9;

/// Why a local regression could not be completed. Non-finite values
/// disqualify one candidate; a singular system is a real breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitBreakdown {
    /// An input or intermediate value left the finite range.
    NonFinite,
    /// The normal equations are not positive definite.
    Singular,
}

/// Result of one local regression.
#[derive(Debug, Clone)]
pub struct LocalFit {
    /// Coefficients; index 0 is the intercept, then one per design column.
    pub coefs: Vec<f64>,
    /// Per-sample residuals `y - X beta`.
    pub residuals: Vec<f64>,
    /// Residual sum of squares.
    pub rss: f64,
}

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

pub fn variance(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / xs.len() as f64
}

pub fn std_dev(xs: &[f64]) -> f64 {
    variance(xs).sqrt()
}

/// Empirical quantile by nearest-rank on a sorted copy.
pub fn quantile(xs: &[f64], q: f64) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let idx = ((sorted.len() - 1) as f64 * q).round() as usize;
    sorted[idx]
}

/// Ridge-penalized least squares of `y` on `columns` plus an intercept.
///
/// The penalty applies to the predictor coefficients, not the intercept
/// (beyond the SPD jitter). The error classifies the breakdown:
/// non-finite inputs or intermediates (overflow in the cross products
/// included) versus an unsolvable system.
pub fn penalized_fit(
    columns: &[Vec<f64>],
    y: &[f64],
    lambda: f64,
) -> Result<LocalFit, FitBreakdown> {
    let n = y.len();
    let k = columns.len() + 1; // intercept + predictors

    if columns.iter().any(|c| c.len() != n) {
        return Err(FitBreakdown::Singular);
    }
    if columns
        .iter()
        .flat_map(|c| c.iter())
        .chain(y.iter())
        .any(|v| !v.is_finite())
    {
        return Err(FitBreakdown::NonFinite);
    }

    // Normal equations X'X beta = X'y with the intercept as column 0.
    let col = |j: usize, i: usize| -> f64 {
        if j == 0 {
            1.0
        } else {
            columns[j - 1][i]
        }
    };

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for a in 0..k {
        for b in a..k {
            let mut s = 0.0;
            for i in 0..n {
                s += col(a, i) * col(b, i);
            }
            xtx[a][b] = s;
            xtx[b][a] = s;
        }
        let mut s = 0.0;
        for i in 0..n {
            s += col(a, i) * y[i];
        }
        xty[a] = s;
    }
    // Cross products of large finite values overflow before the solve.
    if xtx
        .iter()
        .flat_map(|row| row.iter())
        .chain(xty.iter())
        .any(|v| !v.is_finite())
    {
        return Err(FitBreakdown::NonFinite);
    }
    for a in 0..k {
        xtx[a][a] += DIAGONAL_JITTER;
        if a > 0 {
            xtx[a][a] += lambda;
        }
    }

    let coefs = cholesky_solve(xtx, &xty)?;

    let mut residuals = Vec::with_capacity(n);
    let mut rss = 0.0;
    for i in 0..n {
        let mut pred = 0.0;
        for (a, beta) in coefs.iter().enumerate() {
            pred += beta * col(a, i);
        }
        let r = y[i] - pred;
        rss += r * r;
        residuals.push(r);
    }
    if !rss.is_finite() {
        return Err(FitBreakdown::NonFinite);
    }

    Ok(LocalFit {
        coefs,
        residuals,
        rss,
    })
}

/// Solve `A x = b` for symmetric positive-definite `A` via Cholesky.
/// A non-positive pivot means the system is singular; a non-finite
/// value means the numbers ran away.
pub fn cholesky_solve(a: Vec<Vec<f64>>, b: &[f64]) -> Result<Vec<f64>, FitBreakdown> {
    let k = b.len();
    let mut l = vec![vec![0.0; k]; k];
    for i in 0..k {
        for j in 0..=i {
            let mut s = a[i][j];
            for m in 0..j {
                s -= l[i][m] * l[j][m];
            }
            if i == j {
                if !s.is_finite() {
                    return Err(FitBreakdown::NonFinite);
                }
                if s <= 0.0 {
                    return Err(FitBreakdown::Singular);
                }
                l[i][j] = s.sqrt();
            } else {
                l[i][j] = s / l[j][j];
            }
        }
    }

    // Forward then back substitution.
    let mut z = vec![0.0; k];
    for i in 0..k {
        let mut s = b[i];
        for m in 0..i {
            s -= l[i][m] * z[m];
        }
        z[i] = s / l[i][i];
    }
    let mut x = vec![0.0; k];
    for i in (0..k).rev() {
        let mut s = z[i];
        for m in (i + 1)..k {
            s -= l[m][i] * x[m];
        }
        x[i] = s / l[i][i];
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(FitBreakdown::NonFinite);
    }
    Ok(x)
}

/// Log-likelihood of the residuals under `N(0, rss/n)` with a floored
/// variance. `None` when it cannot be evaluated finitely.
pub fn gaussian_loglik(residuals: &[f64]) -> Option<f64> {
    let n = residuals.len();
    if n == 0 {
        return None;
    }
    let sigma2 = (residuals.iter().map(|r| r * r).sum::<f64>() / n as f64).max(VARIANCE_FLOOR);
    let normal = Normal::new(0.0, sigma2.sqrt()).ok()?;
    let ll: f64 = residuals.iter().map(|r| normal.ln_pdf(*r)).sum();
    ll.is_finite().then_some(ll)
}

/// BIC-form penalized score: log-likelihood minus `(dof/2) ln n`.
pub fn bic_score(loglik: f64, dof: usize, n: usize) -> f64 {
    loglik - 0.5 * dof as f64 * (n as f64).ln()
}
