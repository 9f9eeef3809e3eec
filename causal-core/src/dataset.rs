//! Observation data: a dense matrix per context, all sharing the same
//! column set and order. Matrices sit behind `Arc` so score functions
//! can hold the data without copying it per candidate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Dense row-major `n_rows x n_cols` matrix of observations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Matrix {
    data: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
}

impl Matrix {
    /// Build from row-major storage. Panics if the length is not
    /// `n_rows * n_cols`; construction is caller-side code, not search.
    pub fn new(data: Vec<f64>, n_rows: usize, n_cols: usize) -> Self {
        assert_eq!(
            data.len(),
            n_rows * n_cols,
            "matrix storage length must equal n_rows * n_cols"
        );
        Self {
            data,
            n_rows,
            n_cols,
        }
    }

    /// Build from a list of equal-length rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in &rows {
            assert_eq!(row.len(), n_cols, "all rows must have the same length");
            data.extend_from_slice(row);
        }
        Self {
            data,
            n_rows,
            n_cols,
        }
    }

    /// A matrix with zero rows (a context that collected no samples).
    pub fn empty(n_cols: usize) -> Self {
        Self {
            data: Vec::new(),
            n_rows: 0,
            n_cols,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n_cols + col]
    }

    /// Copy of column `col`.
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.n_rows).map(|r| self.get(r, col)).collect()
    }

    /// Iterate over the values of column `col` without copying.
    pub fn column_iter(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.n_rows).map(move |r| self.get(r, col))
    }
}

/// Input data for one fit: a single matrix (continuous mode) or an
/// ordered sequence of per-context matrices.
#[derive(Debug, Clone)]
pub enum Dataset {
    Continuous(Arc<Matrix>),
    Contexts(Vec<Arc<Matrix>>),
}

impl Dataset {
    pub fn continuous(matrix: Matrix) -> Self {
        Dataset::Continuous(Arc::new(matrix))
    }

    pub fn contexts(matrices: Vec<Matrix>) -> Self {
        Dataset::Contexts(matrices.into_iter().map(Arc::new).collect())
    }

    /// The per-context matrices; continuous data is one context.
    pub fn matrices(&self) -> Vec<Arc<Matrix>> {
        match self {
            Dataset::Continuous(m) => vec![Arc::clone(m)],
            Dataset::Contexts(ms) => ms.iter().map(Arc::clone).collect(),
        }
    }

    pub fn n_contexts(&self) -> usize {
        match self {
            Dataset::Continuous(_) => 1,
            Dataset::Contexts(ms) => ms.len(),
        }
    }

    /// Column count of the first matrix, or `None` for an empty dataset.
    pub fn n_nodes(&self) -> Option<usize> {
        match self {
            Dataset::Continuous(m) => Some(m.n_cols()),
            Dataset::Contexts(ms) => ms.first().map(|m| m.n_cols()),
        }
    }
}

/// Stable node names: `x0..x{n-1}` unless the caller supplies names.
pub fn default_node_names(n_nodes: usize) -> Vec<String> {
    (0..n_nodes).map(|i| format!("x{i}")).collect()
}
