//! The `ScoreFunction` capability and its memoization cache.

use std::sync::Arc;

use causal_core::dataset::Matrix;
use causal_core::{NodeId, ScoreError};
use dashmap::DashMap;

/// A candidate parent set: sorted, deduplicated node ids. Transient —
/// produced and scored during search, kept only as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ParentSet(Vec<NodeId>);

impl ParentSet {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn new(mut nodes: Vec<NodeId>) -> Self {
        nodes.sort_unstable();
        nodes.dedup();
        Self(nodes)
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.0.binary_search(&node).is_ok()
    }

    /// This set plus `node`.
    pub fn with(&self, node: NodeId) -> Self {
        let mut nodes = self.0.clone();
        nodes.push(node);
        Self::new(nodes)
    }

    /// This set minus `node`.
    pub fn without(&self, node: NodeId) -> Self {
        Self(self.0.iter().copied().filter(|&n| n != node).collect())
    }
}

impl From<&[NodeId]> for ParentSet {
    fn from(nodes: &[NodeId]) -> Self {
        Self::new(nodes.to_vec())
    }
}

/// The score capability handed to the search layer.
///
/// Implementations close over the (read-only) dataset, so candidate
/// evaluations may run concurrently; scores are deterministic, which
/// makes last-writer-wins cache insertion safe.
pub trait ScoreFunction: Send + Sync {
    /// Penalized fit of `node` on `parents` in context `ctx`
    /// (`None` = all contexts pooled). Higher is better.
    fn local_score(
        &self,
        node: NodeId,
        parents: &ParentSet,
        ctx: Option<usize>,
    ) -> Result<f64, ScoreError>;

    /// Signed standardized effect of each parent on `node`, aligned with
    /// `parents.as_slice()`. The context aggregator compares these
    /// across contexts to detect mechanism changes.
    fn parent_effects(
        &self,
        node: NodeId,
        parents: &ParentSet,
        ctx: Option<usize>,
    ) -> Result<Vec<f64>, ScoreError>;

    /// Number of contexts the score instance was built over.
    fn n_contexts(&self) -> usize;

    /// Drop all memoized scores. Called at the start of each
    /// independent fit; entries are never silently stale.
    fn clear_cache(&self);
}

type ScoreKey = (NodeId, ParentSet, Option<usize>);

/// Memoization of `(node, parent-set, context) -> score`. Concurrent
/// insert-if-absent: duplicate computation is acceptable, divergent
/// results cannot happen because scores are deterministic.
#[derive(Debug, Default)]
pub struct ScoreCache {
    map: DashMap<ScoreKey, f64>,
}

impl ScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the score or compute and remember it. Errors are not
    /// cached; an insufficient-data candidate stays insufficient on
    /// recomputation anyway.
    pub fn get_or_compute<F>(
        &self,
        node: NodeId,
        parents: &ParentSet,
        ctx: Option<usize>,
        compute: F,
    ) -> Result<f64, ScoreError>
    where
        F: FnOnce() -> Result<f64, ScoreError>,
    {
        let key = (node, parents.clone(), ctx);
        if let Some(hit) = self.map.get(&key) {
            return Ok(*hit);
        }
        let score = compute()?;
        self.map.insert(key, score);
        Ok(score)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&self) {
        self.map.clear();
    }
}

/// Column `col` of context `ctx`, or of all contexts concatenated in
/// context order when `ctx` is `None`.
pub(crate) fn gather_column(
    data: &[Arc<Matrix>],
    ctx: Option<usize>,
    col: usize,
) -> Result<Vec<f64>, ScoreError> {
    match ctx {
        Some(i) => match data.get(i) {
            Some(m) => Ok(m.column(col)),
            None => Err(ScoreError::UnknownContext {
                ctx: i,
                n_contexts: data.len(),
            }),
        },
        None => Ok(data.iter().flat_map(|m| m.column_iter(col)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_set_is_sorted_and_deduped() {
        let ps = ParentSet::new(vec![3, 1, 3, 2]);
        assert_eq!(ps.as_slice(), &[1, 2, 3]);
        assert!(ps.contains(2));
        assert!(!ps.contains(0));
    }

    #[test]
    fn with_and_without() {
        let ps = ParentSet::new(vec![1, 4]);
        assert_eq!(ps.with(2).as_slice(), &[1, 2, 4]);
        assert_eq!(ps.without(4).as_slice(), &[1]);
        // Adding an existing parent is a no-op.
        assert_eq!(ps.with(1).as_slice(), &[1, 4]);
    }

    #[test]
    fn cache_computes_once() {
        let cache = ScoreCache::new();
        let ps = ParentSet::new(vec![0]);
        let mut calls = 0;
        for _ in 0..3 {
            let s = cache
                .get_or_compute(1, &ps, None, || {
                    calls += 1;
                    Ok(42.0)
                })
                .unwrap();
            assert_eq!(s, 42.0);
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn gather_pools_all_contexts_when_ctx_is_none() {
        let a = Arc::new(Matrix::from_rows(vec![vec![1.0], vec![2.0]]));
        let b = Arc::new(Matrix::from_rows(vec![vec![3.0]]));
        let data = vec![a, b];
        assert_eq!(gather_column(&data, None, 0).unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(gather_column(&data, Some(1), 0).unwrap(), vec![3.0]);
        assert!(matches!(
            gather_column(&data, Some(5), 0),
            Err(ScoreError::UnknownContext { ctx: 5, .. })
        ));
    }
}
