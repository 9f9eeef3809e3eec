//! # causal-score
//!
//! Local score functions for causal-structure search. A score answers:
//! how well does this candidate parent set explain this node's data,
//! penalized for complexity? Higher is better.
//!
//! Two implementations: a closed-form penalized least-squares baseline
//! and an additive spline regression for nonlinear mechanisms. Both are
//! deterministic and memoized per `(node, parent-set, context)`.

pub mod baseline;
pub mod numerics;
pub mod score;
pub mod spline;

pub use baseline::BaselineScore;
pub use score::{ParentSet, ScoreCache, ScoreFunction};
pub use spline::SplineScore;
