//! # causal-core
//!
//! Foundation crate for the causalchange structure-discovery engine.
//! Defines the dataset model, the DAG representation, configuration,
//! and errors. Every other crate in the workspace depends on this.

pub mod config;
pub mod dag;
pub mod dataset;
pub mod errors;

// Re-export the most commonly used types at the crate root.
pub use config::{CausalConfig, DataMode, GraphSearch, ScoreType};
pub use dag::{Dag, Edge, NodeId};
pub use dataset::{Dataset, Matrix};
pub use errors::{CausalError, CausalResult, FitError, GraphError, ScoreError};
