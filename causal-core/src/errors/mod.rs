//! Error taxonomy for the workspace. Each layer has its own enum;
//! `CausalError` is the top-level wrapper crossing crate boundaries.

mod fit_error;
mod graph_error;
mod score_error;

pub use fit_error::FitError;
pub use graph_error::GraphError;
pub use score_error::ScoreError;

/// Top-level error wrapper.
#[derive(Debug, thiserror::Error)]
pub enum CausalError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error(transparent)]
    Fit(#[from] FitError),
}

/// Result alias used across the workspace.
pub type CausalResult<T> = Result<T, CausalError>;
