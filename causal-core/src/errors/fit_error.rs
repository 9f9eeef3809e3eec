use super::ScoreError;

/// Façade-level errors surfaced by `fit()`.
#[derive(Debug, thiserror::Error)]
pub enum FitError {
    #[error("shape mismatch in context {context}: expected {expected} columns, found {found}")]
    ShapeMismatch {
        context: usize,
        expected: usize,
        found: usize,
    },

    #[error("data mode is {expected_mode} but input is {found_mode}")]
    DataModeMismatch {
        expected_mode: &'static str,
        found_mode: &'static str,
    },

    #[error("empty dataset: no context matrices provided")]
    EmptyDataset,

    #[error("scoring failed: {0}")]
    Score(#[from] ScoreError),

    #[error("internal invariant violated: {details}")]
    Internal { details: String },
}
