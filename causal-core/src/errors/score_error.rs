use crate::dag::NodeId;

/// Scoring-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("insufficient data scoring node {node}: {n_samples} samples, need {needed}")]
    InsufficientData {
        node: NodeId,
        n_samples: usize,
        needed: usize,
    },

    #[error("singular fit for node {node}: {details}")]
    SingularFit { node: NodeId, details: String },

    #[error("unknown context index {ctx}: dataset has {n_contexts} contexts")]
    UnknownContext { ctx: usize, n_contexts: usize },
}

impl ScoreError {
    /// Whether search may recover by skipping the candidate instead of
    /// aborting the fit.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ScoreError::InsufficientData { .. })
    }
}
