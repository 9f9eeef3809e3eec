//! The evaluation budget: a hard cap on candidate scorings per fit.
//! Exhaustion truncates the search rather than failing it.

/// Counts candidate `(node, parent-set)` evaluations. One charge per
/// proposal, taken before the evaluation runs; cache hits charge too —
/// the budget bounds proposals, not floating-point work.
#[derive(Debug)]
pub struct EvalBudget {
    limit: usize,
    used: usize,
}

impl EvalBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    /// Take one evaluation. Returns `false` once the budget is spent.
    pub fn charge(&mut self) -> bool {
        if self.used >= self.limit {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn exhausted(&self) -> bool {
        self.used >= self.limit
    }
}
