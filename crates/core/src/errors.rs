use thiserror::Error;

use crate::capabilities::{ReasoningError, SearchError};

/// Hard failures of a workflow run. Everything else (invalid claims,
/// inflated costs, missing price data, unparseable agent output) resolves
/// into a normal `ClaimDecision` and is not represented here.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// A required backing store is unreachable. Aborts the run; surfaced
    /// to the operator.
    #[error("configuration failure: {0}")]
    Configuration(String),
    /// The step budget was exhausted before reaching a terminal state.
    #[error("workflow exceeded the maximum step count of {limit}")]
    BudgetExceeded { limit: u32 },
    /// The reasoning capability failed inside the deterministic path,
    /// where there is no fallback decision to degrade to.
    #[error(transparent)]
    Reasoning(#[from] ReasoningError),
}

impl From<SearchError> for EngineError {
    fn from(value: SearchError) -> Self {
        Self::Configuration(value.to_string())
    }
}
