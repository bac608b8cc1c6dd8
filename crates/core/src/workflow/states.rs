use serde::{Deserialize, Serialize};

use crate::domain::claim::{ClaimDecision, ClaimInfo, PriceCheck, ValidationOutcome};
use crate::domain::policy::{PolicyQueries, PolicyRecommendation};
use crate::domain::trace::TraceEntry;

/// States of the claim-processing graph.
///
/// ```text
/// ParseClaim
///   -> ValidateClaim --(invalid)--> FinalizeInvalid -> Done
///   -> CheckPolicy
///   -> PriceCheck --(inflated)--> FinalizeInflated -> Done
///   -> GenerateRecommendation
///   -> FinalizeDecision -> Done
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    ParseClaim,
    ValidateClaim,
    CheckPolicy,
    PriceCheck,
    GenerateRecommendation,
    FinalizeDecision,
    FinalizeInvalid,
    FinalizeInflated,
    Done,
}

impl WorkflowState {
    /// Stage name used in trace entries and logs.
    pub fn stage_name(&self) -> &'static str {
        match self {
            Self::ParseClaim => "parse_claim",
            Self::ValidateClaim => "validate_claim",
            Self::CheckPolicy => "check_policy",
            Self::PriceCheck => "price_check",
            Self::GenerateRecommendation => "generate_recommendation",
            Self::FinalizeDecision => "finalize_decision",
            Self::FinalizeInvalid => "finalize_invalid",
            Self::FinalizeInflated => "finalize_inflated",
            Self::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Accumulated context threaded through the workflow. Replaced wholesale
/// at each transition rather than mutated in place, which keeps trace
/// entries causally ordered and makes runs replayable.
#[derive(Clone, Debug, Default)]
pub struct WorkflowContext {
    pub claim: Option<ClaimInfo>,
    pub validation: Option<ValidationOutcome>,
    pub policy_queries: Option<PolicyQueries>,
    pub policy_text: Vec<String>,
    pub price_check: Option<PriceCheck>,
    pub recommendation: Option<PolicyRecommendation>,
    pub decision: Option<ClaimDecision>,
    pub trace: Vec<TraceEntry>,
}

impl WorkflowContext {
    pub fn with_trace_entry(mut self, entry: TraceEntry) -> Self {
        self.trace.push(entry);
        self
    }
}

/// Result of one state handler: the next state tag plus the replaced
/// context (with exactly one new trace entry appended).
#[derive(Clone, Debug)]
pub struct StepOutcome {
    pub next: WorkflowState,
    pub context: WorkflowContext,
}
