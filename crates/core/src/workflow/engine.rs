//! Deterministic claim-processing engine: a fixed directed graph with two
//! early-exit branches, executed strictly sequentially for one claim.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::assembler;
use crate::capabilities::{
    PolicyRecordSource, PriceDiscovery, ReasoningCapability, SemanticSearch,
};
use crate::domain::claim::{ClaimDecision, ClaimInfo};
use crate::domain::trace::TraceEntry;
use crate::errors::EngineError;
use crate::stages::{pricing, recommendation, retrieval, validation};
use crate::workflow::states::{StepOutcome, WorkflowContext, WorkflowState};

/// Tuning knobs for one engine instance. Shared read-only across claims.
#[derive(Clone, Debug)]
pub struct EngineSettings {
    /// Fractional margin above the market estimate beyond which a claimed
    /// cost is rejected (0.40 = 40%).
    pub inflation_threshold: f64,
    /// Maximum snippets fetched per generated policy query.
    pub results_per_query: usize,
    /// Hard bound on state transitions per run. Exceeding it is a fatal
    /// abort, never a silent truncation.
    pub max_steps: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self { inflation_threshold: 0.40, results_per_query: 5, max_steps: 16 }
    }
}

/// Final product of one workflow run: the assembled decision plus the
/// ordered execution trace it was assembled from.
#[derive(Clone, Debug)]
pub struct WorkflowOutcome {
    pub decision: ClaimDecision,
    pub trace: Vec<TraceEntry>,
}

/// The deterministic strategy. Holds the four capability connections;
/// safe for concurrent use across independent claims (no locks are held
/// across stages).
pub struct WorkflowEngine {
    records: Arc<dyn PolicyRecordSource>,
    search: Arc<dyn SemanticSearch>,
    discovery: Arc<dyn PriceDiscovery>,
    reasoning: Arc<dyn ReasoningCapability>,
    settings: EngineSettings,
}

impl WorkflowEngine {
    pub fn new(
        records: Arc<dyn PolicyRecordSource>,
        search: Arc<dyn SemanticSearch>,
        discovery: Arc<dyn PriceDiscovery>,
        reasoning: Arc<dyn ReasoningCapability>,
        settings: EngineSettings,
    ) -> Self {
        Self { records, search, discovery, reasoning, settings }
    }

    /// Run the full graph for one claim. Exactly one decision is produced
    /// per run; hard failures (unreachable store, step budget, reasoning
    /// failure mid-graph) abort with an error and no partial decision.
    pub async fn process_claim(&self, claim: ClaimInfo) -> Result<WorkflowOutcome, EngineError> {
        let mut state = WorkflowState::ParseClaim;
        let mut context = WorkflowContext { claim: Some(claim), ..WorkflowContext::default() };
        let mut steps = 0u32;

        while !state.is_terminal() {
            if steps >= self.settings.max_steps {
                return Err(EngineError::BudgetExceeded { limit: self.settings.max_steps });
            }
            steps += 1;

            info!(stage = state.stage_name(), "entering workflow stage");
            let outcome = self.step(state, context).await?;
            state = outcome.next;
            context = outcome.context;
        }

        let trace = context.trace;
        let decision = context
            .decision
            .unwrap_or_else(|| ClaimDecision::rejection("unknown", "workflow produced no decision"));
        Ok(WorkflowOutcome { decision: assembler::assemble(decision, &trace), trace })
    }

    /// Transition function: pure routing over the current state, with each
    /// handler appending exactly one trace entry before exit.
    async fn step(
        &self,
        state: WorkflowState,
        context: WorkflowContext,
    ) -> Result<StepOutcome, EngineError> {
        match state {
            WorkflowState::ParseClaim => Ok(self.parse_claim(context)),
            WorkflowState::ValidateClaim => Ok(self.validate_claim(context).await),
            WorkflowState::CheckPolicy => self.check_policy(context).await,
            WorkflowState::PriceCheck => Ok(self.price_check(context).await),
            WorkflowState::GenerateRecommendation => {
                self.generate_recommendation(context).await
            }
            WorkflowState::FinalizeDecision => Ok(self.finalize_decision(context)),
            WorkflowState::FinalizeInvalid => Ok(self.finalize_invalid(context)),
            WorkflowState::FinalizeInflated => Ok(self.finalize_inflated(context)),
            WorkflowState::Done => Ok(StepOutcome { next: WorkflowState::Done, context }),
        }
    }

    fn parse_claim(&self, context: WorkflowContext) -> StepOutcome {
        let started = Instant::now();
        let claim_number = context
            .claim
            .as_ref()
            .map(|claim| claim.claim_number.clone())
            .unwrap_or_default();

        let entry = TraceEntry::new(WorkflowState::ParseClaim.stage_name(), started.elapsed())
            .with_annotation("claim_number", claim_number);
        StepOutcome {
            next: WorkflowState::ValidateClaim,
            context: context.with_trace_entry(entry),
        }
    }

    async fn validate_claim(&self, context: WorkflowContext) -> StepOutcome {
        let started = Instant::now();
        let claim = context.claim.clone().unwrap_or_else(placeholder_claim);
        let outcome = validation::validate_claim(&claim, self.records.as_ref()).await;

        let entry = TraceEntry::new(WorkflowState::ValidateClaim.stage_name(), started.elapsed())
            .with_annotation("is_valid", outcome.is_valid.to_string())
            .with_annotation("reason", outcome.reason.clone());

        let next = if outcome.is_valid {
            WorkflowState::CheckPolicy
        } else {
            WorkflowState::FinalizeInvalid
        };
        let context =
            WorkflowContext { validation: Some(outcome), ..context }.with_trace_entry(entry);
        StepOutcome { next, context }
    }

    async fn check_policy(&self, context: WorkflowContext) -> Result<StepOutcome, EngineError> {
        let started = Instant::now();
        let claim = context.claim.clone().unwrap_or_else(placeholder_claim);

        let queries =
            recommendation::generate_policy_queries(&claim, self.reasoning.as_ref()).await?;
        let chunks = retrieval::retrieve_policy_text(
            &queries.queries,
            self.search.as_ref(),
            self.settings.results_per_query,
        )
        .await?;

        let entry = TraceEntry::new(WorkflowState::CheckPolicy.stage_name(), started.elapsed())
            .with_annotation("query_count", queries.queries.len().to_string())
            .with_annotation("chunks_retrieved", chunks.len().to_string());

        let context = WorkflowContext {
            policy_queries: Some(queries),
            policy_text: chunks,
            ..context
        }
        .with_trace_entry(entry);
        Ok(StepOutcome { next: WorkflowState::PriceCheck, context })
    }

    async fn price_check(&self, context: WorkflowContext) -> StepOutcome {
        let started = Instant::now();
        let claim = context.claim.clone().unwrap_or_else(placeholder_claim);

        let check = pricing::check_repair_cost(
            &claim,
            self.discovery.as_ref(),
            self.settings.inflation_threshold,
        )
        .await;

        let entry = TraceEntry::new(WorkflowState::PriceCheck.stage_name(), started.elapsed())
            .with_annotation(
                "market_estimate",
                check
                    .market_estimate
                    .map(|estimate| format!("{estimate:.2}"))
                    .unwrap_or_else(|| "none".to_string()),
            )
            .with_annotation("is_inflated", check.is_inflated.to_string());

        let next = if check.is_inflated {
            WorkflowState::FinalizeInflated
        } else {
            WorkflowState::GenerateRecommendation
        };
        let context =
            WorkflowContext { price_check: Some(check), ..context }.with_trace_entry(entry);
        StepOutcome { next, context }
    }

    async fn generate_recommendation(
        &self,
        context: WorkflowContext,
    ) -> Result<StepOutcome, EngineError> {
        let started = Instant::now();
        let claim = context.claim.clone().unwrap_or_else(placeholder_claim);

        let policy_text = if context.policy_text.is_empty() {
            "No policy text available.".to_string()
        } else {
            context.policy_text.join("\n\n---\n\n")
        };
        let market_info = context
            .price_check
            .as_ref()
            .map(|check| check.summary.clone())
            .unwrap_or_else(|| "No market cost data.".to_string());

        let recommendation = recommendation::generate_recommendation(
            &claim,
            &policy_text,
            &market_info,
            self.reasoning.as_ref(),
        )
        .await?;

        let entry =
            TraceEntry::new(WorkflowState::GenerateRecommendation.stage_name(), started.elapsed())
                .with_annotation("policy_section", recommendation.policy_section.clone());

        let context = WorkflowContext { recommendation: Some(recommendation), ..context }
            .with_trace_entry(entry);
        Ok(StepOutcome { next: WorkflowState::FinalizeDecision, context })
    }

    fn finalize_decision(&self, context: WorkflowContext) -> StepOutcome {
        let started = Instant::now();
        let claim = context.claim.clone().unwrap_or_else(placeholder_claim);
        let recommendation = context.recommendation.clone();

        let decision = ClaimDecision {
            claim_number: claim.claim_number.clone(),
            covered: true,
            deductible: recommendation
                .as_ref()
                .and_then(|rec| rec.deductible)
                .unwrap_or(0.0),
            recommended_payout: recommendation
                .as_ref()
                .and_then(|rec| rec.settlement_amount)
                .unwrap_or(0.0),
            notes: recommendation.map(|rec| rec.recommendation_summary),
        };
        info!(
            claim_number = %claim.claim_number,
            payout = decision.recommended_payout,
            "claim approved"
        );

        let entry =
            TraceEntry::new(WorkflowState::FinalizeDecision.stage_name(), started.elapsed())
                .with_annotation("covered", "true");
        let context =
            WorkflowContext { decision: Some(decision), ..context }.with_trace_entry(entry);
        StepOutcome { next: WorkflowState::Done, context }
    }

    fn finalize_invalid(&self, context: WorkflowContext) -> StepOutcome {
        let started = Instant::now();
        let claim = context.claim.clone().unwrap_or_else(placeholder_claim);
        let reason = context
            .validation
            .as_ref()
            .map(|outcome| outcome.reason.clone())
            .unwrap_or_else(|| "validation failed".to_string());

        info!(claim_number = %claim.claim_number, %reason, "claim rejected as invalid");
        let decision = ClaimDecision::rejection(
            claim.claim_number.clone(),
            format!("Claim rejected: {reason}"),
        );

        let entry = TraceEntry::new(WorkflowState::FinalizeInvalid.stage_name(), started.elapsed())
            .with_annotation("covered", "false");
        let context =
            WorkflowContext { decision: Some(decision), ..context }.with_trace_entry(entry);
        StepOutcome { next: WorkflowState::Done, context }
    }

    fn finalize_inflated(&self, context: WorkflowContext) -> StepOutcome {
        let started = Instant::now();
        let claim = context.claim.clone().unwrap_or_else(placeholder_claim);
        let summary = context
            .price_check
            .as_ref()
            .map(|check| check.summary.clone())
            .unwrap_or_default();

        info!(claim_number = %claim.claim_number, "claim rejected for inflated cost");
        let decision = ClaimDecision::rejection(
            claim.claim_number.clone(),
            format!("Claim rejected: estimated repair cost appears inflated. {summary}"),
        );

        let entry =
            TraceEntry::new(WorkflowState::FinalizeInflated.stage_name(), started.elapsed())
                .with_annotation("covered", "false");
        let context =
            WorkflowContext { decision: Some(decision), ..context }.with_trace_entry(entry);
        StepOutcome { next: WorkflowState::Done, context }
    }
}

// Reached only if a handler runs before ParseClaim seeded the context;
// keeps the engine panic-free on that unreachable path.
fn placeholder_claim() -> ClaimInfo {
    ClaimInfo {
        claim_number: "unknown".to_string(),
        policy_number: "unknown".to_string(),
        claimant_name: String::new(),
        date_of_loss: chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap_or(chrono::NaiveDate::MIN),
        loss_description: String::new(),
        estimated_repair_cost: 0.0,
        vehicle_details: None,
    }
}
