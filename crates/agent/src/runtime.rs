//! Transcript-based tool loop. One reasoning round per step: the model
//! either emits a tool call (executed, result appended as an observation)
//! or a final answer (handed to the recovery pipeline). The step budget is
//! the only thing standing between a confused model and an unbounded run,
//! so exceeding it is a hard abort.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use claimflow_core::assembler;
use claimflow_core::json_text;
use claimflow_core::{
    ClaimInfo, EngineError, PolicyRecordSource, PriceDiscovery, ReasoningCapability, SemanticSearch,
    TraceEntry, WorkflowOutcome,
};

use crate::prompts;
use crate::recovery;
use crate::tools::ToolRegistry;

/// Tuning knobs for the autonomous strategy.
#[derive(Clone, Debug)]
pub struct AdapterSettings {
    /// Fractional margin above the market estimate beyond which a claimed
    /// cost is rejected (0.40 = 40%).
    pub inflation_threshold: f64,
    /// Maximum snippets fetched per policy query.
    pub results_per_query: usize,
    /// Hard bound on reasoning rounds per claim.
    pub max_steps: u32,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self { inflation_threshold: 0.40, results_per_query: 5, max_steps: 12 }
    }
}

/// A tool-call request parsed out of a model reply. A reply that does not
/// carry a `tool` key is a final answer by definition.
#[derive(Debug, Deserialize)]
struct ToolCall {
    tool: String,
    #[serde(default)]
    arguments: Value,
}

/// The autonomous strategy. Same capability connections and same decision
/// shape as the deterministic engine; only the control flow differs.
pub struct AutonomousAdapter {
    records: Arc<dyn PolicyRecordSource>,
    search: Arc<dyn SemanticSearch>,
    discovery: Arc<dyn PriceDiscovery>,
    reasoning: Arc<dyn ReasoningCapability>,
    settings: AdapterSettings,
}

impl AutonomousAdapter {
    pub fn new(
        records: Arc<dyn PolicyRecordSource>,
        search: Arc<dyn SemanticSearch>,
        discovery: Arc<dyn PriceDiscovery>,
        reasoning: Arc<dyn ReasoningCapability>,
        settings: AdapterSettings,
    ) -> Self {
        Self { records, search, discovery, reasoning, settings }
    }

    /// Run the tool loop for one claim. Reasoning transport failures and
    /// an exhausted step budget abort the run; a malformed final answer
    /// does not, because recovery always produces a decision.
    pub async fn process_claim(&self, claim: ClaimInfo) -> Result<WorkflowOutcome, EngineError> {
        let registry = ToolRegistry::for_claim(
            claim.clone(),
            Arc::clone(&self.records),
            Arc::clone(&self.search),
            Arc::clone(&self.discovery),
            Arc::clone(&self.reasoning),
            self.settings.inflation_threshold,
            self.settings.results_per_query,
        );

        let mut transcript = format!(
            "{}\n\n{}",
            prompts::system_prompt(&registry),
            prompts::task_prompt(&claim)
        );
        let mut trace: Vec<TraceEntry> = Vec::new();
        let mut steps = 0u32;

        loop {
            if steps >= self.settings.max_steps {
                return Err(EngineError::BudgetExceeded { limit: self.settings.max_steps });
            }
            steps += 1;

            let started = Instant::now();
            let reply = self.reasoning.complete(&transcript).await?;

            match parse_tool_call(&reply) {
                Some(call) => {
                    info!(step = steps, tool = %call.tool, "agent tool call");
                    let (observation, succeeded) =
                        match registry.dispatch(&call.tool, call.arguments).await {
                            Ok(result) => (result.to_string(), true),
                            Err(error) => {
                                warn!(tool = %call.tool, %error, "tool call failed");
                                (format!("Tool error: {error}"), false)
                            }
                        };

                    trace.push(
                        TraceEntry::new(call.tool.clone(), started.elapsed())
                            .with_annotation("step", steps.to_string())
                            .with_annotation("ok", succeeded.to_string()),
                    );
                    transcript.push_str(&format!(
                        "\n\nAssistant:\n{reply}\n\nObservation:\n{observation}"
                    ));
                }
                None => {
                    let recovered = recovery::recover_decision(&reply, &claim.claim_number);
                    info!(
                        step = steps,
                        tier = recovered.tier.as_str(),
                        covered = recovered.decision.covered,
                        "agent produced final answer"
                    );

                    trace.push(
                        TraceEntry::new("recover_decision", started.elapsed())
                            .with_annotation("step", steps.to_string())
                            .with_annotation("tier", recovered.tier.as_str()),
                    );

                    let decision = assembler::assemble(recovered.decision, &trace);
                    return Ok(WorkflowOutcome { decision, trace });
                }
            }
        }
    }
}

/// A reply is a tool call iff it contains a JSON object with a `tool` key.
/// Anything else, including malformed JSON, is a final answer.
fn parse_tool_call(reply: &str) -> Option<ToolCall> {
    let candidate = json_text::first_json_object(reply)?;
    serde_json::from_str(candidate).ok()
}
