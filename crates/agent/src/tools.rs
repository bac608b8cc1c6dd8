//! Workflow stages wrapped as JSON-in / JSON-out tools. Each tool closes
//! over the claim under review, so the model can never swap the subject of
//! a run mid-flight by passing a different claim in the arguments.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use claimflow_core::stages::{pricing, recommendation, retrieval, validation};
use claimflow_core::{
    ClaimInfo, PolicyRecordSource, PriceDiscovery, ReasoningCapability, SemanticSearch,
};

/// One invocable tool. Arguments and results are both JSON values; the
/// runtime never interprets them beyond relaying observations back to the
/// model.
#[async_trait]
pub trait ClaimTool: Send + Sync {
    fn name(&self) -> &'static str;
    /// Shown to the model verbatim in the system prompt.
    fn description(&self) -> &'static str;
    async fn execute(&self, arguments: Value) -> anyhow::Result<Value>;
}

/// Name-keyed dispatch table for one claim run.
pub struct ToolRegistry {
    tools: HashMap<&'static str, Box<dyn ClaimTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// The full tool set for processing `claim`, backed by the given
    /// capability connections.
    pub fn for_claim(
        claim: ClaimInfo,
        records: Arc<dyn PolicyRecordSource>,
        search: Arc<dyn SemanticSearch>,
        discovery: Arc<dyn PriceDiscovery>,
        reasoning: Arc<dyn ReasoningCapability>,
        inflation_threshold: f64,
        results_per_query: usize,
    ) -> Self {
        let claim = Arc::new(claim);
        let mut registry = Self::new();
        registry.register(Box::new(ValidateClaimTool { claim: Arc::clone(&claim), records }));
        registry.register(Box::new(GeneratePolicyQueriesTool {
            claim: Arc::clone(&claim),
            reasoning: Arc::clone(&reasoning),
        }));
        registry.register(Box::new(RetrievePolicyTextTool { search, results_per_query }));
        registry.register(Box::new(EstimateRepairCostTool {
            claim: Arc::clone(&claim),
            discovery,
            inflation_threshold,
        }));
        registry.register(Box::new(GenerateRecommendationTool { claim, reasoning }));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn ClaimTool>) {
        self.tools.insert(tool.name(), tool);
    }

    /// Invoke a tool by name. An unknown name is an error value the
    /// runtime relays to the model as an observation, not a crash.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> anyhow::Result<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow!("unknown tool '{name}'. Available: {}", self.names().join(", ")))?;
        debug!(tool = name, "dispatching tool call");
        tool.execute(arguments).await
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.tools.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Renders `name: description` lines for the system prompt, in stable
    /// alphabetical order.
    pub fn describe_all(&self) -> String {
        let mut lines: Vec<String> = self
            .tools
            .values()
            .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
            .collect();
        lines.sort_unstable();
        lines.join("\n")
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

struct ValidateClaimTool {
    claim: Arc<ClaimInfo>,
    records: Arc<dyn PolicyRecordSource>,
}

#[async_trait]
impl ClaimTool for ValidateClaimTool {
    fn name(&self) -> &'static str {
        "validate_claim"
    }

    fn description(&self) -> &'static str {
        "Validate the claim against coverage records: policy existence, premium dues, \
         and the coverage date window. Takes no arguments. Returns {is_valid, reason}."
    }

    async fn execute(&self, _arguments: Value) -> anyhow::Result<Value> {
        let outcome = validation::validate_claim(&self.claim, self.records.as_ref()).await;
        serde_json::to_value(outcome).context("serializing validation outcome")
    }
}

struct GeneratePolicyQueriesTool {
    claim: Arc<ClaimInfo>,
    reasoning: Arc<dyn ReasoningCapability>,
}

#[async_trait]
impl ClaimTool for GeneratePolicyQueriesTool {
    fn name(&self) -> &'static str {
        "generate_policy_queries"
    }

    fn description(&self) -> &'static str {
        "Generate 3-5 targeted search queries for locating relevant policy sections. \
         Takes no arguments. Returns {queries: [string]}."
    }

    async fn execute(&self, _arguments: Value) -> anyhow::Result<Value> {
        let queries =
            recommendation::generate_policy_queries(&self.claim, self.reasoning.as_ref()).await?;
        serde_json::to_value(queries).context("serializing policy queries")
    }
}

#[derive(Deserialize)]
struct RetrieveArguments {
    queries: Vec<String>,
}

struct RetrievePolicyTextTool {
    search: Arc<dyn SemanticSearch>,
    results_per_query: usize,
}

#[async_trait]
impl ClaimTool for RetrievePolicyTextTool {
    fn name(&self) -> &'static str {
        "retrieve_policy_text"
    }

    fn description(&self) -> &'static str {
        "Retrieve relevant policy document passages for the given search queries. \
         Arguments: {queries: [string]}. Returns {chunks: [string]}."
    }

    async fn execute(&self, arguments: Value) -> anyhow::Result<Value> {
        let arguments: RetrieveArguments = serde_json::from_value(arguments)
            .context("retrieve_policy_text expects {\"queries\": [..]}")?;
        let chunks = retrieval::retrieve_policy_text(
            &arguments.queries,
            self.search.as_ref(),
            self.results_per_query,
        )
        .await?;
        Ok(json!({ "chunks": chunks }))
    }
}

struct EstimateRepairCostTool {
    claim: Arc<ClaimInfo>,
    discovery: Arc<dyn PriceDiscovery>,
    inflation_threshold: f64,
}

#[async_trait]
impl ClaimTool for EstimateRepairCostTool {
    fn name(&self) -> &'static str {
        "estimate_repair_cost"
    }

    fn description(&self) -> &'static str {
        "Compare the claimed repair cost against market prices from an external \
         search. Takes no arguments. Returns {market_estimate, is_inflated, summary}."
    }

    async fn execute(&self, _arguments: Value) -> anyhow::Result<Value> {
        let check = pricing::check_repair_cost(
            &self.claim,
            self.discovery.as_ref(),
            self.inflation_threshold,
        )
        .await;
        serde_json::to_value(check).context("serializing price check")
    }
}

#[derive(Deserialize)]
struct RecommendationArguments {
    #[serde(default)]
    policy_text: Option<String>,
    #[serde(default)]
    market_cost_info: Option<String>,
}

struct GenerateRecommendationTool {
    claim: Arc<ClaimInfo>,
    reasoning: Arc<dyn ReasoningCapability>,
}

#[async_trait]
impl ClaimTool for GenerateRecommendationTool {
    fn name(&self) -> &'static str {
        "generate_recommendation"
    }

    fn description(&self) -> &'static str {
        "Produce the coverage recommendation from the claim, retrieved policy text, \
         and the market cost summary. Arguments: {policy_text: string, \
         market_cost_info: string}. Returns {policy_section, recommendation_summary, \
         deductible, settlement_amount}."
    }

    async fn execute(&self, arguments: Value) -> anyhow::Result<Value> {
        let arguments: RecommendationArguments = serde_json::from_value(arguments)
            .context("generate_recommendation expects {\"policy_text\", \"market_cost_info\"}")?;
        let recommendation = recommendation::generate_recommendation(
            &self.claim,
            arguments.policy_text.as_deref().unwrap_or("No policy text available."),
            arguments.market_cost_info.as_deref().unwrap_or("No market cost data."),
            self.reasoning.as_ref(),
        )
        .await?;
        serde_json::to_value(recommendation).context("serializing recommendation")
    }
}
