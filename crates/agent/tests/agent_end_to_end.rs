//! End-to-end runs of the autonomous adapter against a scripted reasoning
//! backend. The script answers the nested stage prompts by keyword and
//! plays back agent-level replies in order, so each test controls the
//! whole tool-calling conversation.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use claimflow_core::assembler::TRACE_SEPARATOR;
use claimflow_core::{
    ClaimInfo, EngineError, PolicyRecord, PolicyRecordSource, PriceDiscovery, PriceDiscoveryError,
    ReasoningCapability, ReasoningError, RecordSourceError, SearchError, SemanticSearch,
};

use claimflow_agent::{AdapterSettings, AutonomousAdapter};

struct MockRecords {
    dues_outstanding: bool,
}

#[async_trait]
impl PolicyRecordSource for MockRecords {
    async fn lookup(
        &self,
        policy_number: &str,
    ) -> Result<Option<PolicyRecord>, RecordSourceError> {
        Ok(Some(PolicyRecord {
            policy_number: policy_number.to_string(),
            dues_outstanding: self.dues_outstanding,
            coverage_start: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
            coverage_end: NaiveDate::from_ymd_opt(2026, 12, 31).expect("valid date"),
        }))
    }
}

struct MockSearch;

#[async_trait]
impl SemanticSearch for MockSearch {
    async fn query(&self, _text: &str, limit: usize) -> Result<Vec<String>, SearchError> {
        let mut snippets = vec![
            "Section III: Collision coverage applies to impact with another vehicle.".to_string(),
        ];
        snippets.truncate(limit);
        Ok(snippets)
    }
}

struct MockDiscovery;

#[async_trait]
impl PriceDiscovery for MockDiscovery {
    async fn search(&self, _query: &str) -> Result<Vec<String>, PriceDiscoveryError> {
        Ok(vec![
            "Most shops quote $1,000 for this repair".to_string(),
            "Parts and labor around $1,200".to_string(),
        ])
    }
}

/// Answers the stage-internal prompts by their closing instruction and
/// plays back agent-level replies from a queue.
struct ScriptedReasoning {
    agent_replies: Mutex<VecDeque<String>>,
}

impl ScriptedReasoning {
    fn new(replies: Vec<&str>) -> Self {
        Self {
            agent_replies: Mutex::new(replies.into_iter().map(String::from).collect()),
        }
    }
}

#[async_trait]
impl ReasoningCapability for ScriptedReasoning {
    async fn complete(&self, prompt: &str) -> Result<String, ReasoningError> {
        if prompt.contains("Generate the search queries now") {
            return Ok(r#"{"queries":["collision coverage","deductible clauses","claim validity"]}"#.to_string());
        }
        if prompt.contains("Provide your coverage recommendation now") {
            return Ok(r#"{"policy_section":"Section III - Collision","recommendation_summary":"Covered under collision; standard deductible applies.","deductible":500.0,"settlement_amount":3000.0}"#.to_string());
        }
        self.agent_replies
            .lock()
            .map_err(|_| ReasoningError::RequestFailed("script lock poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| ReasoningError::RequestFailed("script exhausted".to_string()))
    }
}

fn claim() -> ClaimInfo {
    ClaimInfo {
        claim_number: "CLM-001".to_string(),
        policy_number: "PN-2".to_string(),
        claimant_name: "Jane Doe".to_string(),
        date_of_loss: NaiveDate::from_ymd_opt(2026, 2, 15).expect("valid date"),
        loss_description: "Rear-end collision at intersection".to_string(),
        estimated_repair_cost: 1300.0,
        vehicle_details: Some("2022 Toyota Camry".to_string()),
    }
}

fn adapter(
    records: MockRecords,
    reasoning: ScriptedReasoning,
    settings: AdapterSettings,
) -> AutonomousAdapter {
    AutonomousAdapter::new(
        Arc::new(records),
        Arc::new(MockSearch),
        Arc::new(MockDiscovery),
        Arc::new(reasoning),
        settings,
    )
}

#[tokio::test]
async fn full_tool_sequence_produces_a_covered_decision() {
    let reasoning = ScriptedReasoning::new(vec![
        r#"{"tool": "validate_claim", "arguments": {}}"#,
        r#"{"tool": "generate_policy_queries", "arguments": {}}"#,
        r#"{"tool": "retrieve_policy_text", "arguments": {"queries": ["collision coverage"]}}"#,
        r#"{"tool": "estimate_repair_cost", "arguments": {}}"#,
        r#"{"tool": "generate_recommendation", "arguments": {"policy_text": "Section III", "market_cost_info": "Market estimate: $1,100"}}"#,
        "Final decision:\n```json\n{\"claim_number\":\"CLM-001\",\"covered\":true,\"deductible\":500.0,\"recommended_payout\":3000.0,\"notes\":\"Covered under collision.\"}\n```",
    ]);
    let adapter = adapter(
        MockRecords { dues_outstanding: false },
        reasoning,
        AdapterSettings::default(),
    );

    let outcome = adapter.process_claim(claim()).await.expect("run should complete");
    let decision = outcome.decision;

    assert!(decision.covered);
    assert_eq!(decision.deductible, 500.0);
    assert_eq!(decision.recommended_payout, 3000.0);

    let notes = decision.notes.expect("notes should carry the trace");
    assert!(notes.contains(TRACE_SEPARATOR));
    assert!(notes.contains("Covered under collision."));

    let stages: Vec<&str> = outcome.trace.iter().map(|entry| entry.stage.as_str()).collect();
    assert_eq!(
        stages,
        vec![
            "validate_claim",
            "generate_policy_queries",
            "retrieve_policy_text",
            "estimate_repair_cost",
            "generate_recommendation",
            "recover_decision",
        ]
    );
    let final_entry = outcome.trace.last().expect("trace not empty");
    assert!(final_entry
        .annotations
        .iter()
        .any(|(key, value)| key == "tier" && value == "direct"));
}

#[tokio::test]
async fn invalid_claim_exits_early_with_fuzzy_recovery() {
    let reasoning = ScriptedReasoning::new(vec![
        r#"{"tool": "validate_claim", "arguments": {}}"#,
        r#"The policy has outstanding dues, so "covered": false is my decision."#,
    ]);
    let adapter = adapter(
        MockRecords { dues_outstanding: true },
        reasoning,
        AdapterSettings::default(),
    );

    let outcome = adapter.process_claim(claim()).await.expect("run should complete");
    assert!(!outcome.decision.covered);
    assert_eq!(outcome.decision.recommended_payout, 0.0);

    let stages: Vec<&str> = outcome.trace.iter().map(|entry| entry.stage.as_str()).collect();
    assert_eq!(stages, vec!["validate_claim", "recover_decision"]);
    assert!(outcome
        .trace
        .last()
        .expect("trace not empty")
        .annotations
        .iter()
        .any(|(key, value)| key == "tier" && value == "fuzzy"));
}

#[tokio::test]
async fn structureless_final_answer_degrades_to_fallback_rejection() {
    let reasoning = ScriptedReasoning::new(vec![
        r#"{"tool": "validate_claim", "arguments": {}}"#,
        "Everything checks out, ship it.",
    ]);
    let adapter = adapter(
        MockRecords { dues_outstanding: false },
        reasoning,
        AdapterSettings::default(),
    );

    let outcome = adapter.process_claim(claim()).await.expect("run should complete");
    assert!(!outcome.decision.covered);
    let notes = outcome.decision.notes.expect("notes");
    assert!(notes.contains("could not be recovered"));
    assert!(notes.contains("Everything checks out"));
}

#[tokio::test]
async fn decision_claim_number_is_pinned_to_the_input_claim() {
    let reasoning = ScriptedReasoning::new(vec![
        r#"{"claim_number":"SOMETHING-ELSE","covered":true,"deductible":100.0,"recommended_payout":800.0,"notes":"ok"}"#,
    ]);
    let adapter = adapter(
        MockRecords { dues_outstanding: false },
        reasoning,
        AdapterSettings::default(),
    );

    let outcome = adapter.process_claim(claim()).await.expect("run should complete");
    assert_eq!(outcome.decision.claim_number, "CLM-001");
}

#[tokio::test]
async fn failed_tool_call_is_relayed_not_fatal() {
    let reasoning = ScriptedReasoning::new(vec![
        r#"{"tool": "retrieve_policy_text", "arguments": {"wrong": "shape"}}"#,
        r#"{"claim_number":"CLM-001","covered":false,"notes":"Could not retrieve policy text."}"#,
    ]);
    let adapter = adapter(
        MockRecords { dues_outstanding: false },
        reasoning,
        AdapterSettings::default(),
    );

    let outcome = adapter.process_claim(claim()).await.expect("run should complete");
    let first = outcome.trace.first().expect("trace not empty");
    assert_eq!(first.stage, "retrieve_policy_text");
    assert!(first.annotations.iter().any(|(key, value)| key == "ok" && value == "false"));
    assert!(!outcome.decision.covered);
}

#[tokio::test]
async fn exhausted_step_budget_aborts_the_run() {
    let reasoning = ScriptedReasoning::new(vec![
        r#"{"tool": "validate_claim", "arguments": {}}"#,
        r#"{"tool": "validate_claim", "arguments": {}}"#,
        r#"{"tool": "validate_claim", "arguments": {}}"#,
    ]);
    let adapter = adapter(
        MockRecords { dues_outstanding: false },
        reasoning,
        AdapterSettings { max_steps: 3, ..AdapterSettings::default() },
    );

    let error = adapter.process_claim(claim()).await.expect_err("budget must abort");
    assert!(matches!(error, EngineError::BudgetExceeded { limit: 3 }));
}

#[tokio::test]
async fn reasoning_transport_failure_aborts_the_run() {
    // Empty script: the very first reasoning round fails.
    let reasoning = ScriptedReasoning::new(Vec::new());
    let adapter = adapter(
        MockRecords { dues_outstanding: false },
        reasoning,
        AdapterSettings::default(),
    );

    let error = adapter.process_claim(claim()).await.expect_err("transport failure must abort");
    assert!(matches!(error, EngineError::Reasoning(_)));
}
