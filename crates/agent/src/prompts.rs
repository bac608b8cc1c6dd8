//! Prompt construction for the autonomous adapter. The system prompt is
//! the only place the processing order is stated, so it is deliberately
//! strict: the model picks tools, but the order and the early exits are
//! spelled out as rules, not suggestions.

use serde_json::json;

use claimflow_core::ClaimInfo;

use crate::tools::ToolRegistry;

const PROCESS_RULES: &str = "\
You are an autonomous insurance claim processor. You decide which tool to call \
next, but you MUST follow this exact procedure:\n\
1. Call validate_claim first.\n\
   - If the result has is_valid = false, STOP immediately: produce a final \
     decision with covered = false and the validation reason in the notes. Do \
     not call any other tool.\n\
2. Call generate_policy_queries.\n\
3. Call retrieve_policy_text with those queries.\n\
4. Call estimate_repair_cost.\n\
   - If the result has is_inflated = true, STOP immediately: produce a final \
     decision with covered = false and the price summary in the notes. Do not \
     call generate_recommendation.\n\
5. Call generate_recommendation with the retrieved policy text and the price \
   summary.\n\
6. Produce the final decision from the recommendation.\n\
Never skip a step, never repeat a completed step, and never invent tool \
results.";

const CALL_PROTOCOL: &str = "\
To call a tool, reply with exactly one JSON object and nothing else:\n\
{\"tool\": \"<tool name>\", \"arguments\": { ... }}\n\
Tools that take no arguments still require an arguments object; pass {}.\n\
After each call you will receive an observation with the tool's result.\n\
When you are ready to finish, reply WITHOUT a tool call: output only the final \
decision as a JSON object with keys claim_number (string), covered (boolean), \
deductible (number), recommended_payout (number), and notes (string).";

/// Full system prompt: rules, call protocol, and the tool catalogue.
pub fn system_prompt(registry: &ToolRegistry) -> String {
    format!(
        "{PROCESS_RULES}\n\n{CALL_PROTOCOL}\n\nAvailable tools:\n{}",
        registry.describe_all()
    )
}

/// Opening task message carrying the claim under review.
pub fn task_prompt(claim: &ClaimInfo) -> String {
    let claim_json = json!({
        "claim_number": claim.claim_number,
        "policy_number": claim.policy_number,
        "claimant_name": claim.claimant_name,
        "date_of_loss": claim.date_of_loss.to_string(),
        "loss_description": claim.loss_description,
        "estimated_repair_cost": claim.estimated_repair_cost,
        "vehicle_details": claim.vehicle_details,
    });
    format!(
        "Process the following insurance claim and produce a coverage decision.\n\n\
         Claim:\n{claim_json:#}\n\nBegin with step 1.",
    )
}
