//! Reasoning-backed stages: policy query generation and the coverage
//! recommendation. The engine treats the reasoning capability as a black
//! box and only enforces structural conformance of its replies.

use serde::de::DeserializeOwned;
use tracing::info;

use crate::capabilities::{ReasoningCapability, ReasoningError};
use crate::domain::claim::ClaimInfo;
use crate::domain::policy::{PolicyQueries, PolicyRecommendation};

const QUERY_GENERATION_INSTRUCTION: &str = "You are an expert insurance claims analyst. \
Given a claim's details, generate 3 to 5 targeted search queries that would help locate \
the most relevant sections of an auto insurance policy document.\n\
Focus on:\n\
- The type of coverage applicable (collision, comprehensive, liability, etc.)\n\
- Deductible and limit clauses\n\
- Exclusions or endorsements that might apply\n\
- Conditions for claim validity\n\
Return your answer as a JSON object with a single key 'queries' containing a list of \
query strings.";

const RECOMMENDATION_INSTRUCTION: &str = "You are a senior insurance underwriter. Based on \
the claim details, the relevant policy text retrieved from the insurance document, and the \
market repair cost estimate, determine:\n\
1. Whether the collision/loss is covered under the policy.\n\
2. The applicable policy section.\n\
3. The deductible amount (if any).\n\
4. The recommended settlement amount.\n\
Provide a concise recommendation summary explaining your reasoning.\n\
Return your answer as a JSON object with keys: 'policy_section', \
'recommendation_summary', 'deductible', 'settlement_amount'.";

fn claim_details_block(claim: &ClaimInfo) -> String {
    format!(
        "Claim Number: {}\nPolicy Number: {}\nDate of Loss: {}\nLoss Description: {}\n\
         Estimated Repair Cost: ${:.2}\nVehicle: {}",
        claim.claim_number,
        claim.policy_number,
        claim.date_of_loss,
        claim.loss_description,
        claim.estimated_repair_cost,
        claim.vehicle_details.as_deref().unwrap_or("N/A"),
    )
}

/// Ask the reasoning capability for 3-5 targeted policy search queries.
pub async fn generate_policy_queries<R>(
    claim: &ClaimInfo,
    reasoning: &R,
) -> Result<PolicyQueries, ReasoningError>
where
    R: ReasoningCapability + ?Sized,
{
    let prompt = format!(
        "{QUERY_GENERATION_INSTRUCTION}\n\nClaim details:\n{}\n\nGenerate the search queries now.",
        claim_details_block(claim)
    );

    let reply = reasoning.complete(&prompt).await?;
    let parsed: PolicyQueries = parse_structured_reply(&reply)?;
    let queries = PolicyQueries::new(parsed.queries).map_err(ReasoningError::SchemaMismatch)?;

    info!(
        claim_number = %claim.claim_number,
        query_count = queries.queries.len(),
        "generated policy queries"
    );
    Ok(queries)
}

/// Ask the reasoning capability for a coverage recommendation given the
/// claim, retrieved policy text, and the price-check summary.
pub async fn generate_recommendation<R>(
    claim: &ClaimInfo,
    policy_text: &str,
    market_cost_info: &str,
    reasoning: &R,
) -> Result<PolicyRecommendation, ReasoningError>
where
    R: ReasoningCapability + ?Sized,
{
    let prompt = format!(
        "{RECOMMENDATION_INSTRUCTION}\n\n== CLAIM DETAILS ==\n{}\n\n\
         == RELEVANT POLICY TEXT ==\n{policy_text}\n\n\
         == MARKET REPAIR COST ESTIMATE ==\n{market_cost_info}\n\n\
         Provide your coverage recommendation now.",
        claim_details_block(claim)
    );

    let reply = reasoning.complete(&prompt).await?;
    let recommendation: PolicyRecommendation = parse_structured_reply(&reply)?;
    recommendation.validate_shape().map_err(ReasoningError::SchemaMismatch)?;

    info!(
        claim_number = %claim.claim_number,
        policy_section = %recommendation.policy_section,
        "generated coverage recommendation"
    );
    Ok(recommendation)
}

/// Deserialize a JSON object out of a model reply, tolerating markdown
/// fences and surrounding prose.
pub fn parse_structured_reply<T>(reply: &str) -> Result<T, ReasoningError>
where
    T: DeserializeOwned,
{
    let candidate = crate::json_text::first_json_object(reply).unwrap_or(reply);
    serde_json::from_str(candidate).map_err(|error| {
        ReasoningError::SchemaMismatch(format!("could not parse reply as JSON: {error}"))
    })
}
