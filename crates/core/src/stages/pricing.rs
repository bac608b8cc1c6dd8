//! Market price sanity check. Delegates to an unreliable external price
//! discovery capability, extracts dollar amounts from whatever free text
//! comes back, and compares the claimed cost against the mean.

use regex::Regex;
use tracing::{info, warn};

use crate::capabilities::PriceDiscovery;
use crate::domain::claim::{ClaimInfo, PriceCheck};

/// Amounts below this are treated as noise (page counts, ratings).
const MIN_PLAUSIBLE_AMOUNT: f64 = 50.0;
/// Amounts above this are treated as noise (vehicle prices, ad copy).
const MAX_PLAUSIBLE_AMOUNT: f64 = 200_000.0;

/// Compare the claimed repair cost against an externally sourced market
/// estimate. `inflation_threshold` is a fraction: 0.40 flags claims more
/// than 40% above the mean market amount.
///
/// Discovery failure and "no usable amounts" both degrade to a skipped
/// check: estimate absent, `is_inflated` false. The workflow treats "no
/// data" and "not inflated" identically for routing; an estimate is never
/// fabricated.
pub async fn check_repair_cost<P>(
    claim: &ClaimInfo,
    discovery: &P,
    inflation_threshold: f64,
) -> PriceCheck
where
    P: PriceDiscovery + ?Sized,
{
    let query = format!(
        "average auto repair cost {} {} USD",
        claim.loss_description,
        claim.vehicle_details.as_deref().unwrap_or("")
    );
    info!(claim_number = %claim.claim_number, %query, "searching market repair costs");

    let snippets = match discovery.search(&query).await {
        Ok(snippets) => snippets,
        Err(error) => {
            warn!(claim_number = %claim.claim_number, %error, "price discovery failed");
            return PriceCheck::skipped(format!(
                "Web search unavailable ({error}). Price check skipped."
            ));
        }
    };

    if snippets.is_empty() {
        return PriceCheck::skipped("No web search results found. Price check skipped.");
    }

    let combined = snippets.join("\n");
    let amounts = extract_dollar_amounts(&combined);
    if amounts.is_empty() {
        return PriceCheck::skipped(
            "Web search returned results but no clear dollar estimates. Price check skipped.",
        );
    }

    let market_estimate = amounts.iter().sum::<f64>() / amounts.len() as f64;
    let threshold_amount = market_estimate * (1.0 + inflation_threshold);
    let is_inflated = claim.estimated_repair_cost > threshold_amount;

    let verdict = if is_inflated {
        "INFLATED, claimed cost exceeds threshold."
    } else {
        "Within acceptable range."
    };
    let summary = format!(
        "Market estimate: ${market_estimate:.2} (based on {} data points). \
         Claimed: ${:.2}. Threshold ({}% above market): ${threshold_amount:.2}. {verdict}",
        amounts.len(),
        claim.estimated_repair_cost,
        (inflation_threshold * 100.0).round() as i64,
    );
    info!(claim_number = %claim.claim_number, %summary, "price check complete");

    PriceCheck { market_estimate: Some(market_estimate), is_inflated, summary }
}

/// Extract dollar amounts like `$1,234.56` from free text, keeping only
/// values inside the plausibility band.
pub fn extract_dollar_amounts(text: &str) -> Vec<f64> {
    let pattern = Regex::new(r"\$\s?([\d,]+(?:\.\d{1,2})?)").expect("static pattern compiles");
    pattern
        .captures_iter(text)
        .filter_map(|capture| capture[1].replace(',', "").parse::<f64>().ok())
        .filter(|amount| (MIN_PLAUSIBLE_AMOUNT..=MAX_PLAUSIBLE_AMOUNT).contains(amount))
        .collect()
}
