//! Three-tier recovery of a `ClaimDecision` from the agent's free-form
//! final answer. Each tier is attempted only if the prior one fails, and
//! the pipeline always returns a decision: failure is recorded in the
//! notes field, never thrown.

use regex::Regex;
use tracing::warn;

use claimflow_core::json_text;
use claimflow_core::ClaimDecision;

/// How many characters of raw agent output are quoted in the fallback
/// decision for operator diagnosis.
const RAW_EXCERPT_CHARS: usize = 300;

/// Sentinel note applied when fuzzy recovery found no notes text.
pub const FUZZY_RECOVERY_NOTE: &str = "Recovered from agent output via fuzzy field matching.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryTier {
    /// A JSON object parsed cleanly against the decision schema.
    Direct,
    /// Individual fields pattern-matched out of the text.
    Fuzzy,
    /// Nothing usable; a synthesized rejection decision.
    Fallback,
}

impl RecoveryTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Fuzzy => "fuzzy",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Clone, Debug)]
pub struct RecoveredDecision {
    pub decision: ClaimDecision,
    pub tier: RecoveryTier,
}

/// Recover a decision for `claim_number` from `raw` agent output. The
/// returned decision always carries `claim_number`, regardless of what
/// the model wrote.
pub fn recover_decision(raw: &str, claim_number: &str) -> RecoveredDecision {
    if let Some(mut decision) = direct_extraction(raw) {
        decision.claim_number = claim_number.to_string();
        return RecoveredDecision { decision, tier: RecoveryTier::Direct };
    }

    if let Some(decision) = fuzzy_extraction(raw, claim_number) {
        warn!(%claim_number, "agent output recovered via fuzzy field matching");
        return RecoveredDecision { decision, tier: RecoveryTier::Fuzzy };
    }

    warn!(%claim_number, "agent output unrecoverable, synthesizing fallback decision");
    RecoveredDecision { decision: fallback_decision(raw, claim_number), tier: RecoveryTier::Fallback }
}

/// Tier 1: a fenced code block or the first balanced brace object,
/// parsed against the decision schema. Negative amounts fail the schema
/// the same way missing required fields do.
fn direct_extraction(raw: &str) -> Option<ClaimDecision> {
    let candidate = json_text::first_json_object(raw)?;
    let decision: ClaimDecision = serde_json::from_str(candidate).ok()?;
    (decision.deductible >= 0.0 && decision.recommended_payout >= 0.0).then_some(decision)
}

/// Tier 2: match each scalar field independently anywhere in the text.
/// Partial success is accepted; unmatched fields get safe defaults.
/// Returns `None` only when not a single field was found.
fn fuzzy_extraction(raw: &str, claim_number: &str) -> Option<ClaimDecision> {
    let covered_pattern =
        Regex::new(r#"(?i)"covered"\s*:\s*(true|false)"#).expect("static pattern compiles");
    let deductible_pattern =
        Regex::new(r#""deductible"\s*:\s*([\d.]+)"#).expect("static pattern compiles");
    let payout_pattern =
        Regex::new(r#""recommended_payout"\s*:\s*([\d.]+)"#).expect("static pattern compiles");
    let notes_pattern =
        Regex::new(r#""notes"\s*:\s*"([^"]*)""#).expect("static pattern compiles");

    let covered = covered_pattern
        .captures(raw)
        .map(|capture| capture[1].eq_ignore_ascii_case("true"));
    let deductible = deductible_pattern
        .captures(raw)
        .and_then(|capture| capture[1].parse::<f64>().ok());
    let payout = payout_pattern
        .captures(raw)
        .and_then(|capture| capture[1].parse::<f64>().ok());
    let notes = notes_pattern.captures(raw).map(|capture| capture[1].to_string());

    let any_field_found =
        covered.is_some() || deductible.is_some() || payout.is_some() || notes.is_some();
    if !any_field_found {
        return None;
    }

    Some(ClaimDecision {
        claim_number: claim_number.to_string(),
        covered: covered.unwrap_or(false),
        deductible: deductible.unwrap_or(0.0),
        recommended_payout: payout.unwrap_or(0.0),
        notes: Some(notes.unwrap_or_else(|| FUZZY_RECOVERY_NOTE.to_string())),
    })
}

/// Tier 3: a synthesized rejection carrying a bounded excerpt of the raw
/// output so an operator can diagnose the failure.
fn fallback_decision(raw: &str, claim_number: &str) -> ClaimDecision {
    let excerpt: String = raw.chars().take(RAW_EXCERPT_CHARS).collect();
    ClaimDecision::rejection(
        claim_number,
        format!("Agent output could not be recovered into a valid decision. Raw: {excerpt}"),
    )
}
