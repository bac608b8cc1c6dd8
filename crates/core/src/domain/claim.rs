use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Incoming claim payload. Created once at the workflow boundary and never
/// mutated after that.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClaimInfo {
    /// Unique claim identifier (e.g. CLM-001).
    pub claim_number: String,
    /// Policy number to validate against records.
    pub policy_number: String,
    pub claimant_name: String,
    /// Date the loss / incident occurred.
    pub date_of_loss: NaiveDate,
    /// Free-text description of the loss event.
    pub loss_description: String,
    /// Claimant's estimated repair cost in USD. Must be positive.
    pub estimated_repair_cost: f64,
    /// Vehicle make/model/year, when known.
    #[serde(default)]
    pub vehicle_details: Option<String>,
}

impl ClaimInfo {
    /// Boundary check for a freshly deserialized claim.
    pub fn validate_shape(&self) -> Result<(), String> {
        if self.claim_number.trim().is_empty() {
            return Err("claim_number must not be empty".to_string());
        }
        if self.policy_number.trim().is_empty() {
            return Err("policy_number must not be empty".to_string());
        }
        if self.estimated_repair_cost <= 0.0 {
            return Err(format!(
                "estimated_repair_cost must be positive, got {}",
                self.estimated_repair_cost
            ));
        }
        Ok(())
    }
}

/// Final coverage decision returned to the caller. Immutable once
/// constructed; exactly one is produced per claim per run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClaimDecision {
    pub claim_number: String,
    pub covered: bool,
    /// Applicable deductible amount in USD.
    #[serde(default)]
    pub deductible: f64,
    /// Recommended settlement payout in USD.
    #[serde(default)]
    pub recommended_payout: f64,
    /// Explanatory notes: rejection reason, coverage details, and the
    /// rendered processing trace.
    #[serde(default)]
    pub notes: Option<String>,
}

impl ClaimDecision {
    pub fn rejection(claim_number: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            claim_number: claim_number.into(),
            covered: false,
            deductible: 0.0,
            recommended_payout: 0.0,
            notes: Some(notes.into()),
        }
    }
}

/// Deterministic rule-check verdict for a claim against policy records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub reason: String,
}

impl ValidationOutcome {
    /// Stable sentinel literal for the success path, so callers can branch
    /// on the exact string or on `is_valid` alone.
    pub const VALID_REASON: &'static str = "valid";

    pub fn valid() -> Self {
        Self { is_valid: true, reason: Self::VALID_REASON.to_string() }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self { is_valid: false, reason: reason.into() }
    }
}

/// Outcome of the market price sanity check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceCheck {
    /// Mean of plausible amounts extracted from search results. Absent when
    /// no external data was usable; never fabricated.
    pub market_estimate: Option<f64>,
    /// True only when a market estimate exists and the claimed cost exceeds
    /// `estimate * (1 + threshold)`. "No data" and "not inflated" route
    /// identically.
    pub is_inflated: bool,
    /// Human-readable comparison summary.
    pub summary: String,
}

impl PriceCheck {
    pub fn skipped(summary: impl Into<String>) -> Self {
        Self { market_estimate: None, is_inflated: false, summary: summary.into() }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{ClaimDecision, ClaimInfo, ValidationOutcome};

    fn claim_fixture() -> ClaimInfo {
        ClaimInfo {
            claim_number: "CLM-001".to_string(),
            policy_number: "PN-2".to_string(),
            claimant_name: "Jane Doe".to_string(),
            date_of_loss: NaiveDate::from_ymd_opt(2026, 2, 15).expect("valid date"),
            loss_description: "Rear-end collision, bumper damage".to_string(),
            estimated_repair_cost: 3500.0,
            vehicle_details: Some("2022 Toyota Camry".to_string()),
        }
    }

    #[test]
    fn well_formed_claim_passes_shape_check() {
        assert!(claim_fixture().validate_shape().is_ok());
    }

    #[test]
    fn non_positive_repair_cost_is_rejected_at_the_boundary() {
        let mut claim = claim_fixture();
        claim.estimated_repair_cost = 0.0;
        let error = claim.validate_shape().expect_err("zero cost must fail");
        assert!(error.contains("estimated_repair_cost"));
    }

    #[test]
    fn decision_deserializes_with_defaulted_amounts() {
        let decision: ClaimDecision =
            serde_json::from_str(r#"{"claim_number":"CLM-9","covered":true}"#)
                .expect("partial decision JSON should deserialize");
        assert!(decision.covered);
        assert_eq!(decision.deductible, 0.0);
        assert_eq!(decision.recommended_payout, 0.0);
        assert!(decision.notes.is_none());
    }

    #[test]
    fn validation_success_uses_the_sentinel_reason() {
        assert_eq!(ValidationOutcome::valid().reason, ValidationOutcome::VALID_REASON);
    }
}
