use serde::{Deserialize, Serialize};

/// Search queries generated from claim details for policy retrieval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyQueries {
    pub queries: Vec<String>,
}

impl PolicyQueries {
    pub const MIN_QUERIES: usize = 1;
    pub const MAX_QUERIES: usize = 10;

    pub fn new(queries: Vec<String>) -> Result<Self, String> {
        if queries.len() < Self::MIN_QUERIES || queries.len() > Self::MAX_QUERIES {
            return Err(format!(
                "expected between {} and {} queries, got {}",
                Self::MIN_QUERIES,
                Self::MAX_QUERIES,
                queries.len()
            ));
        }
        Ok(Self { queries })
    }
}

/// Coverage recommendation produced by the reasoning capability. Absent
/// optional fields mean "not determined", not zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecommendation {
    /// The policy section that applies to this claim.
    pub policy_section: String,
    /// Human-readable summary of the coverage recommendation.
    pub recommendation_summary: String,
    #[serde(default)]
    pub deductible: Option<f64>,
    #[serde(default)]
    pub settlement_amount: Option<f64>,
}

impl PolicyRecommendation {
    /// Structural check only; business correctness is the reasoning
    /// capability's responsibility.
    pub fn validate_shape(&self) -> Result<(), String> {
        if let Some(deductible) = self.deductible {
            if deductible < 0.0 {
                return Err(format!("deductible must be non-negative, got {deductible}"));
            }
        }
        if let Some(settlement) = self.settlement_amount {
            if settlement < 0.0 {
                return Err(format!("settlement_amount must be non-negative, got {settlement}"));
            }
        }
        Ok(())
    }
}
