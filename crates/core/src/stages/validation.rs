//! Coverage validation: deterministic rule check of a claim against the
//! policy record source. Checks run in strict order and short-circuit on
//! the first failure.

use tracing::{info, warn};

use crate::capabilities::{PolicyRecordSource, RecordSourceError};
use crate::domain::claim::{ClaimInfo, ValidationOutcome};

/// Validate `claim` against the record source.
///
/// Order of checks:
/// 1. Policy number exists in the records.
/// 2. No outstanding premium dues on that policy.
/// 3. Date of loss lies within the coverage period, inclusive on both ends.
///
/// A failure to load the record source itself is reported as invalid with
/// a reason that names the source, so callers can tell "source unavailable"
/// apart from "policy not found".
pub async fn validate_claim<S>(claim: &ClaimInfo, records: &S) -> ValidationOutcome
where
    S: PolicyRecordSource + ?Sized,
{
    let record = match records.lookup(&claim.policy_number).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            let reason = format!("Policy {} not found in records", claim.policy_number);
            warn!(claim_number = %claim.claim_number, %reason, "claim validation failed");
            return ValidationOutcome::invalid(reason);
        }
        Err(RecordSourceError::Unavailable(message))
        | Err(RecordSourceError::Malformed(message)) => {
            warn!(claim_number = %claim.claim_number, reason = %message, "record source failure");
            return ValidationOutcome::invalid(message);
        }
    };

    if record.dues_outstanding {
        let reason = format!(
            "Policy {} has outstanding premium dues, claim cannot be processed",
            claim.policy_number
        );
        warn!(claim_number = %claim.claim_number, %reason, "claim validation failed");
        return ValidationOutcome::invalid(reason);
    }

    if claim.date_of_loss < record.coverage_start || claim.date_of_loss > record.coverage_end {
        let reason = format!(
            "Date of loss {} is outside the coverage period ({} to {}) for policy {}",
            claim.date_of_loss, record.coverage_start, record.coverage_end, claim.policy_number
        );
        warn!(claim_number = %claim.claim_number, %reason, "claim validation failed");
        return ValidationOutcome::invalid(reason);
    }

    info!(
        claim_number = %claim.claim_number,
        policy_number = %claim.policy_number,
        "claim passed validation"
    );
    ValidationOutcome::valid()
}
