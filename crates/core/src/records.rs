//! File-backed policy record source reading `coverage_data.csv`.
//!
//! Expected columns: `policy_number,premium_dues_remaining,
//! coverage_start_date,coverage_end_date`. Dates are ISO-8601; the dues
//! column holds a `True`/`False` literal. The file is read per lookup so
//! operators can swap records without a restart.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::capabilities::{PolicyRecord, PolicyRecordSource, RecordSourceError};

#[derive(Clone, Debug)]
pub struct CsvPolicyRecords {
    path: PathBuf,
}

impl CsvPolicyRecords {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<PolicyRecord>, RecordSourceError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|_| {
            RecordSourceError::Unavailable(format!(
                "coverage data file not found: {}",
                self.path.display()
            ))
        })?;

        let mut lines = raw.lines().filter(|line| !line.trim().is_empty());
        let header = lines.next().ok_or_else(|| {
            RecordSourceError::Malformed("coverage data file has no header row".to_string())
        })?;
        let columns = parse_header(header)?;

        let mut records = Vec::new();
        for (index, line) in lines.enumerate() {
            records.push(parse_row(line, &columns).map_err(|reason| {
                RecordSourceError::Malformed(format!("row {}: {reason}", index + 2))
            })?);
        }
        Ok(records)
    }
}

#[async_trait]
impl PolicyRecordSource for CsvPolicyRecords {
    async fn lookup(
        &self,
        policy_number: &str,
    ) -> Result<Option<PolicyRecord>, RecordSourceError> {
        let records = self.load()?;
        Ok(records.into_iter().find(|record| record.policy_number == policy_number))
    }
}

struct ColumnIndexes {
    policy_number: usize,
    dues_remaining: usize,
    coverage_start: usize,
    coverage_end: usize,
}

fn parse_header(header: &str) -> Result<ColumnIndexes, RecordSourceError> {
    let names: Vec<&str> = header.split(',').map(str::trim).collect();
    let find = |name: &str| {
        names.iter().position(|candidate| *candidate == name).ok_or_else(|| {
            RecordSourceError::Malformed(format!("missing required column `{name}`"))
        })
    };

    Ok(ColumnIndexes {
        policy_number: find("policy_number")?,
        dues_remaining: find("premium_dues_remaining")?,
        coverage_start: find("coverage_start_date")?,
        coverage_end: find("coverage_end_date")?,
    })
}

fn parse_row(line: &str, columns: &ColumnIndexes) -> Result<PolicyRecord, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let field = |index: usize| {
        fields.get(index).copied().ok_or_else(|| format!("expected at least {} columns", index + 1))
    };

    let policy_number = field(columns.policy_number)?.to_string();
    // Records store the flag as a "True"/"False" string literal.
    let dues_outstanding = field(columns.dues_remaining)?.eq_ignore_ascii_case("true");
    let coverage_start = parse_date(field(columns.coverage_start)?)?;
    let coverage_end = parse_date(field(columns.coverage_end)?)?;

    Ok(PolicyRecord { policy_number, dues_outstanding, coverage_start, coverage_end })
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid ISO date `{value}`"))
}
