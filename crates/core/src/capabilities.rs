//! Abstract contracts for the four external capabilities the workflow
//! depends on. Concrete backends live at the binary edge; tests use mocks.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// One policy row from the coverage records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyRecord {
    pub policy_number: String,
    pub dues_outstanding: bool,
    pub coverage_start: NaiveDate,
    pub coverage_end: NaiveDate,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RecordSourceError {
    /// The record source itself could not be loaded. Distinct from
    /// "policy not found", which is `Ok(None)` from `lookup`.
    #[error("coverage record source unavailable: {0}")]
    Unavailable(String),
    #[error("coverage record is malformed: {0}")]
    Malformed(String),
}

/// Lookup of policy coverage records.
#[async_trait]
pub trait PolicyRecordSource: Send + Sync {
    async fn lookup(&self, policy_number: &str)
        -> Result<Option<PolicyRecord>, RecordSourceError>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    /// The corpus store cannot be reached at all. A fatal configuration
    /// failure, unlike an empty corpus.
    #[error("policy corpus store unreachable: {0}")]
    StoreUnreachable(String),
    #[error("semantic search query failed: {0}")]
    QueryFailed(String),
}

/// Ranked snippet retrieval over the policy document corpus.
#[async_trait]
pub trait SemanticSearch: Send + Sync {
    /// Returns up to `limit` snippets ranked by relevance to `text`.
    async fn query(&self, text: &str, limit: usize) -> Result<Vec<String>, SearchError>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PriceDiscoveryError {
    #[error("price discovery search failed: {0}")]
    SearchFailed(String),
    #[error("price discovery timed out after {0}s")]
    Timeout(u64),
}

/// External web-search style price discovery. Unreliable by contract:
/// zero results and outright failure are both non-fatal to callers.
#[async_trait]
pub trait PriceDiscovery: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<String>, PriceDiscoveryError>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReasoningError {
    #[error("reasoning request failed: {0}")]
    RequestFailed(String),
    #[error("reasoning request timed out after {0}s")]
    Timeout(u64),
    #[error("reasoning output did not match the expected schema: {0}")]
    SchemaMismatch(String),
}

/// Black-box natural-language reasoning. Structured outputs are obtained
/// by prompting for JSON and deserializing at the call site.
#[async_trait]
pub trait ReasoningCapability: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ReasoningError>;
}
