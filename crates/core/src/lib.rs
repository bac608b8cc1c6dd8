//! Claim Decision Workflow Engine
//!
//! This crate is the deterministic half of the claimflow system:
//! - Domain types (`domain`) - claims, decisions, recommendations, traces
//! - Capability traits (`capabilities`) - the four pluggable external
//!   dependencies (policy records, semantic search, price discovery,
//!   natural-language reasoning)
//! - Stage implementations (`stages`) - validation, price check, policy
//!   retrieval, recommendation generation
//! - Workflow engine (`workflow`) - a fixed directed graph with two
//!   early-exit branches, producing a final decision plus an ordered
//!   execution trace
//! - Decision assembler (`assembler`) - renders the trace into the
//!   decision's notes field
//!
//! # Safety Principle
//!
//! The reasoning capability is strictly a text generator. It NEVER routes
//! the workflow: branch decisions (invalid claim, inflated cost) are made
//! by deterministic stage code, and its structured outputs are validated
//! against a schema before use.

pub mod assembler;
pub mod capabilities;
pub mod config;
pub mod domain;
pub mod errors;
pub mod json_text;
pub mod records;
pub mod stages;
pub mod workflow;

pub use capabilities::{
    PolicyRecord, PolicyRecordSource, PriceDiscovery, PriceDiscoveryError, ReasoningCapability,
    ReasoningError, RecordSourceError, SearchError, SemanticSearch,
};
pub use domain::claim::{ClaimDecision, ClaimInfo, PriceCheck, ValidationOutcome};
pub use domain::policy::{PolicyQueries, PolicyRecommendation};
pub use domain::trace::TraceEntry;
pub use errors::EngineError;
pub use workflow::engine::{EngineSettings, WorkflowEngine, WorkflowOutcome};
pub use workflow::states::WorkflowState;
