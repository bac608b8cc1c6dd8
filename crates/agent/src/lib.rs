//! Autonomous strategy adapter.
//!
//! Drives the same four capabilities as the deterministic engine, but
//! through a tool-calling reasoning loop constrained by a strict-order
//! system prompt instead of hard-coded graph edges:
//!
//! 1. **Tools** (`tools`) - each workflow stage wrapped as a JSON-in /
//!    JSON-out tool the model can invoke
//! 2. **Prompts** (`prompts`) - the system prompt enforcing the exact
//!    step order and the two early-exit conditions
//! 3. **Runtime** (`runtime`) - the transcript-based tool loop with a
//!    hard step budget
//! 4. **Recovery** (`recovery`) - a three-tier pipeline turning the
//!    agent's free-form final answer into a validated decision
//!
//! The model self-reports its result as uninspectable text; the recovery
//! pipeline never trusts it beyond structural conformance and never
//! raises past its own boundary.

pub mod prompts;
pub mod recovery;
pub mod runtime;
pub mod tools;

pub use recovery::{recover_decision, RecoveredDecision, RecoveryTier};
pub use runtime::{AdapterSettings, AutonomousAdapter};
pub use tools::{ClaimTool, ToolRegistry};
