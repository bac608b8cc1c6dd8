use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One record of a workflow stage execution. Entries are appended in run
/// order and never mutated or reordered; the sequence is the canonical
/// record of what ran.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub stage: String,
    pub elapsed: Duration,
    /// Stage-specific key/value annotations, in insertion order.
    pub annotations: Vec<(String, String)>,
}

impl TraceEntry {
    pub fn new(stage: impl Into<String>, elapsed: Duration) -> Self {
        Self { stage: stage.into(), elapsed, annotations: Vec::new() }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.push((key.into(), value.into()));
        self
    }
}
