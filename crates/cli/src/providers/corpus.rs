//! File-backed policy corpus with keyword-overlap ranking. Stands in for
//! a vector store: good enough for section-level retrieval over a single
//! policy document, with no external service to run.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use claimflow_core::{SearchError, SemanticSearch};

/// One passage of the policy document.
#[derive(Clone, Debug, Deserialize)]
struct CorpusEntry {
    section: String,
    text: String,
}

/// In-memory corpus loaded once at startup from a JSON array of
/// `{section, text}` objects. A missing or malformed file is a fatal
/// configuration problem, surfaced as `StoreUnreachable` at open time.
#[derive(Debug)]
pub struct JsonCorpusSearch {
    entries: Vec<CorpusEntry>,
}

impl JsonCorpusSearch {
    pub fn open(path: &Path) -> Result<Self, SearchError> {
        let raw = fs::read_to_string(path).map_err(|error| {
            SearchError::StoreUnreachable(format!("could not read {}: {error}", path.display()))
        })?;
        let entries: Vec<CorpusEntry> = serde_json::from_str(&raw).map_err(|error| {
            SearchError::StoreUnreachable(format!("could not parse {}: {error}", path.display()))
        })?;

        info!(path = %path.display(), passages = entries.len(), "policy corpus loaded");
        Ok(Self { entries })
    }

    fn tokens(text: &str) -> HashSet<String> {
        text.to_ascii_lowercase()
            .split(|ch: char| !ch.is_ascii_alphanumeric())
            .filter(|token| token.len() > 2)
            .map(String::from)
            .collect()
    }
}

#[async_trait]
impl SemanticSearch for JsonCorpusSearch {
    async fn query(&self, text: &str, limit: usize) -> Result<Vec<String>, SearchError> {
        let query_tokens = Self::tokens(text);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, &CorpusEntry)> = self
            .entries
            .iter()
            .map(|entry| {
                let entry_tokens = Self::tokens(&entry.text);
                let overlap = query_tokens.intersection(&entry_tokens).count();
                (overlap, entry)
            })
            .filter(|(overlap, _)| *overlap > 0)
            .collect();

        // Stable ranking: score first, then document order for ties.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, entry)| format!("[{}] {}", entry.section, entry.text))
            .collect())
    }
}
