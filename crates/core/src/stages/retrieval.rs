//! Policy text retrieval: fan queries out to the semantic search
//! capability and merge the ranked snippets into one deduplicated list.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::capabilities::{SearchError, SemanticSearch};
use crate::errors::EngineError;

/// Retrieve up to `limit_per_query` snippets for each query and flatten
/// across queries, preserving first-seen order and deduplicating by exact
/// text match.
///
/// An empty corpus yields an empty list; callers proceed with a "no policy
/// text available" placeholder. An unreachable store is a fatal
/// configuration failure.
pub async fn retrieve_policy_text<S>(
    queries: &[String],
    search: &S,
    limit_per_query: usize,
) -> Result<Vec<String>, EngineError>
where
    S: SemanticSearch + ?Sized,
{
    let mut seen = HashSet::new();
    let mut chunks = Vec::new();

    for query in queries {
        let results = match search.query(query, limit_per_query).await {
            Ok(results) => results,
            Err(error @ SearchError::StoreUnreachable(_)) => return Err(error.into()),
            Err(SearchError::QueryFailed(message)) => {
                warn!(%query, reason = %message, "semantic search query failed");
                continue;
            }
        };

        for chunk in results {
            if seen.insert(chunk.clone()) {
                chunks.push(chunk);
            }
        }
    }

    info!(
        chunk_count = chunks.len(),
        query_count = queries.len(),
        "retrieved unique policy chunks"
    );
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use crate::capabilities::{SearchError, SemanticSearch};
    use crate::errors::EngineError;
    use crate::stages::retrieval::retrieve_policy_text;

    struct StubSearch {
        responses: HashMap<String, Vec<String>>,
        unreachable: bool,
    }

    #[async_trait]
    impl SemanticSearch for StubSearch {
        async fn query(&self, text: &str, limit: usize) -> Result<Vec<String>, SearchError> {
            if self.unreachable {
                return Err(SearchError::StoreUnreachable(
                    "corpus directory missing".to_string(),
                ));
            }
            let mut results = self.responses.get(text).cloned().unwrap_or_default();
            results.truncate(limit);
            Ok(results)
        }
    }

    fn queries(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|text| text.to_string()).collect()
    }

    #[tokio::test]
    async fn overlapping_result_sets_are_deduplicated_in_first_seen_order() {
        let search = StubSearch {
            responses: HashMap::from([
                (
                    "collision coverage".to_string(),
                    vec!["Section III: Collision".to_string(), "Deductibles".to_string()],
                ),
                (
                    "deductible clauses".to_string(),
                    vec!["Deductibles".to_string(), "Exclusions".to_string()],
                ),
            ]),
            unreachable: false,
        };

        let chunks = retrieve_policy_text(
            &queries(&["collision coverage", "deductible clauses"]),
            &search,
            5,
        )
        .await
        .expect("retrieval should succeed");

        assert_eq!(chunks, vec!["Section III: Collision", "Deductibles", "Exclusions"]);
    }

    #[tokio::test]
    async fn per_query_limit_is_applied() {
        let search = StubSearch {
            responses: HashMap::from([(
                "collision coverage".to_string(),
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
            )]),
            unreachable: false,
        };

        let chunks = retrieve_policy_text(&queries(&["collision coverage"]), &search, 2)
            .await
            .expect("retrieval should succeed");
        assert_eq!(chunks.len(), 2);
    }

    #[tokio::test]
    async fn empty_corpus_yields_an_empty_list_not_an_error() {
        let search = StubSearch { responses: HashMap::new(), unreachable: false };
        let chunks = retrieve_policy_text(&queries(&["anything"]), &search, 5)
            .await
            .expect("empty corpus is non-fatal");
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn unreachable_store_is_a_configuration_failure() {
        let search = StubSearch { responses: HashMap::new(), unreachable: true };
        let error = retrieve_policy_text(&queries(&["anything"]), &search, 5)
            .await
            .expect_err("unreachable store is fatal");
        assert!(matches!(error, EngineError::Configuration(_)));
    }
}
