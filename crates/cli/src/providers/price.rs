//! HTTP-backed price discovery against an HTML search endpoint. The
//! response body is mined for lines that mention a dollar amount; amount
//! extraction and plausibility filtering happen downstream in the price
//! check stage.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use claimflow_core::{PriceDiscovery, PriceDiscoveryError};

pub struct HttpPriceDiscovery {
    client: reqwest::Client,
    endpoint: String,
    timeout_secs: u64,
}

impl HttpPriceDiscovery {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into(), timeout_secs }
    }
}

#[async_trait]
impl PriceDiscovery for HttpPriceDiscovery {
    async fn search(&self, query: &str) -> Result<Vec<String>, PriceDiscoveryError> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .timeout(Duration::from_secs(self.timeout_secs))
            .send();

        let response = request.await.map_err(|error| {
            if error.is_timeout() {
                PriceDiscoveryError::Timeout(self.timeout_secs)
            } else {
                PriceDiscoveryError::SearchFailed(error.to_string())
            }
        })?;

        let body = response
            .text()
            .await
            .map_err(|error| PriceDiscoveryError::SearchFailed(error.to_string()))?;

        let snippets = extract_priced_lines(&body);
        debug!(query, snippets = snippets.len(), "price discovery results");
        Ok(snippets)
    }
}

/// Keep only lines that mention a dollar amount, stripped of markup.
fn extract_priced_lines(body: &str) -> Vec<String> {
    body.lines()
        .map(strip_tags)
        .map(|line| line.trim().to_string())
        .filter(|line| line.contains('$'))
        .take(25)
        .collect()
}

fn strip_tags(line: &str) -> String {
    let mut output = String::with_capacity(line.len());
    let mut in_tag = false;
    for ch in line.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => output.push(ch),
            _ => {}
        }
    }
    output
}
