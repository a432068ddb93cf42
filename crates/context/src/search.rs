//! Web search via the Brave Search API.
//!
//! Queries are scoped by the resolved location (country + coordinate) and
//! authenticated with a subscription token header. The provider is
//! infallible by contract: a missing key, HTTP error, or transport failure
//! produces an empty result list, which the pipeline renders as "no
//! results" rather than failing the request.

use async_trait::async_trait;
use nearbot_config::SearchConfig;
use nearbot_core::location::Location;
use nearbot_core::search::{SearchKind, SearchResult, WebSearch};
use std::time::Duration;
use tracing::{debug, warn};

/// Brave Search client. One bounded-timeout attempt per query.
pub struct BraveSearch {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl BraveSearch {
    pub fn new(config: &SearchConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            client,
        }
    }

    /// One attempt against the search API. `None` means "no results".
    async fn query(
        &self,
        api_key: &str,
        query: &str,
        location: &Location,
        max_results: usize,
    ) -> Option<Vec<SearchResult>> {
        let count = max_results.to_string();
        let country = location.country.to_lowercase();
        let coordinate = format!("{},{}", location.latitude, location.longitude);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("count", count.as_str()),
                ("search_lang", "en"),
                ("country", country.as_str()),
                ("coordinate", coordinate.as_str()),
            ])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .send()
            .await
            .inspect_err(|e| warn!(error = %e, "Search request failed"))
            .ok()?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Search API returned error");
            return None;
        }

        let data: serde_json::Value = response
            .json()
            .await
            .inspect_err(|e| warn!(error = %e, "Search response was not valid JSON"))
            .ok()?;

        Some(parse_payload(&data, max_results))
    }
}

/// Extract ranked results from a Brave-shaped payload.
///
/// Results live at the top level or under "web" depending on the
/// subscription plan. Location-scoped metadata, when the backend surfaces
/// it, becomes one synthetic trailing entry. The final list is truncated to
/// `max_results` so the bound holds regardless of what the API sent back.
fn parse_payload(data: &serde_json::Value, max_results: usize) -> Vec<SearchResult> {
    let items = data["results"]
        .as_array()
        .or_else(|| data["web"]["results"].as_array());

    let mut results: Vec<SearchResult> = items
        .map(|arr| {
            arr.iter()
                .map(|item| SearchResult {
                    title: str_field(item, "title"),
                    description: str_field(item, "description"),
                    url: str_field(item, "url"),
                    age: item["age"].as_str().map(String::from),
                    kind: SearchKind::Web,
                })
                .collect()
        })
        .unwrap_or_default();

    if let Some(loc_data) = data.get("location").filter(|v| v.is_object()) {
        results.push(SearchResult {
            title: format!("Local information for {}", str_field(loc_data, "name")),
            description: format!(
                "Timezone: {}, Region: {}",
                str_field(loc_data, "timezone"),
                str_field(loc_data, "region")
            ),
            url: String::new(),
            age: None,
            kind: SearchKind::Location,
        });
    }

    results.truncate(max_results);
    results
}

fn str_field(value: &serde_json::Value, key: &str) -> String {
    value[key].as_str().unwrap_or_default().to_string()
}

#[async_trait]
impl WebSearch for BraveSearch {
    async fn search(
        &self,
        query: &str,
        location: &Location,
        max_results: usize,
    ) -> Vec<SearchResult> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("Search API key not configured, returning no results");
            return Vec::new();
        };

        let results = self
            .query(api_key, query, location, max_results)
            .await
            .unwrap_or_default();

        debug!(count = results.len(), "Search completed");
        results
    }
}
