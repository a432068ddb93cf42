//! Web search result types and the search trait seam.

use crate::location::Location;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Where a search result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    /// A regular ranked web result.
    Web,
    /// A synthetic entry summarizing location-scoped metadata surfaced by
    /// the search backend (timezone, region).
    Location,
}

/// A single ranked search snippet. Order within a result list is the
/// provider's ranking and must be preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub description: String,
    pub url: String,

    /// Freshness hint from the provider ("2 days ago"), when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,

    pub kind: SearchKind,
}

/// The web search seam.
///
/// `search` is infallible by contract: missing credentials, HTTP errors,
/// timeouts, and transport failures all yield an empty list, which the
/// caller treats as "no sources available", not as an error state. The
/// returned list never exceeds `max_results`.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, location: &Location, max_results: usize)
    -> Vec<SearchResult>;
}
