//! Context record types and the per-request prompt context aggregate.

use crate::location::Location;
use crate::search::SearchResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A saved favorite place. Persisted as a JSON document; read-only to the
/// orchestration pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub name: String,

    /// Star rating, when the user bothered to set one. Older favorites
    /// documents call this field "note".
    #[serde(default, alias = "note", skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,

    #[serde(default)]
    pub description: String,
}

/// One remembered exchange. The memory document is append-only and capped
/// at a retention window; the oldest entries are evicted on every write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub question: String,
    pub response: String,

    /// The resolved location at the time of the exchange, as "city, country".
    #[serde(default)]
    pub location: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn new(
        question: impl Into<String>,
        response: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            response: response.into(),
            location: location.into(),
            created_at: Utc::now(),
        }
    }
}

/// Everything the prompt builder needs for one request, gathered by the
/// orchestrator's fan-out stage.
///
/// Constructed fresh per request and never persisted. Immutable once handed
/// to the prompt builder — the builder takes `&PromptContext` and the
/// orchestrator does not touch it afterwards. `location` is always present;
/// the resolver substitutes a default rather than leaving it empty.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub location: Location,
    pub favorites: Vec<FavoriteEntry>,
    pub search: Vec<SearchResult>,

    /// Recent interaction history, already rendered to flat text.
    /// Empty string when there is no history.
    pub memory: String,

    pub question: String,
}
