//! Chat-completion wire types.
//!
//! These are the JSON shapes that cross the HTTP boundary: the inbound
//! message list and the OpenAI-style completion payload we respond with.
//! Internal failures ride in the `error` field of an otherwise well-formed
//! body — callers treat presence of `error` as the authoritative failure
//! signal, not the HTTP status.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One inbound or outbound chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One response choice. This service always returns exactly one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: String,
}

/// A search snippet mirrored into the response for attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// The wire-facing chat completion payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,

    /// Mirrored search results, present only when sources were requested
    /// and the search returned at least one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceRef>>,

    /// Diagnostic set on degraded responses. Authoritative failure signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    /// A successful single-choice completion.
    pub fn answered(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: format!("chatcmpl-{}", Uuid::new_v4()),
            object: "chat.completion".into(),
            created: chrono::Utc::now().timestamp(),
            model: model.into(),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage::assistant(content),
                finish_reason: "stop".into(),
            }],
            sources: None,
            error: None,
        }
    }

    /// A degraded response: canned content, `finish_reason: "error"`, and a
    /// diagnostic in the `error` field.
    pub fn degraded(
        model: impl Into<String>,
        content: impl Into<String>,
        diagnostic: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("chatcmpl-{}", Uuid::new_v4()),
            object: "chat.completion".into(),
            created: chrono::Utc::now().timestamp(),
            model: model.into(),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage::assistant(content),
                finish_reason: "error".into(),
            }],
            sources: None,
            error: Some(diagnostic.into()),
        }
    }

    /// Attach mirrored sources.
    pub fn with_sources(mut self, sources: Vec<SourceRef>) -> Self {
        self.sources = Some(sources);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answered_has_stop_finish_reason() {
        let resp = ChatResponse::answered("llama3", "hello");
        assert_eq!(resp.choices.len(), 1);
        assert_eq!(resp.choices[0].finish_reason, "stop");
        assert!(resp.error.is_none());
        assert!(resp.id.starts_with("chatcmpl-"));
    }

    #[test]
    fn degraded_carries_error_and_error_finish() {
        let resp = ChatResponse::degraded("llama3", "sorry", "backend down");
        assert_eq!(resp.choices[0].finish_reason, "error");
        assert_eq!(resp.error.as_deref(), Some("backend down"));
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert!(json.contains(r#""role":"user""#));
    }

    #[test]
    fn sources_omitted_when_absent() {
        let json = serde_json::to_string(&ChatResponse::answered("m", "c")).unwrap();
        assert!(!json.contains("sources"));
        assert!(!json.contains("error"));
    }
}
