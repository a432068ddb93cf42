//! Ollama backend implementation of `CompletionBackend`.
//!
//! Sends one POST to `/api/chat` and accepts either the chat-shaped
//! (`{message: {content}}`) or generate-shaped (`{response}`) reply JSON.
//! Every failure is mapped onto the uniform `CompletionError` taxonomy; a
//! 2xx reply whose content field is missing or blank is a
//! `MalformedResponse`, never an empty success.

use async_trait::async_trait;
use nearbot_config::ModelConfig;
use nearbot_core::completion::{CompletionBackend, CompletionReply, CompletionRequest};
use nearbot_core::error::CompletionError;
use std::time::Duration;
use tracing::{debug, warn};

pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: &ModelConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
        }
    }

    fn map_transport_error(e: reqwest::Error) -> CompletionError {
        if e.is_timeout() {
            CompletionError::Timeout
        } else if e.is_connect() {
            CompletionError::ConnectionRefused
        } else {
            CompletionError::Other(e.to_string())
        }
    }
}

/// Pull the generated text out of a backend reply, tolerating both the
/// chat and generate endpoint shapes. `None` when the field is missing.
fn extract_content(data: &serde_json::Value) -> Option<&str> {
    data["message"]["content"]
        .as_str()
        .or_else(|| data["response"].as_str())
}

#[async_trait]
impl CompletionBackend for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionReply, CompletionError> {
        let url = format!("{}/api/chat", self.base_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": request.prompt}],
            "stream": false,
            "options": {"temperature": request.temperature},
        });
        if let Some(max_tokens) = request.max_tokens {
            body["options"]["num_predict"] = serde_json::json!(max_tokens);
        }

        debug!(model = %self.model, prompt_chars = request.prompt.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Model backend returned error");
            if status.as_u16() == 404 || error_body.contains("not found") {
                return Err(CompletionError::ModelNotFound(self.model.clone()));
            }
            return Err(CompletionError::Other(format!(
                "backend returned status {status}"
            )));
        }

        let data: serde_json::Value = response.json().await.map_err(|e| {
            CompletionError::MalformedResponse(format!("reply was not valid JSON: {e}"))
        })?;

        match extract_content(&data) {
            Some(content) if !content.trim().is_empty() => Ok(CompletionReply {
                content: content.to_string(),
                model: self.model.clone(),
            }),
            Some(_) => Err(CompletionError::MalformedResponse(
                "reply content was empty".into(),
            )),
            None => Err(CompletionError::MalformedResponse(
                "reply carried no content field".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_chat_shaped_content() {
        let data = json!({"message": {"content": "hello"}});
        assert_eq!(extract_content(&data), Some("hello"));
    }

    #[test]
    fn extracts_generate_shaped_content() {
        let data = json!({"response": "hi there"});
        assert_eq!(extract_content(&data), Some("hi there"));
    }

    #[test]
    fn missing_content_is_none() {
        let data = json!({"done": true});
        assert_eq!(extract_content(&data), None);
    }

    #[tokio::test]
    async fn unreachable_backend_maps_to_transport_failure() {
        let client = OllamaClient::new(&ModelConfig {
            base_url: "http://127.0.0.1:9".into(), // discard port, refuses connections
            model: "llama3".into(),
            temperature: 0.7,
            max_tokens: 64,
            timeout_secs: 2,
        });

        let err = client
            .complete(CompletionRequest::new("hello"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CompletionError::ConnectionRefused | CompletionError::Timeout | CompletionError::Other(_)
        ));
    }
}
