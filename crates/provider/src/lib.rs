//! Model backend client for nearbot.
//!
//! Talks to an Ollama-style local backend. One request per completion, no
//! retries — retry policy, if any, belongs to the orchestrator.

pub mod ollama;

pub use ollama::OllamaClient;
