//! Error types for the nearbot domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Only two failures are
//! allowed to reach the caller: a request without a user question, and a
//! failed completion call. Every other sub-failure (geocoding, search,
//! favorites, memory reads) is absorbed at the component that produced it
//! and replaced with its documented fallback value.

use thiserror::Error;

/// The top-level error type for all nearbot operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The inbound request carried no user-authored message.
    #[error("no user message in request")]
    NoUserQuery,

    // --- Completion backend errors ---
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    // --- Persistence errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failure taxonomy for the model backend. Surfaced verbatim in the
/// response `error` field; never includes transport internals or secrets.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("model backend timed out")]
    Timeout,

    #[error("model backend refused the connection")]
    ConnectionRefused,

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("model backend error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record set: {0}")]
    Corrupt(String),
}
