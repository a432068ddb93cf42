//! # Nearbot Core
//!
//! Domain types, traits, and error definitions for the nearbot assistant
//! service. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every unreliable external dependency (geocoding, web search, the model
//! backend) is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod chat;
pub mod completion;
pub mod context;
pub mod error;
pub mod location;
pub mod search;

// Re-export key types at crate root for ergonomics
pub use chat::{ChatChoice, ChatMessage, ChatResponse, Role, SourceRef};
pub use completion::{CompletionBackend, CompletionReply, CompletionRequest};
pub use context::{FavoriteEntry, MemoryEntry, PromptContext};
pub use error::{CompletionError, Error, Result, StoreError};
pub use location::{GeoLookup, Location};
pub use search::{SearchKind, SearchResult, WebSearch};
