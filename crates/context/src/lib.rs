//! Context source implementations for nearbot.
//!
//! Each source is an independently-failing input that the orchestrator
//! merges into a prompt. All four follow the same discipline: a failure or
//! timeout inside a source produces its documented fallback value (default
//! location, empty list, empty history), never an error the caller must
//! handle.

pub mod favorites;
pub mod location;
pub mod memory;
pub mod search;

pub use favorites::FavoritesStore;
pub use location::IpLocator;
pub use memory::{MemoryStore, render_history};
pub use search::BraveSearch;
