//! Location value type and the geocoding trait seam.
//!
//! A `Location` is always present in a prompt context: when the client
//! address cannot be geolocated, the resolver substitutes the configured
//! default instead of reporting an error. Fallback is a normal outcome here,
//! not a failure mode.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// An approximate geographic position, resolved from a client IP.
///
/// Immutable value object. Produced by the location resolver; consumed by
/// the search provider (coordinate scoping) and the prompt builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub country: String,
}

impl Location {
    /// The well-known fallback location, used whenever a lookup cannot be
    /// performed or fails. Never treated as an error.
    pub fn default_fallback() -> Self {
        Self {
            latitude: 48.8566,
            longitude: 2.3522,
            city: "Paris".into(),
            country: "France".into(),
        }
    }

    /// Render as "city, country" for prompts and memory records.
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.city, self.country)
    }
}

/// The geocoding seam.
///
/// `resolve` is infallible by contract: implementations must return a usable
/// `Location` for every input, falling back to a default when the live
/// lookup is impossible or fails.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn resolve(&self, addr: IpAddr) -> Location;
}
