//! IP geolocation via an ipapi-style lookup service.
//!
//! Private and loopback addresses short-circuit to the default location
//! without touching the network: a public IP-geocoding service cannot
//! resolve them, so the call would be wasted. Public addresses get exactly
//! one bounded-timeout lookup. Geolocation is best-effort context, not a
//! correctness-critical input, so there are no retries and no errors — the
//! resolver always hands back a usable `Location`.

use async_trait::async_trait;
use nearbot_config::LocationConfig;
use nearbot_core::location::{GeoLookup, Location};
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};

/// Resolves a client IP to an approximate location, falling back to the
/// default on any failure.
pub struct IpLocator {
    base_url: String,
    client: reqwest::Client,
}

/// The fields we require from the lookup service. Any of them missing
/// triggers the fallback.
#[derive(Debug, Deserialize)]
struct GeoReply {
    city: Option<String>,
    country_name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl IpLocator {
    pub fn new(config: &LocationConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Whether a public geocoding service could possibly know this address.
    ///
    /// Loopback, RFC1918 private ranges, and link-local addresses are
    /// unroutable on the public internet and short-circuit to the fallback.
    fn is_unroutable(addr: IpAddr) -> bool {
        match addr {
            IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
            IpAddr::V6(v6) => {
                // fc00::/7 unique-local, fe80::/10 link-local
                v6.is_loopback()
                    || (v6.segments()[0] & 0xfe00) == 0xfc00
                    || (v6.segments()[0] & 0xffc0) == 0xfe80
            }
        }
    }

    /// One attempt against the lookup service. `None` means "fall back".
    async fn lookup(&self, addr: IpAddr) -> Option<Location> {
        let url = format!("{}/{}/json/", self.base_url, addr);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .inspect_err(|e| warn!(error = %e, "Geolocation request failed"))
            .ok()?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Geolocation service returned error");
            return None;
        }

        let reply: GeoReply = response
            .json()
            .await
            .inspect_err(|e| warn!(error = %e, "Geolocation response was not valid JSON"))
            .ok()?;

        Some(Location {
            latitude: reply.latitude?,
            longitude: reply.longitude?,
            city: reply.city?,
            country: reply.country_name?,
        })
    }
}

#[async_trait]
impl GeoLookup for IpLocator {
    async fn resolve(&self, addr: IpAddr) -> Location {
        if Self::is_unroutable(addr) {
            debug!(%addr, "Private or loopback address, using default location");
            return Location::default_fallback();
        }

        match self.lookup(addr).await {
            Some(location) => {
                debug!(%addr, city = %location.city, "Resolved client location");
                location
            }
            None => {
                debug!(%addr, "Geolocation fell back to default");
                Location::default_fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> IpLocator {
        // Unresolvable host so any accidental network call fails fast.
        IpLocator::new(&LocationConfig {
            base_url: "http://geo.invalid".into(),
            timeout_secs: 1,
        })
    }

    #[test]
    fn private_ranges_are_unroutable() {
        for addr in [
            "127.0.0.1",
            "10.0.0.1",
            "172.16.0.1",
            "172.31.255.254",
            "192.168.1.1",
            "169.254.0.1",
            "::1",
            "fc00::1",
            "fd12::34",
            "fe80::1",
        ] {
            assert!(
                IpLocator::is_unroutable(addr.parse().unwrap()),
                "{addr} should be unroutable"
            );
        }
    }

    #[test]
    fn public_addresses_are_routable() {
        for addr in ["8.8.8.8", "93.184.216.34", "2001:4860:4860::8888"] {
            assert!(
                !IpLocator::is_unroutable(addr.parse().unwrap()),
                "{addr} should be routable"
            );
        }
    }

    #[tokio::test]
    async fn loopback_resolves_to_default_without_network() {
        let loc = locator().resolve("127.0.0.1".parse().unwrap()).await;
        assert_eq!(loc, Location::default_fallback());
    }

    #[tokio::test]
    async fn rfc1918_resolves_to_default_without_network() {
        let loc = locator().resolve("192.168.0.42".parse().unwrap()).await;
        assert_eq!(loc, Location::default_fallback());
    }

    #[tokio::test]
    async fn transport_failure_falls_back_to_default() {
        // Public address against an unresolvable host: the single attempt
        // errors and the resolver degrades to the default.
        let loc = locator().resolve("93.184.216.34".parse().unwrap()).await;
        assert_eq!(loc, Location::default_fallback());
    }
}
