//! HTTP client for the traffic endpoint.
//!
//! [`HttpTrafficProvider`] issues `GET <base_url>?lat=<lat>&lon=<lon>` and
//! decodes the JSON envelope described in [`crate::provider`]. It provides:
//! - Connection pooling and keepalive, so route fan-out reuses connections
//! - Mapping of transport errors and non-2xx statuses to `ProviderUnavailable`
//! - Mapping of undecodable bodies to `MalformedResponse`
//!
//! There is no retry here; see [`crate::TrafficSampler`].

use log::{debug, warn};
use reqwest::Client;
use std::time::{Duration, Instant};

use crate::provider::{ProviderReply, TrafficProvider};
use crate::{Coordinate, Result, TrafficError};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/traffic/";

// Route analysis opens one request per checkpoint at once
const MAX_IDLE_PER_HOST: usize = 16;

/// Traffic provider backed by an HTTP JSON endpoint.
pub struct HttpTrafficProvider {
    client: Client,
    base_url: String,
}

impl HttpTrafficProvider {
    /// Create a provider for `base_url`.
    ///
    /// `request_timeout` is a transport-level cap; the sampler applies its own
    /// per-call timeout on top.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(request_timeout)
            .build()
            .map_err(|e| TrafficError::InvalidArgument(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl TrafficProvider for HttpTrafficProvider {
    async fn query(&self, coord: Coordinate) -> Result<ProviderReply> {
        let req_start = Instant::now();

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("lat", coord.latitude), ("lon", coord.longitude)])
            .send()
            .await
            .map_err(|e| {
                warn!("[HttpTrafficProvider] {} request error: {}", coord, e);
                TrafficError::ProviderUnavailable(format!("Network error: {}", e))
            })?;

        let status = response.status();
        let headers_elapsed = req_start.elapsed();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TrafficError::ProviderUnavailable(format!("Body download error: {}", e)))?;

        if !status.is_success() {
            // Error envelopes often ride on 4xx/5xx; keep their message when there is one
            let message = serde_json::from_slice::<ProviderReply>(&bytes)
                .ok()
                .and_then(|reply| reply.message);
            return Err(TrafficError::ProviderUnavailable(match message {
                Some(message) => format!("HTTP {}: {}", status, message),
                None => format!("HTTP {}", status),
            }));
        }

        let reply: ProviderReply = serde_json::from_slice(&bytes)
            .map_err(|e| TrafficError::MalformedResponse(format!("JSON parse error: {}", e)))?;

        debug!(
            "[HttpTrafficProvider] {} headers={:?} total={:?} ({:.1}KB)",
            coord,
            headers_elapsed,
            req_start.elapsed(),
            bytes.len() as f64 / 1024.0
        );

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        // Port 9 (discard) on localhost is closed on CI machines
        let provider = HttpTrafficProvider::new("http://127.0.0.1:9/api/traffic/", Duration::from_secs(2)).unwrap();
        let err = provider.query(Coordinate::new(28.6, 77.2)).await.unwrap_err();
        assert!(matches!(err, TrafficError::ProviderUnavailable(_)));
    }

    #[test]
    fn test_keeps_base_url() {
        let provider = HttpTrafficProvider::new(DEFAULT_BASE_URL, Duration::from_secs(5)).unwrap();
        assert_eq!(provider.base_url(), DEFAULT_BASE_URL);
    }
}
