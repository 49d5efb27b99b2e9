//! The congestion provider seam.
//!
//! A provider answers "what is traffic like at this coordinate?" with the JSON
//! envelope below. Transport details live in the implementation
//! ([`crate::http::HttpTrafficProvider`] behind the `http` feature); field
//! validation lives in [`crate::TrafficSampler`].
//!
//! ```text
//! { "status": "success",
//!   "traffic": { "currentSpeed": 31, "freeFlowSpeed": 52, "currentTravelTime": 140,
//!                "congestionScore": 40, "roadClosure": false,
//!                "roadClass": "FRC2", "confidence": 95 },
//!   "location": { "latitude": 28.61, "longitude": 77.21 },
//!   "coordinates": [ ... ] }
//!
//! { "status": "error", "message": "..." }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::{Coordinate, Result};

/// Raw provider envelope, before normalization.
///
/// Everything is optional here so that a structurally odd payload reaches the
/// sampler, which reports exactly which field is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub traffic: Option<Value>,
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default)]
    pub coordinates: Option<Vec<Value>>,
}

impl ProviderReply {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

/// A remote source of per-coordinate traffic data.
///
/// Implementations map transport failures and non-success HTTP statuses to
/// [`crate::TrafficError::ProviderUnavailable`] and undecodable bodies to
/// [`crate::TrafficError::MalformedResponse`]. They must not retry.
pub trait TrafficProvider: Send + Sync {
    fn query(&self, coord: Coordinate) -> impl Future<Output = Result<ProviderReply>> + Send;
}

impl<P: TrafficProvider> TrafficProvider for Arc<P> {
    fn query(&self, coord: Coordinate) -> impl Future<Output = Result<ProviderReply>> + Send {
        (**self).query(coord)
    }
}
