//! # Corridor Traffic
//!
//! Road-segment congestion sampling and aggregation.
//!
//! This library provides:
//! - A sampler that normalizes a congestion provider's answer for one coordinate
//! - A polling controller with change detection and single-flight auto-refresh
//! - A route analyzer that fans out checkpoint queries and aggregates the results
//!
//! ## Features
//!
//! - **`http`** - Enable the reqwest-backed [`HttpTrafficProvider`]
//! - **`cli`** - Build the `corridor-traffic` command-line tool
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use corridor_traffic::{Coordinate, CongestionBands, CongestionTier, geo_utils};
//!
//! let start = Coordinate::new(28.60, 77.20);
//! let end = Coordinate::new(28.65, 77.25);
//!
//! let checkpoints = geo_utils::checkpoints(start, end, 5).unwrap();
//! assert_eq!(checkpoints.len(), 5);
//!
//! let level = CongestionBands::Route.classify(40.0);
//! assert_eq!(level.tier, CongestionTier::Moderate);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod error;
pub use error::{Result, TrafficError};

pub mod geo_utils;

pub mod congestion;
pub use congestion::{CongestionBands, CongestionLevel, CongestionTier};

pub mod format;

pub mod provider;
pub use provider::{ProviderReply, TrafficProvider};

pub mod sampler;
pub use sampler::TrafficSampler;

pub mod monitor;
pub use monitor::{PollObserver, PollState, PollingController};

pub mod route;
pub use route::{RouteAnalyzer, RouteObserver, RouteSummary};

// HTTP provider for the traffic endpoint
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpTrafficProvider;

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate in degrees.
///
/// # Example
/// ```
/// use corridor_traffic::Coordinate;
/// let point = Coordinate::new(28.6139, 77.2090); // New Delhi
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the coordinate is finite and within lat/lon range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Like [`Coordinate::is_valid`], but reports what is wrong.
    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(TrafficError::InvalidArgument(format!(
                "coordinate ({}, {}) is outside [-90, 90] x [-180, 180]",
                self.latitude, self.longitude
            )))
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5},{:.5}", self.latitude, self.longitude)
    }
}

/// Traffic conditions observed at one coordinate at one instant.
///
/// `congestion_score` comes from the provider as-is and is never recomputed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSample {
    /// Current speed in km/h
    pub current_speed: f64,
    /// Free-flow speed in km/h
    pub free_flow_speed: f64,
    /// Current travel time across the segment, in seconds
    pub current_travel_time: u32,
    /// Provider congestion score (0-100)
    pub congestion_score: f64,
    pub road_closure: bool,
    /// Functional road class reported by the provider (e.g. "FRC2")
    pub road_class: String,
    /// Provider confidence (0-100)
    pub confidence: f64,
    /// Coordinate the provider matched the query to
    pub coordinate: Coordinate,
    /// Number of points in the matched road-segment geometry
    pub segment_point_count: usize,
    pub sampled_at: DateTime<Utc>,
}

impl TrafficSample {
    /// Whether any of the fields that drive downstream updates differ.
    ///
    /// Only speed, free-flow speed, travel time, congestion score and closure are
    /// compared; road class, confidence, location and timestamp are ignored.
    pub fn differs_from(&self, other: &TrafficSample) -> bool {
        self.current_speed != other.current_speed
            || self.free_flow_speed != other.free_flow_speed
            || self.current_travel_time != other.current_travel_time
            || self.congestion_score != other.congestion_score
            || self.road_closure != other.road_closure
    }

    /// Classification under the live single-point bands.
    pub fn live_level(&self) -> CongestionLevel {
        CongestionBands::Live.classify(self.congestion_score)
    }
}

/// A request to analyze the straight-line corridor between two coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteQuery {
    pub start: Coordinate,
    pub end: Coordinate,
    /// Number of sampling points including both endpoints (at least 2)
    pub checkpoint_count: usize,
}

impl RouteQuery {
    /// Create a query with the default checkpoint count.
    pub fn new(start: Coordinate, end: Coordinate) -> Self {
        Self {
            start,
            end,
            checkpoint_count: DEFAULT_CHECKPOINT_COUNT,
        }
    }

    pub fn with_checkpoint_count(mut self, checkpoint_count: usize) -> Self {
        self.checkpoint_count = checkpoint_count;
        self
    }
}

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_CHECKPOINT_COUNT: usize = 5;
pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 10_000;

/// Configuration for polling and route analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Delay between the end of one background fetch and the start of the next.
    /// Default: 10000 ms
    pub poll_interval_ms: u64,

    /// Checkpoints sampled along a route, endpoints included.
    /// Default: 5
    pub checkpoint_count: usize,

    /// Upper bound on a single provider call; slower calls count as unavailable.
    /// Default: 10000 ms
    pub provider_timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            checkpoint_count: DEFAULT_CHECKPOINT_COUNT,
            provider_timeout_ms: DEFAULT_PROVIDER_TIMEOUT_MS,
        }
    }
}

impl MonitorConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: MonitorConfig = serde_json::from_str(json)
            .map_err(|e| TrafficError::InvalidArgument(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(TrafficError::InvalidArgument(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.provider_timeout_ms == 0 {
            return Err(TrafficError::InvalidArgument(
                "provider_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.checkpoint_count < 2 {
            return Err(TrafficError::InvalidArgument(format!(
                "checkpoint_count must be at least 2, got {}",
                self.checkpoint_count
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}

// ============================================================================
// Test Support
// ============================================================================


// ============================================================================
// Tests
// ============================================================================
