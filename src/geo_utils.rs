//! # Geographic Utilities
//!
//! Pure geographic helpers used by the polling controller and the route analyzer.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`distance_km`] | Great-circle distance between two coordinates in kilometres |
//! | [`interpolate`] | Planar lat/lon interpolation between two coordinates |
//! | [`checkpoints`] | Evenly spaced sampling points from start to end, endpoints included |
//!
//! ## Example
//!
//! ```rust
//! use corridor_traffic::{Coordinate, geo_utils};
//!
//! let start = Coordinate::new(28.60, 77.20);
//! let end = Coordinate::new(28.65, 77.25);
//!
//! let points = geo_utils::checkpoints(start, end, 5).unwrap();
//! assert_eq!(points.len(), 5);
//! assert_eq!(points[0], start);
//! assert_eq!(points[4], end);
//!
//! let km = geo_utils::distance_km(&start, &end);
//! assert!((km - 7.4).abs() < 0.05);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! Distances use the haversine great-circle formula on a spherical Earth
//! (mean radius ~6,371 km), which is accurate to within 0.3% for road-scale distances.
//!
//! ### Checkpoint Placement
//!
//! Checkpoints are interpolated linearly in latitude/longitude rather than along the
//! great circle. For the short corridors this crate targets the two are within metres of
//! each other, and the linear form keeps the endpoints bit-exact.

use geo::{Distance, Haversine, Point};

use crate::{Coordinate, Result, TrafficError};

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two coordinates, in kilometres.
///
/// Symmetric in its arguments and exactly `0.0` for identical coordinates.
///
/// # Example
///
/// ```rust
/// use corridor_traffic::{Coordinate, geo_utils};
///
/// let london = Coordinate::new(51.5074, -0.1278);
/// let paris = Coordinate::new(48.8566, 2.3522);
///
/// let km = geo_utils::distance_km(&london, &paris);
/// assert!((km - 343.6).abs() < 1.0);
/// ```
#[inline]
pub fn distance_km(a: &Coordinate, b: &Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }
    let point1 = Point::new(a.longitude, a.latitude);
    let point2 = Point::new(b.longitude, b.latitude);
    Haversine::distance(point1, point2) / 1000.0
}

// =============================================================================
// Interpolation Functions
// =============================================================================

/// Linearly interpolate between `a` and `b` in latitude/longitude space.
///
/// `ratio` is clamped to `[0, 1]`. A ratio of `0` returns `a` and a ratio of `1`
/// returns `b`, bit for bit.
pub fn interpolate(a: Coordinate, b: Coordinate, ratio: f64) -> Coordinate {
    let ratio = ratio.clamp(0.0, 1.0);
    if ratio == 0.0 {
        return a;
    }
    if ratio == 1.0 {
        return b;
    }
    Coordinate::new(
        a.latitude + (b.latitude - a.latitude) * ratio,
        a.longitude + (b.longitude - a.longitude) * ratio,
    )
}

/// Generate `n` checkpoints from `a` to `b`.
///
/// The first checkpoint is exactly `a`, the last exactly `b`, and the `n - 2`
/// in between sit at `ratio = i / (n - 1)`.
///
/// # Errors
///
/// [`TrafficError::InvalidArgument`] when `n < 2`.
pub fn checkpoints(a: Coordinate, b: Coordinate, n: usize) -> Result<Vec<Coordinate>> {
    if n < 2 {
        return Err(TrafficError::InvalidArgument(format!(
            "checkpoint count must be at least 2, got {}",
            n
        )));
    }

    let last = (n - 1) as f64;
    let mut points = Vec::with_capacity(n);
    points.push(a);
    points.extend((1..n - 1).map(|i| interpolate(a, b, i as f64 / last)));
    points.push(b);
    Ok(points)
}

// =============================================================================
// Unit Tests
// =============================================================================
