//! Single-coordinate traffic sampling.
//!
//! [`TrafficSampler`] validates the coordinate, bounds the provider call by a
//! timeout, and normalizes the provider envelope into a [`TrafficSample`].
//! It never retries: the polling controller retries on its next tick and the
//! route analyzer tolerates partial failure instead.

use chrono::Utc;
use log::debug;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

use crate::provider::{ProviderReply, TrafficProvider};
use crate::{Coordinate, MonitorConfig, Result, TrafficError, TrafficSample};

const DEFAULT_ERROR_MESSAGE: &str = "Failed to fetch traffic data";

/// Samples one coordinate at a time from a [`TrafficProvider`].
pub struct TrafficSampler<P> {
    provider: P,
    timeout: Duration,
}

impl<P: TrafficProvider> TrafficSampler<P> {
    /// Create a sampler whose provider calls are bounded by `timeout`.
    pub fn new(provider: P, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn from_config(provider: P, config: &MonitorConfig) -> Self {
        Self::new(provider, config.provider_timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query the provider for `coord` and normalize the answer.
    ///
    /// # Errors
    ///
    /// - [`TrafficError::InvalidArgument`] if `coord` is out of range (no call is made)
    /// - [`TrafficError::ProviderUnavailable`] on transport failure, timeout or error status
    /// - [`TrafficError::MalformedResponse`] if a required field is missing or mistyped
    pub async fn sample(&self, coord: Coordinate) -> Result<TrafficSample> {
        coord.validate()?;

        let start = Instant::now();
        let reply = match tokio::time::timeout(self.timeout, self.provider.query(coord)).await {
            Ok(reply) => reply?,
            Err(_) => {
                return Err(TrafficError::ProviderUnavailable(format!(
                    "provider did not answer within {:?}",
                    self.timeout
                )));
            }
        };

        let sample = normalize(coord, reply)?;
        debug!(
            "[TrafficSampler] {} -> {:.0} km/h, congestion {} in {:?}",
            coord,
            sample.current_speed,
            sample.congestion_score,
            start.elapsed()
        );
        Ok(sample)
    }
}

/// Turn a provider envelope into a [`TrafficSample`] for the `requested` coordinate.
pub fn normalize(requested: Coordinate, reply: ProviderReply) -> Result<TrafficSample> {
    if !reply.is_success() {
        let message = reply
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
        return Err(TrafficError::ProviderUnavailable(message));
    }

    let traffic = match reply.traffic {
        Some(Value::Object(map)) => map,
        Some(_) => return Err(malformed("`traffic` is not an object")),
        None => return Err(malformed("`traffic` is missing")),
    };

    let current_speed = non_negative(&traffic, "currentSpeed")?;
    let free_flow_speed = non_negative(&traffic, "freeFlowSpeed")?;
    let travel_time = non_negative(&traffic, "currentTravelTime")?;
    if travel_time > u32::MAX as f64 {
        return Err(malformed("`currentTravelTime` is out of range"));
    }
    if travel_time.fract() != 0.0 {
        return Err(malformed(&format!(
            "`currentTravelTime` is not a whole number of seconds ({})",
            travel_time
        )));
    }
    let congestion_score = percentage(&traffic, "congestionScore")?;
    let confidence = percentage(&traffic, "confidence")?;
    let road_closure = traffic
        .get("roadClosure")
        .and_then(Value::as_bool)
        .ok_or_else(|| malformed("`roadClosure` is missing or not a boolean"))?;
    let road_class = traffic
        .get("roadClass")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let coordinate = reply
        .location
        .as_ref()
        .and_then(matched_location)
        .unwrap_or(requested);

    Ok(TrafficSample {
        current_speed,
        free_flow_speed,
        current_travel_time: travel_time as u32,
        congestion_score,
        road_closure,
        road_class,
        confidence,
        coordinate,
        segment_point_count: reply.coordinates.map_or(0, |c| c.len()),
        sampled_at: Utc::now(),
    })
}

fn malformed(detail: &str) -> TrafficError {
    TrafficError::MalformedResponse(detail.to_string())
}

fn number(traffic: &Map<String, Value>, field: &str) -> Result<f64> {
    traffic
        .get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| malformed(&format!("`{}` is missing or not numeric", field)))
}

fn non_negative(traffic: &Map<String, Value>, field: &str) -> Result<f64> {
    let value = number(traffic, field)?;
    if value < 0.0 {
        return Err(malformed(&format!("`{}` is negative ({})", field, value)));
    }
    Ok(value)
}

fn percentage(traffic: &Map<String, Value>, field: &str) -> Result<f64> {
    let value = number(traffic, field)?;
    if !(0.0..=100.0).contains(&value) {
        return Err(malformed(&format!("`{}` is outside 0-100 ({})", field, value)));
    }
    Ok(value)
}

/// The provider snaps queries to the nearest road; prefer that location when it is usable.
fn matched_location(location: &Value) -> Option<Coordinate> {
    let coord = Coordinate::new(
        location.get("latitude")?.as_f64()?,
        location.get("longitude")?.as_f64()?,
    );
    coord.is_valid().then_some(coord)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{success_reply, ScriptedProvider};
    use serde_json::json;
    use std::sync::Arc;

    fn reply(value: Value) -> ProviderReply {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_success() {
        let requested = Coordinate::new(28.6, 77.2);
        let sample = normalize(requested, reply(success_reply(30.0, 40.0, false))).unwrap();

        assert_eq!(sample.current_speed, 30.0);
        assert_eq!(sample.free_flow_speed, 50.0);
        assert_eq!(sample.current_travel_time, 120);
        assert_eq!(sample.congestion_score, 40.0);
        assert!(!sample.road_closure);
        assert_eq!(sample.road_class, "FRC2");
        assert_eq!(sample.coordinate, requested);
        assert_eq!(sample.segment_point_count, 2);
    }

    #[test]
    fn test_normalize_prefers_matched_location() {
        let mut value = success_reply(30.0, 40.0, false);
        value["location"] = json!({ "latitude": 28.61, "longitude": 77.21 });
        let sample = normalize(Coordinate::new(28.6, 77.2), reply(value)).unwrap();
        assert_eq!(sample.coordinate, Coordinate::new(28.61, 77.21));
    }

    #[test]
    fn test_normalize_error_status_carries_message() {
        let err = normalize(
            Coordinate::new(0.0, 0.0),
            reply(json!({ "status": "error", "message": "TomTom quota exceeded" })),
        )
        .unwrap_err();
        assert_eq!(err, TrafficError::ProviderUnavailable("TomTom quota exceeded".into()));

        let err = normalize(Coordinate::new(0.0, 0.0), reply(json!({ "status": "error" }))).unwrap_err();
        assert_eq!(err, TrafficError::ProviderUnavailable(DEFAULT_ERROR_MESSAGE.into()));
    }

    #[test]
    fn test_normalize_missing_numeric_field() {
        let mut value = success_reply(30.0, 40.0, false);
        value["traffic"].as_object_mut().unwrap().remove("freeFlowSpeed");
        let err = normalize(Coordinate::new(0.0, 0.0), reply(value)).unwrap_err();
        assert!(matches!(err, TrafficError::MalformedResponse(ref m) if m.contains("freeFlowSpeed")));
    }

    #[test]
    fn test_normalize_non_numeric_field() {
        let mut value = success_reply(30.0, 40.0, false);
        value["traffic"]["congestionScore"] = json!("high");
        let err = normalize(Coordinate::new(0.0, 0.0), reply(value)).unwrap_err();
        assert!(matches!(err, TrafficError::MalformedResponse(_)));
    }

    #[test]
    fn test_normalize_fractional_travel_time() {
        let mut value = success_reply(30.0, 40.0, false);
        value["traffic"]["currentTravelTime"] = json!(119.6);
        let err = normalize(Coordinate::new(0.0, 0.0), reply(value)).unwrap_err();
        assert!(matches!(err, TrafficError::MalformedResponse(ref m) if m.contains("currentTravelTime")));

        // Integral floats are fine
        let mut value = success_reply(30.0, 40.0, false);
        value["traffic"]["currentTravelTime"] = json!(120.0);
        let sample = normalize(Coordinate::new(0.0, 0.0), reply(value)).unwrap();
        assert_eq!(sample.current_travel_time, 120);
    }

    #[test]
    fn test_normalize_missing_traffic_object() {
        let err = normalize(Coordinate::new(0.0, 0.0), reply(json!({ "status": "success" }))).unwrap_err();
        assert!(matches!(err, TrafficError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_invalid_coordinate_skips_provider() {
        let provider = Arc::new(ScriptedProvider::always(success_reply(30.0, 40.0, false)));
        let sampler = TrafficSampler::new(Arc::clone(&provider), Duration::from_secs(1));

        let err = sampler.sample(Coordinate::new(95.0, 0.0)).await.unwrap_err();
        assert!(matches!(err, TrafficError::InvalidArgument(_)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_is_unavailable() {
        let provider = ScriptedProvider::new(vec![Err("connection refused".to_string())]);
        let sampler = TrafficSampler::new(provider, Duration::from_secs(1));

        let err = sampler.sample(Coordinate::new(28.6, 77.2)).await.unwrap_err();
        assert_eq!(err, TrafficError::ProviderUnavailable("connection refused".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_unavailable() {
        let provider = ScriptedProvider::always(success_reply(30.0, 40.0, false))
            .with_delay(Duration::from_secs(5));
        let sampler = TrafficSampler::new(provider, Duration::from_millis(500));
        assert_eq!(sampler.timeout(), Duration::from_millis(500));

        let err = sampler.sample(Coordinate::new(28.6, 77.2)).await.unwrap_err();
        assert!(matches!(err, TrafficError::ProviderUnavailable(_)));
    }
}
