//! Route congestion analysis.
//!
//! A route is reduced to evenly spaced checkpoints on the straight line between
//! its endpoints. Every checkpoint is sampled concurrently, failed and
//! zero-speed samples are dropped, and the rest are averaged into a
//! [`RouteSummary`]. One bad checkpoint never sinks the whole route; only a
//! route with no usable checkpoint fails, with [`TrafficError::NoRouteData`].

use futures::stream::{self, StreamExt};
use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::congestion::{CongestionBands, CongestionLevel};
use crate::geo_utils;
use crate::provider::TrafficProvider;
use crate::sampler::TrafficSampler;
use crate::{
    Coordinate, MonitorConfig, Result, RouteQuery, TrafficError, TrafficSample,
    DEFAULT_CHECKPOINT_COUNT,
};

/// Aggregated congestion along a route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    /// Mean congestion score of the usable checkpoints (0-100)
    pub average_congestion: f64,
    /// Mean current speed of the usable checkpoints, km/h
    pub average_speed: f64,
    /// Great-circle distance between the endpoints
    pub distance_km: f64,
    /// `distance_km / average_speed`, in minutes
    pub estimated_travel_time_min: f64,
    pub valid_checkpoint_count: usize,
    pub discarded_checkpoint_count: usize,
    /// Classification of `average_congestion` on the route scale
    pub congestion_level: CongestionLevel,
    /// Checkpoints that were sampled, start to end
    pub checkpoints: Vec<Coordinate>,
}

/// Receives the outcome of every [`RouteAnalyzer::analyze_route`] call, exactly once.
pub trait RouteObserver: Send + Sync {
    fn on_route_result(&self, result: &Result<RouteSummary>);
}

impl<F> RouteObserver for F
where
    F: Fn(&Result<RouteSummary>) + Send + Sync,
{
    fn on_route_result(&self, result: &Result<RouteSummary>) {
        self(result)
    }
}

/// Samples checkpoints along a route and aggregates them.
pub struct RouteAnalyzer<P> {
    sampler: TrafficSampler<P>,
    checkpoint_count: usize,
    observer: Option<Arc<dyn RouteObserver>>,
}

impl<P: TrafficProvider> RouteAnalyzer<P> {
    pub fn new(sampler: TrafficSampler<P>) -> Self {
        Self {
            sampler,
            checkpoint_count: DEFAULT_CHECKPOINT_COUNT,
            observer: None,
        }
    }

    pub fn from_config(provider: P, config: &MonitorConfig) -> Self {
        Self::new(TrafficSampler::from_config(provider, config)).with_checkpoint_count(config.checkpoint_count)
    }

    /// Checkpoint count used by [`RouteAnalyzer::analyze`].
    pub fn with_checkpoint_count(mut self, checkpoint_count: usize) -> Self {
        self.checkpoint_count = checkpoint_count;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RouteObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Analyze the route from `start` to `end` with the configured checkpoint count.
    pub async fn analyze(&self, start: Coordinate, end: Coordinate) -> Result<RouteSummary> {
        let query = RouteQuery::new(start, end).with_checkpoint_count(self.checkpoint_count);
        self.analyze_route(query).await
    }

    /// Analyze a route and report the outcome to the observer, if any.
    ///
    /// All checkpoint queries are issued before any is awaited, so latency is
    /// bounded by the slowest checkpoint rather than their sum.
    ///
    /// # Errors
    ///
    /// - [`TrafficError::InvalidArgument`] for a bad endpoint or fewer than 2 checkpoints
    /// - [`TrafficError::NoRouteData`] if no checkpoint produced a usable sample
    pub async fn analyze_route(&self, query: RouteQuery) -> Result<RouteSummary> {
        let result = self.run(query).await;
        if let Some(observer) = &self.observer {
            observer.on_route_result(&result);
        }
        result
    }

    async fn run(&self, query: RouteQuery) -> Result<RouteSummary> {
        query.start.validate()?;
        query.end.validate()?;
        let checkpoints = geo_utils::checkpoints(query.start, query.end, query.checkpoint_count)?;

        info!(
            "[RouteAnalyzer] sampling {} checkpoints from {} to {}",
            checkpoints.len(),
            query.start,
            query.end
        );
        let start = Instant::now();

        let results: Vec<Result<TrafficSample>> = stream::iter(checkpoints.clone())
            .map(|checkpoint| self.sampler.sample(checkpoint))
            .buffer_unordered(checkpoints.len())
            .collect()
            .await;

        let summary = summarize(&query, checkpoints, results);
        match &summary {
            Ok(s) => info!(
                "[RouteAnalyzer] DONE: {}/{} checkpoints usable in {:?}, {:.2} km, {:.0}% congestion ({})",
                s.valid_checkpoint_count,
                s.valid_checkpoint_count + s.discarded_checkpoint_count,
                start.elapsed(),
                s.distance_km,
                s.average_congestion,
                s.congestion_level.label
            ),
            Err(e) => info!("[RouteAnalyzer] FAILED in {:?}: {}", start.elapsed(), e),
        }
        summary
    }
}

/// Aggregate checkpoint results into a summary.
///
/// A result is usable when it succeeded with a current speed above zero, which
/// keeps the travel-time division well defined.
pub fn summarize(
    query: &RouteQuery,
    checkpoints: Vec<Coordinate>,
    results: Vec<Result<TrafficSample>>,
) -> Result<RouteSummary> {
    let total = results.len();
    let valid: Vec<TrafficSample> = results
        .into_iter()
        .filter_map(|result| match result {
            Ok(sample) if sample.current_speed > 0.0 => Some(sample),
            Ok(sample) => {
                debug!("[RouteAnalyzer] discarding zero-speed sample at {}", sample.coordinate);
                None
            }
            Err(e) => {
                debug!("[RouteAnalyzer] discarding failed checkpoint: {}", e);
                None
            }
        })
        .collect();

    if valid.is_empty() {
        return Err(TrafficError::NoRouteData);
    }

    let n = valid.len() as f64;
    let average_congestion = valid.iter().map(|s| s.congestion_score).sum::<f64>() / n;
    let average_speed = valid.iter().map(|s| s.current_speed).sum::<f64>() / n;
    let distance_km = geo_utils::distance_km(&query.start, &query.end);

    Ok(RouteSummary {
        average_congestion,
        average_speed,
        distance_km,
        estimated_travel_time_min: distance_km / average_speed * 60.0,
        valid_checkpoint_count: valid.len(),
        discarded_checkpoint_count: total - valid.len(),
        congestion_level: CongestionBands::Route.classify(average_congestion),
        checkpoints,
    })
}
