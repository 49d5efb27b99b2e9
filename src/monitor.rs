//! Single-point congestion monitoring.
//!
//! A [`PollingController`] owns the state for one monitored coordinate:
//!
//! - **One-shot fetch** ([`PollingController::fetch_once`]): shows the loading
//!   indicator, samples, reports success or failure.
//! - **Change detection**: a success is only reported when speed, free-flow
//!   speed, travel time, congestion score or closure differ from the last
//!   reported sample.
//! - **Auto-refresh** ([`PollingController::start_auto_refresh`]): an immediate
//!   foreground fetch, then silent background fetches. The next tick is
//!   scheduled from the completion of the previous fetch, so at most one
//!   fetch is ever in flight.
//!
//! Controllers are independent; monitor two coordinates with two controllers.

use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::provider::TrafficProvider;
use crate::sampler::TrafficSampler;
use crate::{Coordinate, Result, TrafficError, TrafficSample};

/// Poll state of one monitored coordinate.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Idle,
    Loading,
    Success(TrafficSample),
    Error(String),
}

/// Receives poll notifications.
///
/// `background` is true for updates produced by a silent auto-refresh tick.
/// Calls are made while the controller's state lock is held, so they arrive
/// in the same order the state changed; implementations must not block.
pub trait PollObserver: Send + Sync {
    fn on_poll_update(&self, state: &PollState, background: bool);

    /// Loading indicator, toggled around foreground fetches only.
    fn on_loading(&self, _loading: bool) {}
}

impl<F> PollObserver for F
where
    F: Fn(&PollState, bool) + Send + Sync,
{
    fn on_poll_update(&self, state: &PollState, background: bool) {
        self(state, background)
    }
}

struct PollShared {
    current: PollState,
    last_accepted: Option<TrafficSample>,
}

struct PollInner<P> {
    sampler: TrafficSampler<P>,
    observer: Option<Arc<dyn PollObserver>>,
    state: Mutex<PollShared>,
    /// Bumped on every stop; fetches that started under an older value are discarded.
    generation: AtomicU64,
}

impl<P: TrafficProvider> PollInner<P> {
    async fn fetch(&self, coord: Coordinate, background: bool) -> PollState {
        let generation = self.generation.load(Ordering::SeqCst);

        if !background {
            self.state.lock().await.current = PollState::Loading;
            if let Some(observer) = &self.observer {
                observer.on_loading(true);
            }
        }

        let result = self.sampler.sample(coord).await;

        if !background {
            if let Some(observer) = &self.observer {
                observer.on_loading(false);
            }
        }

        let mut shared = self.state.lock().await;
        let stale = self.generation.load(Ordering::SeqCst) != generation;

        match result {
            Ok(sample) => {
                let state = PollState::Success(sample.clone());
                if stale {
                    debug!("[PollingController] {} discarding sample completed after stop", coord);
                    return state;
                }

                let changed = shared
                    .last_accepted
                    .as_ref()
                    .map_or(true, |previous| sample.differs_from(previous));
                shared.current = state.clone();

                if changed {
                    shared.last_accepted = Some(sample);
                    self.notify(&state, background);
                } else {
                    debug!("[PollingController] {} unchanged, update suppressed", coord);
                }
                state
            }
            Err(err) => {
                let state = PollState::Error(err.to_string());
                if stale {
                    return state;
                }

                if background && err.is_retryable() {
                    warn!("[PollingController] {} background refresh failed: {}", coord, err);
                    return state;
                }

                shared.current = state.clone();
                self.notify(&state, background);
                state
            }
        }
    }

    fn notify(&self, state: &PollState, background: bool) {
        if let Some(observer) = &self.observer {
            observer.on_poll_update(state, background);
        }
    }
}

/// Fetch, change-detect and auto-refresh traffic for one coordinate.
pub struct PollingController<P> {
    inner: Arc<PollInner<P>>,
    refresh: Option<JoinHandle<()>>,
}

impl<P: TrafficProvider + 'static> PollingController<P> {
    /// Create a controller without an observer; poll results are only returned.
    pub fn new(sampler: TrafficSampler<P>) -> Self {
        Self::build(sampler, None)
    }

    /// Create a controller that reports to `observer`.
    pub fn with_observer(sampler: TrafficSampler<P>, observer: Arc<dyn PollObserver>) -> Self {
        Self::build(sampler, Some(observer))
    }

    fn build(sampler: TrafficSampler<P>, observer: Option<Arc<dyn PollObserver>>) -> Self {
        Self {
            inner: Arc::new(PollInner {
                sampler,
                observer,
                state: Mutex::new(PollShared {
                    current: PollState::Idle,
                    last_accepted: None,
                }),
                generation: AtomicU64::new(0),
            }),
            refresh: None,
        }
    }

    /// Fetch `coord` once in the foreground.
    ///
    /// The loading indicator is shown for the duration of the call, errors are
    /// always reported, and a success is reported only if it differs from the
    /// last reported sample. Returns the resulting state either way.
    pub async fn fetch_once(&self, coord: Coordinate) -> PollState {
        self.inner.fetch(coord, false).await
    }

    /// Start monitoring `coord`, replacing any running auto-refresh.
    ///
    /// Performs an immediate foreground fetch and returns its state; afterwards
    /// a background task fetches every `interval`, measured from the end of the
    /// previous fetch, until [`PollingController::stop_auto_refresh`].
    ///
    /// # Errors
    ///
    /// [`TrafficError::InvalidArgument`] for an out-of-range coordinate or a zero interval.
    pub async fn start_auto_refresh(&mut self, coord: Coordinate, interval: Duration) -> Result<PollState> {
        coord.validate()?;
        if interval.is_zero() {
            return Err(TrafficError::InvalidArgument(
                "refresh interval must be greater than zero".to_string(),
            ));
        }

        // the immediate fetch is always reported
        self.stop_auto_refresh().await;

        info!("[PollingController] monitoring {} every {:?}", coord, interval);
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let first = self.inner.fetch(coord, false).await;

        let inner = Arc::clone(&self.inner);
        self.refresh = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if inner.generation.load(Ordering::SeqCst) != generation {
                    break;
                }
                inner.fetch(coord, true).await;
            }
        }));

        Ok(first)
    }

    /// Cancel auto-refresh and forget the last reported sample.
    ///
    /// A pending tick never fires. A fetch already in flight is abandoned and
    /// its result is neither stored nor reported. The next fetch is always
    /// reported, whatever it returns.
    pub async fn stop_auto_refresh(&mut self) {
        {
            let mut shared = self.inner.state.lock().await;
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            shared.last_accepted = None;
        }
        if let Some(handle) = self.refresh.take() {
            handle.abort();
            info!("[PollingController] auto-refresh stopped");
        }
    }

    /// Stop auto-refresh and return to [`PollState::Idle`].
    pub async fn reset(&mut self) {
        self.stop_auto_refresh().await;
        self.inner.state.lock().await.current = PollState::Idle;
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.refresh.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Most recent state, including successes that were not reported.
    pub async fn state(&self) -> PollState {
        self.inner.state.lock().await.current.clone()
    }

    /// The sample change detection compares against.
    pub async fn last_accepted(&self) -> Option<TrafficSample> {
        self.inner.state.lock().await.last_accepted.clone()
    }
}

impl<P> Drop for PollingController<P> {
    fn drop(&mut self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.refresh.take() {
            handle.abort();
        }
    }
}
