//! Fetch lifecycle and the view state a presentation layer renders.
//!
//! `Idle -> Loading -> Success | Failed`, and back to `Loading` on the next
//! attempt. Every attempt takes a new generation number; a response that
//! arrives after a newer attempt started is dropped without touching the view.
//!
//! Two background tasks hang off the state and are owned through their
//! abort handles:
//! - the error timer clears `error_message` after [`ERROR_CLEAR_DELAY`];
//! - the ticker refreshes `local_time_display` every second while a snapshot
//!   is shown.
//!
//! Both are cancelled before being re-armed and hold only weak references, so
//! dropping the last [`Orchestrator`] handle stops them.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::{
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::{
    task::AbortHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    clock::{Clock, SystemClock},
    error::{FetchError, StoreError},
    geolocation::{Geolocator, NoGeolocation},
    model::{ForecastEntry, Query, WeatherBundle, WeatherSnapshot, format_local_time},
    provider::WeatherProvider,
    store::{KeyValueStore, SavedCities},
    units::DisplayUnit,
};

pub const ERROR_CLEAR_DELAY: Duration = Duration::from_secs(5);
const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Failed,
}

/// Everything the presentation layer needs to draw one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub city_input: String,
    pub status: FetchStatus,
    pub current: Option<WeatherSnapshot>,
    pub forecast: Vec<ForecastEntry>,
    pub error_message: Option<String>,
    pub display_unit: DisplayUnit,
    pub last_updated_at: Option<DateTime<Utc>>,
    /// `HH:MM:SS` at the shown location.
    pub local_time_display: Option<String>,
    pub saved_cities: SavedCities,
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    /// Advice for the current condition, if there is a snapshot and a tip for it.
    pub fn tip(&self) -> Option<&'static str> {
        self.current.as_ref().and_then(|snap| snap.condition.tip())
    }

    pub fn display_temp(&self, celsius: f64) -> i64 {
        self.display_unit.temperature(celsius)
    }

    pub fn display_wind(&self, speed_ms: f64) -> i64 {
        self.display_unit.wind(speed_ms)
    }

    pub fn display_visibility(&self, meters: f64) -> String {
        self.display_unit.visibility(meters)
    }
}

#[derive(Debug)]
struct Shared {
    view: ViewState,
    generation: u64,
    error_epoch: u64,
    error_timer: Option<AbortHandle>,
    ticker: Option<AbortHandle>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        cancel(&mut self.error_timer);
        cancel(&mut self.ticker);
    }
}

#[derive(Debug)]
struct Inner {
    provider: Arc<dyn WeatherProvider>,
    geolocator: Arc<dyn Geolocator>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    state: Mutex<Shared>,
}

/// Owns the view state and runs the user's actions against it.
///
/// Cheap to clone; clones share state. Actions must run inside a tokio runtime.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

pub struct OrchestratorBuilder {
    provider: Arc<dyn WeatherProvider>,
    store: Arc<dyn KeyValueStore>,
    geolocator: Arc<dyn Geolocator>,
    clock: Arc<dyn Clock>,
    display_unit: DisplayUnit,
}

impl OrchestratorBuilder {
    pub fn geolocator(mut self, geolocator: Arc<dyn Geolocator>) -> Self {
        self.geolocator = geolocator;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn display_unit(mut self, unit: DisplayUnit) -> Self {
        self.display_unit = unit;
        self
    }

    /// Loads the saved-city list from the store and starts in `Idle`.
    pub fn build(self) -> Orchestrator {
        let view = ViewState {
            display_unit: self.display_unit,
            saved_cities: SavedCities::load(self.store.as_ref()),
            ..ViewState::default()
        };

        Orchestrator {
            inner: Arc::new(Inner {
                provider: self.provider,
                geolocator: self.geolocator,
                store: self.store,
                clock: self.clock,
                state: Mutex::new(Shared {
                    view,
                    generation: 0,
                    error_epoch: 0,
                    error_timer: None,
                    ticker: None,
                }),
            }),
        }
    }
}

impl Orchestrator {
    pub fn builder(
        provider: Arc<dyn WeatherProvider>,
        store: Arc<dyn KeyValueStore>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            provider,
            store,
            geolocator: Arc::new(NoGeolocation),
            clock: Arc::new(SystemClock),
            display_unit: DisplayUnit::default(),
        }
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> ViewState {
        self.inner.state.lock().view.clone()
    }

    pub fn set_city_input(&self, text: &str) {
        self.inner.state.lock().view.city_input = text.to_string();
    }

    pub fn set_display_unit(&self, unit: DisplayUnit) {
        self.inner.state.lock().view.display_unit = unit;
    }

    /// Looks up `city`. Blank input fails immediately without a request.
    ///
    /// The returned result is this attempt's own outcome; if a newer attempt
    /// started meanwhile the view reflects that one instead.
    pub async fn submit(&self, city: &str) -> Result<(), FetchError> {
        match Query::city(city) {
            Ok(query) => self.fetch(query).await,
            Err(err) => {
                self.fail_without_request(&err);
                Err(err)
            }
        }
    }

    pub async fn select_saved_city(&self, name: &str) -> Result<(), FetchError> {
        self.submit(name).await
    }

    pub async fn use_current_location(&self) -> Result<(), FetchError> {
        match self.inner.geolocator.current_position().await {
            Ok(coords) => self.fetch(Query::Coordinates(coords)).await,
            Err(err) => {
                let err = FetchError::from(err);
                self.fail_without_request(&err);
                Err(err)
            }
        }
    }

    /// Returns whether `name` was in the list.
    pub fn remove_saved_city(&self, name: &str) -> Result<bool, StoreError> {
        let mut shared = self.inner.state.lock();
        let removed = shared.view.saved_cities.remove(self.inner.store.as_ref(), name)?;
        if removed {
            info!(city = name, "removed saved city");
        }
        Ok(removed)
    }

    pub fn clear_saved_cities(&self) -> Result<(), StoreError> {
        let mut shared = self.inner.state.lock();
        shared.view.saved_cities.clear(self.inner.store.as_ref())?;
        info!("cleared saved cities");
        Ok(())
    }

    async fn fetch(&self, query: Query) -> Result<(), FetchError> {
        let generation = {
            let mut shared = self.inner.state.lock();
            shared.generation += 1;
            shared.view.status = FetchStatus::Loading;
            clear_error(&mut shared);
            shared.generation
        };
        debug!(%query, generation, "fetch started");

        let result = self.inner.provider.fetch_current_and_forecast(&query).await;

        let mut shared = self.inner.state.lock();
        if shared.generation != generation {
            debug!(generation, latest = shared.generation, "discarding stale weather response");
            return result.map(|_| ());
        }

        match result {
            Ok(bundle) => {
                apply_success(&self.inner, &mut shared, bundle);
                Ok(())
            }
            Err(err) => {
                info!(%query, error = ?err, "fetch failed");
                apply_failure(&self.inner, &mut shared, &err);
                Err(err)
            }
        }
    }

    /// Validation and geolocation failures: no attempt was made, so the
    /// weather already on screen stays.
    fn fail_without_request(&self, err: &FetchError) {
        let mut shared = self.inner.state.lock();
        shared.view.status = FetchStatus::Failed;
        set_error(&self.inner, &mut shared, err.user_message());
    }
}

fn apply_success(inner: &Arc<Inner>, shared: &mut Shared, bundle: WeatherBundle) {
    let WeatherBundle { current, forecast } = bundle;
    let name = current.location_name.clone();

    shared.view.status = FetchStatus::Success;
    shared.view.city_input = name.clone();
    shared.view.current = Some(current);
    shared.view.forecast = forecast;
    shared.view.last_updated_at = Some(inner.clock.now());
    clear_error(shared);

    match shared.view.saved_cities.add(inner.store.as_ref(), &name) {
        Ok(true) => info!(city = %name, "saved city"),
        Ok(false) => {}
        Err(err) => warn!(city = %name, error = %err, "could not persist saved city"),
    }

    start_ticker(inner, shared);
}

fn apply_failure(inner: &Arc<Inner>, shared: &mut Shared, err: &FetchError) {
    shared.view.status = FetchStatus::Failed;
    shared.view.current = None;
    shared.view.forecast.clear();
    shared.view.last_updated_at = None;
    shared.view.local_time_display = None;
    cancel(&mut shared.ticker);
    set_error(inner, shared, err.user_message());
}

fn cancel(handle: &mut Option<AbortHandle>) {
    if let Some(handle) = handle.take() {
        handle.abort();
    }
}

fn clear_error(shared: &mut Shared) {
    cancel(&mut shared.error_timer);
    shared.error_epoch += 1;
    shared.view.error_message = None;
}

/// Shows `message` and arms a fresh expiry timer. The epoch check stops a
/// timer that already woke up from clearing a newer message.
fn set_error(inner: &Arc<Inner>, shared: &mut Shared, message: String) {
    cancel(&mut shared.error_timer);
    shared.error_epoch += 1;
    shared.view.error_message = Some(message);

    let epoch = shared.error_epoch;
    let weak: Weak<Inner> = Arc::downgrade(inner);
    let handle = tokio::spawn(async move {
        tokio::time::sleep(ERROR_CLEAR_DELAY).await;
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let mut shared = inner.state.lock();
        if shared.error_epoch == epoch {
            shared.view.error_message = None;
            shared.error_timer = None;
            debug!("error message expired");
        }
    });
    shared.error_timer = Some(handle.abort_handle());
}

fn start_ticker(inner: &Arc<Inner>, shared: &mut Shared) {
    cancel(&mut shared.ticker);

    let Some(offset) = shared.view.current.as_ref().map(|s| s.timezone_offset_seconds) else {
        shared.view.local_time_display = None;
        return;
    };
    shared.view.local_time_display = Some(format_local_time(inner.clock.now(), offset));

    let weak: Weak<Inner> = Arc::downgrade(inner);
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + TICK, TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            let now = inner.clock.now();
            let mut shared = inner.state.lock();
            let Some(offset) = shared.view.current.as_ref().map(|s| s.timezone_offset_seconds)
            else {
                break;
            };
            shared.view.local_time_display = Some(format_local_time(now, offset));
        }
    });
    shared.ticker = Some(handle.abort_handle());
}
