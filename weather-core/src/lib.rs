//! Core library for the `weather` client.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client behind the `WeatherProvider` trait
//! - The fetch orchestrator: view state, error expiry, local-time ticker
//! - Persisted preferences (theme, accent colour, saved cities)
//! - Unit conversion for display
//!
//! It is used by `weather-cli`, but any presentation layer can drive the
//! `Orchestrator` and render its `ViewState`.

pub mod clock;
pub mod config;
pub mod error;
pub mod geolocation;
pub mod model;
pub mod orchestrator;
pub mod preferences;
pub mod provider;
pub mod store;
pub mod units;

pub use clock::{AnchoredClock, Clock, SystemClock};
pub use config::Config;
pub use error::{Endpoint, FetchError, GeolocationError, PreferenceError, StoreError};
pub use geolocation::{FixedPosition, Geolocator, NoGeolocation};
pub use model::{
    Condition, Coordinates, ForecastEntry, Query, WeatherBundle, WeatherSnapshot,
};
pub use orchestrator::{FetchStatus, Orchestrator, ViewState};
pub use preferences::{PreferenceController, PreferenceState};
pub use provider::{WeatherProvider, provider_from_config};
pub use store::{FileStore, KeyValueStore, MemoryStore, SavedCities};
pub use units::DisplayUnit;
