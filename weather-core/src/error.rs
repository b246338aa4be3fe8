use std::fmt;

use thiserror::Error;

/// Which provider request an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Current,
    Forecast,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Current => "current weather",
            Endpoint::Forecast => "forecast",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single fetch attempt.
///
/// `Display` is the message shown to the user; the extra fields exist for logs.
/// None of these are retried and none are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Please enter a city name.")]
    EmptyCity,

    #[error("City not found.")]
    NotFound,

    #[error("Network error. Please check your connection.")]
    Network { endpoint: Endpoint, detail: String },

    #[error("Failed to fetch {endpoint}.")]
    FetchFailed {
        endpoint: Endpoint,
        /// `None` when the response was 2xx but the body could not be decoded.
        status: Option<u16>,
    },

    #[error(transparent)]
    Geolocation(#[from] GeolocationError),
}

impl FetchError {
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("Unable to retrieve your location.")]
    Denied,
    #[error("Unable to retrieve your location.")]
    Unavailable,
    #[error("Unable to retrieve your location.")]
    Timeout,
    #[error("Geolocation is not supported on this device.")]
    Unsupported,
}

/// Persistence failures from a [`crate::store::KeyValueStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store data is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("'{0}' is not a hex colour like #0077ff")]
    InvalidAccent(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
