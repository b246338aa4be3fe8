use crate::{
    Config,
    error::FetchError,
    model::{Query, WeatherBundle},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions and the daily forecast for one place.
    ///
    /// Either both parts succeed or the whole call fails; a failure of the
    /// current-conditions request takes precedence over the forecast.
    async fn fetch_current_and_forecast(&self, query: &Query)
    -> Result<WeatherBundle, FetchError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
                 Hint: run `weather configure` and enter your API key, or set {}.",
            crate::config::API_KEY_ENV
        )
    })?;

    let provider = match &config.openweather.base_url {
        Some(base_url) => OpenWeatherProvider::with_base_url(api_key, base_url.clone())?,
        None => OpenWeatherProvider::new(api_key)?,
    };

    Ok(Box::new(provider))
}
