use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    error::{Endpoint, FetchError},
    model::{Condition, Coordinates, ForecastEntry, Query, WeatherBundle, WeatherSnapshot},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// The free forecast covers five days in 3-hour steps.
pub const MAX_FORECAST_DAYS: usize = 5;

/// Provider's documented ceiling, reported when visibility is omitted.
const DEFAULT_VISIBILITY_M: f64 = 10_000.0;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Result<Self, reqwest::Error> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS)).build()?;

        Ok(Self { api_key, base_url: base_url.trim_end_matches('/').to_string(), http })
    }

    async fn request(&self, endpoint: Endpoint, query: &Query) -> Result<String, FetchError> {
        let path = match endpoint {
            Endpoint::Current => "weather",
            Endpoint::Forecast => "forecast",
        };
        let url = format!("{}/{}", self.base_url, path);

        let mut params: Vec<(&str, String)> = Vec::with_capacity(4);
        match query {
            Query::City(name) => params.push(("q", name.clone())),
            Query::Coordinates(c) => {
                params.push(("lat", c.latitude.to_string()));
                params.push(("lon", c.longitude.to_string()));
            }
        }
        params.push(("appid", self.api_key.clone()));
        params.push(("units", "metric".to_string()));

        // `without_url` keeps the API key out of messages and logs.
        let network = |err: reqwest::Error| FetchError::Network {
            endpoint,
            detail: err.without_url().to_string(),
        };

        let res = self.http.get(&url).query(&params).send().await.map_err(network)?;

        let status = res.status();
        let body = res.text().await.map_err(network)?;

        if !status.is_success() {
            debug!(
                %endpoint,
                %status,
                body = %truncate_body(&body),
                "OpenWeather request failed"
            );
            if endpoint == Endpoint::Current && status == StatusCode::NOT_FOUND {
                return Err(FetchError::NotFound);
            }
            return Err(FetchError::FetchFailed { endpoint, status: Some(status.as_u16()) });
        }

        Ok(body)
    }

    async fn fetch_current(&self, query: &Query) -> Result<WeatherSnapshot, FetchError> {
        let body = self.request(Endpoint::Current, query).await?;

        let parsed: OwCurrentResponse = serde_json::from_str(&body).map_err(|err| {
            debug!(
                error = %err,
                body = %truncate_body(&body),
                "Failed to parse OpenWeather current JSON"
            );
            FetchError::FetchFailed { endpoint: Endpoint::Current, status: None }
        })?;

        Ok(parsed.into_snapshot(Utc::now()))
    }

    async fn fetch_forecast(&self, query: &Query) -> Result<Vec<ForecastEntry>, FetchError> {
        let body = self.request(Endpoint::Forecast, query).await?;

        let parsed: OwForecastResponse = serde_json::from_str(&body).map_err(|err| {
            debug!(
                error = %err,
                body = %truncate_body(&body),
                "Failed to parse OpenWeather forecast JSON"
            );
            FetchError::FetchFailed { endpoint: Endpoint::Forecast, status: None }
        })?;

        Ok(daily_midday(parsed.list))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    #[tracing::instrument(skip(self, query), fields(query = %query))]
    async fn fetch_current_and_forecast(
        &self,
        query: &Query,
    ) -> Result<WeatherBundle, FetchError> {
        let current = self.fetch_current(query).await?;

        // Ask for the forecast at the place the provider resolved, so a
        // loosely spelled city name cannot resolve twice to different places.
        let forecast_query = match current.coordinates {
            Some(coords) => Query::Coordinates(coords),
            None => query.clone(),
        };
        let forecast = self.fetch_forecast(&forecast_query).await?;

        info!(
            location = %current.location_name,
            country = %current.country_code,
            days = forecast.len(),
            "fetched weather"
        );

        Ok(WeatherBundle { current, forecast })
    }
}

/// Keeps the 12:00:00 UTC step of each day, in provider order, at most
/// [`MAX_FORECAST_DAYS`]. Days without that step are skipped.
pub(crate) fn daily_midday(list: Vec<OwForecastItem>) -> Vec<ForecastEntry> {
    list.into_iter()
        .filter(|item| is_midday(item.dt))
        .take(MAX_FORECAST_DAYS)
        .map(OwForecastItem::into_entry)
        .collect()
}

fn is_midday(ts: i64) -> bool {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.hour() == 12 && dt.minute() == 0 && dt.second() == 0)
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    #[serde(default)]
    pressure: f64,
    #[serde(default)]
    humidity: u8,
}

#[derive(Debug, Clone, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize, Default)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize, Default)]
struct OwSys {
    #[serde(default)]
    country: String,
    #[serde(default)]
    sunrise: i64,
    #[serde(default)]
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    coord: Option<OwCoord>,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
    visibility: Option<f64>,
    #[serde(default)]
    sys: OwSys,
    #[serde(default)]
    timezone: i32,
}

impl OwCurrentResponse {
    fn into_snapshot(self, fetched_at: DateTime<Utc>) -> WeatherSnapshot {
        let weather = first_weather(&self.weather);

        WeatherSnapshot {
            location_name: self.name,
            country_code: self.sys.country,
            coordinates: self.coord.map(|c| Coordinates { latitude: c.lat, longitude: c.lon }),
            condition: Condition::from_main(&weather.main),
            condition_description: weather.description,
            icon_id: weather.icon,
            temp_c: self.main.temp,
            temp_min_c: self.main.temp_min,
            temp_max_c: self.main.temp_max,
            feels_like_c: self.main.feels_like,
            humidity_pct: self.main.humidity,
            wind_speed_ms: self.wind.speed,
            pressure_hpa: self.main.pressure,
            visibility_meters: self.visibility.unwrap_or(DEFAULT_VISIBILITY_M),
            sunrise_epoch: self.sys.sunrise,
            sunset_epoch: self.sys.sunset,
            timezone_offset_seconds: self.timezone,
            fetched_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwForecastItem {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

impl OwForecastItem {
    fn into_entry(self) -> ForecastEntry {
        let weather = first_weather(&self.weather);
        ForecastEntry {
            epoch_timestamp: self.dt,
            condition: Condition::from_main(&weather.main),
            condition_description: weather.description,
            icon_id: weather.icon,
            temp_min_c: self.main.temp_min,
            temp_max_c: self.main.temp_max,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastItem>,
}

fn first_weather(weather: &[OwWeather]) -> OwWeather {
    weather.first().cloned().unwrap_or_else(|| OwWeather {
        main: "Unknown".to_string(),
        description: "Unknown".to_string(),
        icon: String::new(),
    })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn item(ts: i64, main: &str) -> OwForecastItem {
        serde_json::from_value(json!({
            "dt": ts,
            "main": { "temp": 10.0, "feels_like": 9.0, "temp_min": 8.0, "temp_max": 12.0 },
            "weather": [{ "main": main, "description": main.to_lowercase(), "icon": "01d" }]
        }))
        .expect("valid forecast item")
    }

    fn at(day: u32, hour: u32) -> i64 {
        Utc.with_ymd_and_hms(2026, 5, day, hour, 0, 0).unwrap().timestamp()
    }

    #[test]
    fn keeps_only_midday_steps_in_order() {
        let mut list = Vec::new();
        for day in 1..=6 {
            for hour in (0..24).step_by(3) {
                list.push(item(at(day, hour), "Clear"));
            }
        }

        let days = daily_midday(list);

        assert_eq!(days.len(), MAX_FORECAST_DAYS);
        for (i, entry) in days.iter().enumerate() {
            assert_eq!(entry.epoch_timestamp, at(i as u32 + 1, 12));
        }
    }

    #[test]
    fn partial_day_without_midday_is_absent() {
        // Starts at 15:00 on day 1 and stops at 09:00 on day 3.
        let list = vec![
            item(at(1, 15), "Rain"),
            item(at(1, 18), "Rain"),
            item(at(2, 9), "Clouds"),
            item(at(2, 12), "Clouds"),
            item(at(2, 15), "Clouds"),
            item(at(3, 9), "Snow"),
        ];

        let days = daily_midday(list);

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].epoch_timestamp, at(2, 12));
        assert_eq!(days[0].condition, Condition::Clouds);
        assert_eq!(days[0].temp_min_c, 8.0);
        assert_eq!(days[0].temp_max_c, 12.0);
    }

    #[test]
    fn current_response_maps_to_snapshot() {
        let parsed: OwCurrentResponse = serde_json::from_value(json!({
            "coord": { "lon": 2.35, "lat": 48.85 },
            "weather": [{ "id": 800, "main": "Clear", "description": "clear sky", "icon": "01d" }],
            "main": {
                "temp": 15.0, "feels_like": 14.2, "temp_min": 13.1, "temp_max": 16.4,
                "pressure": 1018, "humidity": 62
            },
            "visibility": 10000,
            "wind": { "speed": 3.6, "deg": 250 },
            "dt": 1760000000,
            "sys": { "country": "FR", "sunrise": 1759990000, "sunset": 1760030000 },
            "timezone": 7200,
            "name": "Paris",
            "cod": 200
        }))
        .expect("valid current response");

        let now = Utc::now();
        let snap = parsed.into_snapshot(now);

        assert_eq!(snap.location_name, "Paris");
        assert_eq!(snap.country_code, "FR");
        assert_eq!(snap.condition, Condition::Clear);
        assert_eq!(snap.condition_description, "clear sky");
        assert_eq!(snap.temp_c, 15.0);
        assert_eq!(snap.humidity_pct, 62);
        assert_eq!(snap.pressure_hpa, 1018.0);
        assert_eq!(snap.visibility_meters, 10_000.0);
        assert_eq!(snap.timezone_offset_seconds, 7200);
        assert_eq!(snap.coordinates, Some(Coordinates { latitude: 48.85, longitude: 2.35 }));
        assert_eq!(snap.fetched_at, now);
    }

    #[test]
    fn missing_optional_fields_get_defaults() {
        let parsed: OwCurrentResponse = serde_json::from_value(json!({
            "name": "Nowhere",
            "main": { "temp": 1.0, "feels_like": 0.0, "temp_min": 0.5, "temp_max": 1.5 },
            "weather": []
        }))
        .expect("sparse current response");

        let snap = parsed.into_snapshot(Utc::now());
        assert_eq!(snap.country_code, "");
        assert_eq!(snap.visibility_meters, DEFAULT_VISIBILITY_M);
        assert_eq!(snap.condition, Condition::Other("Unknown".into()));
        assert!(snap.condition.tip().is_none());
        assert!(snap.coordinates.is_none());
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(150);
        let cut = truncate_body(&long);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
