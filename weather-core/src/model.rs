use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// What to look up.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    City(String),
    Coordinates(Coordinates),
}

impl Query {
    /// Builds a city query from user input, trimming whitespace.
    pub fn city(name: &str) -> Result<Self, FetchError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(FetchError::EmptyCity);
        }
        Ok(Query::City(trimmed.to_string()))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::City(name) => f.write_str(name),
            Query::Coordinates(c) => write!(f, "({c})"),
        }
    }
}

/// Provider condition category (`weather[0].main`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Mist,
    Fog,
    Smoke,
    Haze,
    Dust,
    Sand,
    Ash,
    Squall,
    Tornado,
    /// Anything the provider adds later. Carries the raw label, has no tip.
    Other(String),
}

impl Condition {
    pub fn from_main(main: &str) -> Self {
        match main {
            "Clear" => Self::Clear,
            "Clouds" => Self::Clouds,
            "Rain" => Self::Rain,
            "Drizzle" => Self::Drizzle,
            "Thunderstorm" => Self::Thunderstorm,
            "Snow" => Self::Snow,
            "Mist" => Self::Mist,
            "Fog" => Self::Fog,
            "Smoke" => Self::Smoke,
            "Haze" => Self::Haze,
            "Dust" => Self::Dust,
            "Sand" => Self::Sand,
            "Ash" => Self::Ash,
            "Squall" => Self::Squall,
            "Tornado" => Self::Tornado,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Clear => "Clear",
            Self::Clouds => "Clouds",
            Self::Rain => "Rain",
            Self::Drizzle => "Drizzle",
            Self::Thunderstorm => "Thunderstorm",
            Self::Snow => "Snow",
            Self::Mist => "Mist",
            Self::Fog => "Fog",
            Self::Smoke => "Smoke",
            Self::Haze => "Haze",
            Self::Dust => "Dust",
            Self::Sand => "Sand",
            Self::Ash => "Ash",
            Self::Squall => "Squall",
            Self::Tornado => "Tornado",
            Self::Other(label) => label,
        }
    }

    /// Short advice for the condition; `None` means no tip is shown.
    pub fn tip(&self) -> Option<&'static str> {
        let tip = match self {
            Self::Clear => "It's sunny! Don't forget your sunglasses and sunscreen.",
            Self::Clouds => "Cloudy skies. A light jacket might be needed.",
            Self::Rain => "Carry an umbrella or raincoat.",
            Self::Drizzle => "Light rain falling. Stay dry!",
            Self::Thunderstorm => "Stay indoors and avoid open areas during storms.",
            Self::Snow => "Dress warmly and be careful on icy roads.",
            Self::Mist => "Low visibility. Drive carefully and use fog lights.",
            Self::Fog => "Foggy conditions. Use fog lights and reduce speed.",
            Self::Smoke => "Air quality is poor. Avoid outdoor activities.",
            Self::Haze => "Visibility is reduced. Be cautious outdoors.",
            Self::Dust => "Dusty conditions. Protect your eyes and respiratory system.",
            Self::Sand => "Strong winds may blow sand. Wear protective gear.",
            Self::Ash => "Volcanic ash in the air. Stay indoors and avoid breathing it in.",
            Self::Squall => "Strong wind gusts expected. Secure loose objects.",
            Self::Tornado => "Tornado warning! Seek shelter immediately.",
            Self::Other(_) => return None,
        };
        Some(tip)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Current conditions for one location, metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location_name: String,
    pub country_code: String,
    pub coordinates: Option<Coordinates>,
    pub condition: Condition,
    pub condition_description: String,
    pub icon_id: String,
    pub temp_c: f64,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_ms: f64,
    pub pressure_hpa: f64,
    pub visibility_meters: f64,
    pub sunrise_epoch: i64,
    pub sunset_epoch: i64,
    pub timezone_offset_seconds: i32,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// Fixed offset of the location; falls back to UTC if the provider sent nonsense.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.timezone_offset_seconds).unwrap_or_else(|| Utc.fix())
    }

    /// Sunrise as wall-clock time at the location.
    pub fn sunrise_local(&self) -> Option<NaiveTime> {
        epoch_in_offset(self.sunrise_epoch, self.offset()).map(|dt| dt.time())
    }

    pub fn sunset_local(&self) -> Option<NaiveTime> {
        epoch_in_offset(self.sunset_epoch, self.offset()).map(|dt| dt.time())
    }

    pub fn icon_url(&self) -> String {
        format!("https://openweathermap.org/img/wn/{}@2x.png", self.icon_id)
    }
}

/// One retained forecast step per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub epoch_timestamp: i64,
    pub condition: Condition,
    pub condition_description: String,
    pub icon_id: String,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
}

impl ForecastEntry {
    pub fn date(&self) -> Option<NaiveDate> {
        DateTime::from_timestamp(self.epoch_timestamp, 0).map(|dt| dt.date_naive())
    }
}

/// Result of one successful fetch: current conditions plus daily forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherBundle {
    pub current: WeatherSnapshot,
    pub forecast: Vec<ForecastEntry>,
}

fn epoch_in_offset(epoch: i64, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp(epoch, 0).map(|dt| dt.with_timezone(&offset))
}

/// `HH:MM:SS` at a location `offset_seconds` east of UTC, regardless of the
/// viewing device's own timezone.
pub fn format_local_time(now: DateTime<Utc>, offset_seconds: i32) -> String {
    let local = now + chrono::Duration::seconds(i64::from(offset_seconds));
    local.format("%H:%M:%S").to_string()
}
