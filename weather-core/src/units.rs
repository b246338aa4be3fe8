//! Conversions from the metric values stored in a snapshot to what gets displayed.
//!
//! Snapshots always hold metric data; nothing converted is ever stored.

use std::fmt;

use serde::{Deserialize, Serialize};

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

pub fn ms_to_mph(ms: f64) -> f64 {
    ms * 2.23694
}

pub fn meters_to_miles(m: f64) -> f64 {
    m / 1609.344
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayUnit {
    #[default]
    Metric,
    Imperial,
}

impl DisplayUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayUnit::Metric => "metric",
            DisplayUnit::Imperial => "imperial",
        }
    }

    /// Temperature rounded to the nearest whole degree.
    pub fn temperature(&self, celsius: f64) -> i64 {
        let value = match self {
            DisplayUnit::Metric => celsius,
            DisplayUnit::Imperial => celsius_to_fahrenheit(celsius),
        };
        value.round() as i64
    }

    pub fn wind(&self, speed_ms: f64) -> i64 {
        let value = match self {
            DisplayUnit::Metric => speed_ms,
            DisplayUnit::Imperial => ms_to_mph(speed_ms),
        };
        value.round() as i64
    }

    /// Kilometres or miles, one decimal place.
    pub fn visibility(&self, meters: f64) -> String {
        let value = match self {
            DisplayUnit::Metric => meters / 1000.0,
            DisplayUnit::Imperial => meters_to_miles(meters),
        };
        format!("{value:.1}")
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            DisplayUnit::Metric => "°C",
            DisplayUnit::Imperial => "°F",
        }
    }

    pub fn wind_symbol(&self) -> &'static str {
        match self {
            DisplayUnit::Metric => "m/s",
            DisplayUnit::Imperial => "mph",
        }
    }

    pub fn distance_symbol(&self) -> &'static str {
        match self {
            DisplayUnit::Metric => "km",
            DisplayUnit::Imperial => "miles",
        }
    }
}

impl fmt::Display for DisplayUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DisplayUnit {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "metric" | "c" | "celsius" => Ok(DisplayUnit::Metric),
            "imperial" | "f" | "fahrenheit" => Ok(DisplayUnit::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown units '{value}'. Supported units: metric, imperial."
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifteen_celsius_is_fifty_nine_fahrenheit() {
        assert_eq!(DisplayUnit::Metric.temperature(15.0), 15);
        assert_eq!(DisplayUnit::Imperial.temperature(15.0), 59);
    }

    #[test]
    fn temperature_rounds_to_nearest() {
        assert_eq!(DisplayUnit::Metric.temperature(21.6), 22);
        assert_eq!(DisplayUnit::Metric.temperature(-3.4), -3);
        // -40 is the same on both scales
        assert_eq!(DisplayUnit::Imperial.temperature(-40.0), -40);
    }

    #[test]
    fn wind_converts_to_mph() {
        assert_eq!(DisplayUnit::Metric.wind(4.6), 5);
        assert_eq!(DisplayUnit::Imperial.wind(10.0), 22);
    }

    #[test]
    fn visibility_has_one_decimal() {
        assert_eq!(DisplayUnit::Metric.visibility(10_000.0), "10.0");
        assert_eq!(DisplayUnit::Metric.visibility(2_345.0), "2.3");
        assert_eq!(DisplayUnit::Imperial.visibility(10_000.0), "6.2");
        assert_eq!(DisplayUnit::Imperial.visibility(1609.344), "1.0");
    }

    #[test]
    fn parse_units() {
        assert_eq!(DisplayUnit::try_from("Imperial").unwrap(), DisplayUnit::Imperial);
        assert_eq!(DisplayUnit::try_from("metric").unwrap(), DisplayUnit::Metric);
        let err = DisplayUnit::try_from("kelvin").unwrap_err();
        assert!(err.to_string().contains("Unknown units"));
    }
}
