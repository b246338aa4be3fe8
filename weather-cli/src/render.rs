//! Plain-text rendering of the view state.

use chrono::{Local, NaiveTime};
use std::fmt::Write;
use std::io::IsTerminal;
use weather_core::{PreferenceState, SavedCities, ViewState};

pub fn view(view: &ViewState, prefs: &PreferenceState) -> String {
    let mut out = String::new();
    let unit = view.display_unit;
    let deg = unit.temperature_symbol();

    if let Some(message) = &view.error_message {
        let _ = writeln!(out, "! {message}");
    }

    if let Some(snap) = &view.current {
        let title = if snap.country_code.is_empty() {
            snap.location_name.clone()
        } else {
            format!("{}, {}", snap.location_name, snap.country_code)
        };
        let _ = writeln!(out, "{}", accent(&title, &prefs.accent_color_hex));

        if let Some(local) = &view.local_time_display {
            let _ = writeln!(out, "Local time: {local}");
        }
        let _ = writeln!(out, "Weather: {}", snap.condition_description);
        let _ = writeln!(out, "Icon: {}", snap.icon_url());
        let _ = writeln!(out, "Temperature: {}{deg}", view.display_temp(snap.temp_c));
        let _ = writeln!(
            out,
            "Min: {}{deg} | Max: {}{deg}",
            view.display_temp(snap.temp_min_c),
            view.display_temp(snap.temp_max_c)
        );
        let _ = writeln!(out, "Feels like: {}{deg}", view.display_temp(snap.feels_like_c));
        let _ = writeln!(out, "Humidity: {}%", snap.humidity_pct);
        let _ = writeln!(
            out,
            "Wind: {} {}",
            view.display_wind(snap.wind_speed_ms),
            unit.wind_symbol()
        );
        let _ = writeln!(out, "Pressure: {:.0} hPa", snap.pressure_hpa);
        let _ = writeln!(
            out,
            "Visibility: {} {}",
            view.display_visibility(snap.visibility_meters),
            unit.distance_symbol()
        );
        let _ = writeln!(out, "Sunrise: {}", hour_minute(snap.sunrise_local()));
        let _ = writeln!(out, "Sunset: {}", hour_minute(snap.sunset_local()));
        if let Some(updated) = view.last_updated_at {
            let local = updated.with_timezone(&Local);
            let _ = writeln!(out, "Last updated: {}", local.format("%H:%M:%S"));
        }
        if let Some(tip) = view.tip() {
            let _ = writeln!(out, "Tip: {tip}");
        }
    }

    if !view.forecast.is_empty() {
        let _ = writeln!(out, "\n{}-day forecast", view.forecast.len());
        for day in &view.forecast {
            let label = day
                .date()
                .map(|d| d.format("%a, %b %-d").to_string())
                .unwrap_or_else(|| "?".to_string());
            let _ = writeln!(
                out,
                "  {label:<12} {:>4}° / {:>4}°  {}",
                view.display_temp(day.temp_min_c),
                view.display_temp(day.temp_max_c),
                day.condition
            );
        }
    }

    if !view.saved_cities.is_empty() {
        let _ = writeln!(out);
        out.push_str(&saved_cities(&view.saved_cities));
    }

    out
}

pub fn saved_cities(cities: &SavedCities) -> String {
    if cities.is_empty() {
        return "No saved cities.\n".to_string();
    }
    let mut out = format!("Saved cities ({}):\n", cities.len());
    for name in cities.names() {
        let _ = writeln!(out, "  - {name}");
    }
    out
}

pub fn preferences(prefs: &PreferenceState) -> String {
    format!(
        "Theme: {}\nAccent: {}\n",
        if prefs.is_dark_mode { "dark" } else { "light" },
        accent(&prefs.accent_color_hex, &prefs.accent_color_hex)
    )
}

fn hour_minute(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string()).unwrap_or_else(|| "--:--".to_string())
}

/// Colours `text` with the accent when stdout is a terminal.
fn accent(text: &str, hex: &str) -> String {
    if !std::io::stdout().is_terminal() {
        return text.to_string();
    }
    match hex_to_rgb(hex) {
        Some((r, g, b)) => format!("\x1b[1;38;2;{r};{g};{b}m{text}\x1b[0m"),
        None => text.to_string(),
    }
}

fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}
