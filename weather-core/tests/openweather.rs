//! OpenWeather client behaviour against a mock HTTP server.

use chrono::{TimeZone, Timelike, Utc};
use serde_json::{Value, json};
use weather_core::{
    Condition, Coordinates, Endpoint, FetchError, Query, WeatherProvider,
    provider::openweather::{MAX_FORECAST_DAYS, OpenWeatherProvider},
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-key";

fn current_body(name: &str, country: &str, temp: f64) -> Value {
    json!({
        "coord": { "lon": 2.35, "lat": 48.85 },
        "weather": [{ "id": 801, "main": "Clouds", "description": "few clouds", "icon": "02d" }],
        "main": {
            "temp": temp, "feels_like": temp - 1.0, "temp_min": temp - 2.0, "temp_max": temp + 2.0,
            "pressure": 1012, "humidity": 70
        },
        "visibility": 9000,
        "wind": { "speed": 4.1 },
        "dt": 1_792_324_800,
        "sys": { "country": country, "sunrise": 1_792_303_200, "sunset": 1_792_342_800 },
        "timezone": 7200,
        "name": name,
        "cod": 200
    })
}

/// Five days of 3-hour steps starting at midnight UTC, as the free API returns.
fn forecast_body() -> Value {
    let start = Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap().timestamp();
    let list: Vec<Value> = (0..40)
        .map(|i| {
            let dt = start + i * 3 * 3600;
            json!({
                "dt": dt,
                "main": {
                    "temp": 12.0,
                    "feels_like": 11.0,
                    "temp_min": 9.0 + i as f64 / 10.0,
                    "temp_max": 14.0
                },
                "weather": [{ "main": "Rain", "description": "light rain", "icon": "10d" }],
                "dt_txt": Utc.timestamp_opt(dt, 0).unwrap().format("%Y-%m-%d %H:%M:%S").to_string()
            })
        })
        .collect();

    json!({ "cod": "200", "cnt": 40, "list": list, "city": { "name": "Paris", "country": "FR" } })
}

async fn mount_forecast(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("lat", "48.85"))
        .and(query_param("lon", "2.35"))
        .and(query_param("appid", KEY))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .mount(server)
        .await;
}

fn provider(server: &MockServer) -> OpenWeatherProvider {
    OpenWeatherProvider::with_base_url(KEY.to_string(), server.uri()).expect("client builds")
}

#[tokio::test]
async fn test_fetch_city_returns_snapshot_and_daily_forecast() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "paris"))
        .and(query_param("appid", KEY))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body("Paris", "FR", 15.0)))
        .expect(1)
        .mount(&server)
        .await;
    mount_forecast(&server).await;

    let bundle = provider(&server)
        .fetch_current_and_forecast(&Query::City("paris".into()))
        .await
        .expect("fetch succeeds");

    let snap = &bundle.current;
    assert_eq!(snap.location_name, "Paris");
    assert_eq!(snap.country_code, "FR");
    assert_eq!(snap.temp_c, 15.0);
    assert_eq!(snap.condition, Condition::Clouds);
    assert_eq!(snap.visibility_meters, 9000.0);
    assert_eq!(snap.timezone_offset_seconds, 7200);

    assert_eq!(bundle.forecast.len(), MAX_FORECAST_DAYS);
    let mut previous = i64::MIN;
    for entry in &bundle.forecast {
        let at = Utc.timestamp_opt(entry.epoch_timestamp, 0).unwrap();
        assert_eq!((at.hour(), at.minute(), at.second()), (12, 0, 0));
        assert!(entry.epoch_timestamp > previous);
        previous = entry.epoch_timestamp;
        assert_eq!(entry.condition, Condition::Rain);
        assert_eq!(entry.icon_id, "10d");
    }
}

#[tokio::test]
async fn test_unknown_city_is_not_found_and_skips_forecast() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "cod": "404", "message": "city not found" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(0)
        .mount(&server)
        .await;

    let err = provider(&server)
        .fetch_current_and_forecast(&Query::City("Nonexistentville".into()))
        .await
        .unwrap_err();

    assert_eq!(err, FetchError::NotFound);
    assert_eq!(err.to_string(), "City not found.");
}

#[tokio::test]
async fn test_server_error_on_current_is_generic_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = provider(&server)
        .fetch_current_and_forecast(&Query::City("Paris".into()))
        .await
        .unwrap_err();

    assert_eq!(err, FetchError::FetchFailed { endpoint: Endpoint::Current, status: Some(500) });
    assert_eq!(err.to_string(), "Failed to fetch current weather.");
}

#[tokio::test]
async fn test_forecast_failure_fails_whole_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body("Paris", "FR", 15.0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = provider(&server)
        .fetch_current_and_forecast(&Query::City("Paris".into()))
        .await
        .unwrap_err();

    assert_eq!(err, FetchError::FetchFailed { endpoint: Endpoint::Forecast, status: Some(404) });
    assert_eq!(err.to_string(), "Failed to fetch forecast.");
}

#[tokio::test]
async fn test_undecodable_body_is_fetch_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .fetch_current_and_forecast(&Query::City("Paris".into()))
        .await
        .unwrap_err();

    assert_eq!(err, FetchError::FetchFailed { endpoint: Endpoint::Current, status: None });
}

#[tokio::test]
async fn test_coordinates_are_sent_as_lat_lon() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "48.85"))
        .and(query_param("lon", "2.35"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body("Paris", "FR", 9.5)))
        .expect(1)
        .mount(&server)
        .await;
    mount_forecast(&server).await;

    let coords = Coordinates { latitude: 48.85, longitude: 2.35 };
    let bundle = provider(&server)
        .fetch_current_and_forecast(&Query::Coordinates(coords))
        .await
        .expect("fetch succeeds");

    assert_eq!(bundle.current.location_name, "Paris");
    assert_eq!(bundle.current.temp_c, 9.5);
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // Nothing listens on port 1.
    let provider = OpenWeatherProvider::with_base_url(KEY.to_string(), "http://127.0.0.1:1".into())
        .expect("client builds");

    let err = provider
        .fetch_current_and_forecast(&Query::City("Paris".into()))
        .await
        .unwrap_err();

    match &err {
        FetchError::Network { endpoint, detail } => {
            assert_eq!(*endpoint, Endpoint::Current);
            assert!(!detail.contains(KEY), "API key leaked into error: {detail}");
        }
        other => panic!("expected network error, got {other:?}"),
    }
    assert_eq!(err.to_string(), "Network error. Please check your connection.");
}
