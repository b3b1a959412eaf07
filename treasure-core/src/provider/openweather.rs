use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::{fmt, sync::Arc};
use tracing::debug;

use crate::{
    http::{HttpClient, ReqwestHttpClient, build_url, fetch_json},
    model::{LocationQuery, WeatherRequest, WeatherResponse},
    provider::{DateRequest, classify_date, unix_to_utc},
};

use super::WeatherProvider;

const CURRENT_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";
const FORECAST_DAYS: i64 = 5;

#[derive(Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    http: Arc<dyn HttpClient>,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_http_client(api_key, Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http_client(api_key: String, http: Arc<dyn HttpClient>) -> Self {
        Self { api_key, http }
    }

    fn url(&self, base: &str, location: &LocationQuery) -> Result<String> {
        let mut params: Vec<(&str, String)> = match location {
            LocationQuery::Address(address) => vec![("q", address.clone())],
            LocationQuery::Coordinate(c) => {
                vec![("lat", c.latitude.to_string()), ("lon", c.longitude.to_string())]
            }
        };
        params.push(("appid", self.api_key.clone()));
        params.push(("units", "metric".to_string()));

        let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        Ok(build_url(base, &params)?)
    }

    async fn fetch_current(&self, location: &LocationQuery) -> Result<WeatherResponse> {
        let url = self.url(CURRENT_URL, location)?;
        let parsed: OwCurrentResponse =
            fetch_json(self.http.as_ref(), &url, "OpenWeather current").await?;

        let observation_time = unix_to_utc(parsed.dt).unwrap_or_else(Utc::now);

        Ok(WeatherResponse {
            provider: "openweather".to_string(),
            location_name: parsed.name,
            temperature_c: parsed.main.temp,
            feels_like_c: parsed.main.feels_like,
            condition: describe(&parsed.weather),
            humidity_pct: parsed.main.humidity,
            wind_speed_mps: parsed.wind.speed,
            observation_time,
        })
    }

    async fn fetch_forecast(
        &self,
        location: &LocationQuery,
        when: DateTime<Utc>,
    ) -> Result<WeatherResponse> {
        let url = self.url(FORECAST_URL, location)?;
        let parsed: OwForecastResponse =
            fetch_json(self.http.as_ref(), &url, "OpenWeather forecast").await?;

        let target_ts = when.timestamp();

        let entry = parsed
            .list
            .iter()
            .min_by_key(|e| (e.dt - target_ts).abs())
            .ok_or_else(|| anyhow!("OpenWeather forecast response contained no data"))?;

        debug!(target_ts, entry_ts = entry.dt, "picked closest forecast entry");

        let observation_time = unix_to_utc(entry.dt).unwrap_or_else(Utc::now);
        let location_name = format!("{}, {}", parsed.city.name, parsed.city.country);

        Ok(WeatherResponse {
            provider: "openweather".to_string(),
            location_name,
            temperature_c: entry.main.temp,
            feels_like_c: entry.main.feels_like,
            condition: describe(&entry.weather),
            humidity_pct: entry.main.humidity,
            wind_speed_mps: entry.wind.speed,
            observation_time,
        })
    }
}

impl fmt::Debug for OpenWeatherProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherProvider").finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherResponse> {
        let now = Utc::now();

        match classify_date(now, request.when) {
            DateRequest::Current => self.fetch_current(&request.location).await,
            DateRequest::Past(dt) => Err(anyhow!(
                "Historical weather ({}) is not supported by free OpenWeather API.\n\
                 Only current weather and up to {FORECAST_DAYS} days forecast are available.",
                dt
            )),
            DateRequest::Future(dt) => {
                let max_forecast = now + chrono::Duration::days(FORECAST_DAYS);
                if dt > max_forecast {
                    Err(anyhow!(
                        "Requested date {} exceeds the {FORECAST_DAYS}-day forecast limit of free OpenWeather API.\n\
                         Allowed range: now .. {}.",
                        dt,
                        max_forecast
                    ))
                } else {
                    self.fetch_forecast(&request.location, dt).await
                }
            }
        }
    }
}

fn describe(weather: &[OwWeather]) -> String {
    weather.first().map(|w| w.description.clone()).unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geo::Coordinate,
        http::{HttpResponse, MockHttpClient},
    };
    use chrono::Duration;

    const CURRENT_BODY: &str = r#"{
        "name": "Paris",
        "dt": 1717243200,
        "main": { "temp": 21.5, "feels_like": 20.9, "humidity": 55 },
        "weather": [{ "description": "scattered clouds" }],
        "wind": { "speed": 3.6 }
    }"#;

    fn ok(body: &str) -> Result<HttpResponse, crate::error::HttpError> {
        Ok(HttpResponse { status: 200, body: body.to_string() })
    }

    fn provider(http: MockHttpClient) -> OpenWeatherProvider {
        OpenWeatherProvider::with_http_client("KEY".into(), Arc::new(http))
    }

    #[tokio::test]
    async fn current_weather_by_address() {
        let mut http = MockHttpClient::new();
        http.expect_get()
            .withf(|url| {
                url.starts_with(CURRENT_URL)
                    && url.contains("q=Paris")
                    && url.contains("appid=KEY")
                    && url.contains("units=metric")
            })
            .times(1)
            .returning(|_| ok(CURRENT_BODY));

        let res = provider(http)
            .get_weather(&WeatherRequest::address("Paris", None))
            .await
            .expect("current weather");

        assert_eq!(res.provider, "openweather");
        assert_eq!(res.location_name, "Paris");
        assert_eq!(res.temperature_c, 21.5);
        assert_eq!(res.humidity_pct, 55);
        assert_eq!(res.condition, "scattered clouds");
        assert_eq!(res.observation_time.timestamp(), 1717243200);
    }

    #[tokio::test]
    async fn current_weather_by_coordinate_uses_lat_lon() {
        let mut http = MockHttpClient::new();
        http.expect_get()
            .withf(|url| url.contains("lat=48.8566") && url.contains("lon=2.3522") && !url.contains("q="))
            .times(1)
            .returning(|_| ok(CURRENT_BODY));

        let coord = Coordinate { latitude: 48.8566, longitude: 2.3522 };
        let res = provider(http).get_weather(&WeatherRequest::coordinate(coord, None)).await;

        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn forecast_picks_closest_entry() {
        let when = Utc::now() + Duration::days(2);
        let ts = when.timestamp();
        let body = format!(
            r#"{{
                "city": {{ "name": "Paris", "country": "FR" }},
                "list": [
                    {{ "dt": {early}, "main": {{ "temp": 10.0, "feels_like": 9.0, "humidity": 80 }},
                       "weather": [], "wind": {{ "speed": 1.0 }} }},
                    {{ "dt": {close}, "main": {{ "temp": 18.0, "feels_like": 17.0, "humidity": 60 }},
                       "weather": [{{ "description": "clear sky" }}], "wind": {{ "speed": 2.0 }} }}
                ]
            }}"#,
            early = ts - 86_400,
            close = ts + 1_800,
        );

        let mut http = MockHttpClient::new();
        http.expect_get()
            .withf(|url| url.starts_with(FORECAST_URL))
            .times(1)
            .returning(move |_| ok(&body));

        let res = provider(http)
            .get_weather(&WeatherRequest::address("Paris", Some(when)))
            .await
            .expect("forecast");

        assert_eq!(res.temperature_c, 18.0);
        assert_eq!(res.condition, "clear sky");
        assert_eq!(res.location_name, "Paris, FR");
    }

    #[tokio::test]
    async fn past_dates_are_rejected_without_a_request() {
        let mut http = MockHttpClient::new();
        http.expect_get().never();

        let when = Utc::now() - Duration::days(3);
        let err = provider(http)
            .get_weather(&WeatherRequest::address("Paris", Some(when)))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Historical weather"));
    }

    #[tokio::test]
    async fn dates_beyond_forecast_limit_are_rejected() {
        let mut http = MockHttpClient::new();
        http.expect_get().never();

        let when = Utc::now() + Duration::days(9);
        let err = provider(http)
            .get_weather(&WeatherRequest::address("Paris", Some(when)))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("5-day forecast limit"));
    }

    #[tokio::test]
    async fn error_status_is_reported_with_body() {
        let mut http = MockHttpClient::new();
        http.expect_get().returning(|_| {
            Ok(HttpResponse { status: 401, body: r#"{"message":"Invalid API key"}"#.into() })
        });

        let err = provider(http)
            .get_weather(&WeatherRequest::address("Paris", None))
            .await
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("status 401"));
        assert!(msg.contains("Invalid API key"));
    }

    #[tokio::test]
    async fn malformed_json_is_a_parse_error() {
        let mut http = MockHttpClient::new();
        http.expect_get().returning(|_| ok("{ not json"));

        let err = provider(http)
            .get_weather(&WeatherRequest::address("Paris", None))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Failed to parse OpenWeather current JSON"));
    }
}
