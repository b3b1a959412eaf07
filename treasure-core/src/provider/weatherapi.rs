use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use serde::Deserialize;
use std::{fmt, sync::Arc};

use crate::{
    http::{HttpClient, ReqwestHttpClient, build_url, fetch_json},
    model::{LocationQuery, WeatherRequest, WeatherResponse},
    provider::{DateRequest, classify_date, unix_to_utc},
};

use super::WeatherProvider;

const CURRENT_URL: &str = "http://api.weatherapi.com/v1/current.json";
const FORECAST_URL: &str = "http://api.weatherapi.com/v1/forecast.json";
const HISTORY_URL: &str = "http://api.weatherapi.com/v1/history.json";

#[derive(Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    http: Arc<dyn HttpClient>,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_http_client(api_key, Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http_client(api_key: String, http: Arc<dyn HttpClient>) -> Self {
        Self { api_key, http }
    }

    async fn fetch_current(&self, request: &WeatherRequest) -> Result<WeatherResponse> {
        let q = query(&request.location);
        let url = build_url(CURRENT_URL, &[("key", self.api_key.as_str()), ("q", q.as_str())])?;

        let parsed: WaResponse =
            fetch_json(self.http.as_ref(), &url, "WeatherAPI current").await?;

        let ts = parsed.current.last_updated_epoch.or(parsed.location.localtime_epoch);
        let observation_time = ts.and_then(unix_to_utc).unwrap_or_else(Utc::now);

        let location_name = format!("{}, {}", parsed.location.name, parsed.location.country);
        let wind_speed_mps = kph_to_mps(parsed.current.wind_kph);

        Ok(WeatherResponse {
            provider: "weatherapi".to_string(),
            location_name,
            temperature_c: parsed.current.temp_c,
            feels_like_c: parsed.current.feelslike_c,
            condition: parsed.current.condition.text,
            humidity_pct: parsed.current.humidity,
            wind_speed_mps,
            observation_time,
        })
    }

    async fn fetch_at(
        &self,
        request: &WeatherRequest,
        when: DateTime<Utc>,
        is_forecast: bool,
    ) -> Result<WeatherResponse> {
        let (base_url, label) = if is_forecast {
            (FORECAST_URL, "WeatherAPI forecast")
        } else {
            (HISTORY_URL, "WeatherAPI history")
        };

        let unixdt = when.timestamp();
        let q = query(&request.location);
        let unixdt_param = unixdt.to_string();
        let hour_param = when.hour().to_string();
        let url = build_url(
            base_url,
            &[
                ("key", self.api_key.as_str()),
                ("q", q.as_str()),
                ("unixdt", unixdt_param.as_str()),
                ("hour", hour_param.as_str()),
            ],
        )?;

        let parsed: WaForecastResponse = fetch_json(self.http.as_ref(), &url, label).await?;

        let location_name = format!("{}, {}", parsed.location.name, parsed.location.country);

        let day = parsed.forecast.forecastday.first().ok_or_else(|| {
            anyhow::anyhow!("WeatherAPI response contained no forecastday data")
        })?;

        let hour_entry = day
            .hour
            .iter()
            .min_by_key(|h| (h.time_epoch - unixdt).abs())
            .ok_or_else(|| anyhow::anyhow!("WeatherAPI response contained no hourly data"))?;

        let observation_time = unix_to_utc(hour_entry.time_epoch).unwrap_or_else(Utc::now);

        Ok(WeatherResponse {
            provider: "weatherapi".to_string(),
            location_name,
            temperature_c: hour_entry.temp_c,
            feels_like_c: hour_entry.feelslike_c,
            condition: hour_entry.condition.text.clone(),
            humidity_pct: hour_entry.humidity,
            wind_speed_mps: kph_to_mps(hour_entry.wind_kph),
            observation_time,
        })
    }
}

impl fmt::Debug for WeatherApiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherApiProvider").finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    country: String,
    localtime_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    feelslike_c: f64,
    humidity: u8,
    wind_kph: f64,
    condition: WaCondition,
    last_updated_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

#[derive(Debug, Deserialize)]
struct WaForecastHour {
    time_epoch: i64,
    temp_c: f64,
    feelslike_c: f64,
    humidity: u8,
    wind_kph: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    hour: Vec<WaForecastHour>,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    location: WaLocation,
    forecast: WaForecast,
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherResponse> {
        match classify_date(Utc::now(), request.when) {
            DateRequest::Current => self.fetch_current(request).await,
            DateRequest::Future(dt) => self.fetch_at(request, dt, true).await,
            DateRequest::Past(dt) => self.fetch_at(request, dt, false).await,
        }
    }
}

/// WeatherAPI takes both addresses and "lat,lon" pairs in `q`.
fn query(location: &LocationQuery) -> String {
    match location {
        LocationQuery::Address(address) => address.clone(),
        LocationQuery::Coordinate(c) => format!("{},{}", c.latitude, c.longitude),
    }
}

fn kph_to_mps(kph: f64) -> f64 {
    kph / 3.6
}
