use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    Config, WeatherRequest, WeatherResponse,
    geo::Coordinate,
    provider::{WeatherProvider, default_provider_from_config},
};

/// Thin lookup wrapper over whichever [`WeatherProvider`] it was given.
#[derive(Debug)]
pub struct WeatherService {
    provider: Box<dyn WeatherProvider>,
}

impl WeatherService {
    pub fn new(provider: Box<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    /// Use the default provider configured in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(default_provider_from_config(config)?))
    }

    pub async fn current(&self, address: &str) -> Result<WeatherResponse> {
        self.at(address, None).await
    }

    pub async fn at(&self, address: &str, when: Option<DateTime<Utc>>) -> Result<WeatherResponse> {
        let address = address.trim();
        if address.is_empty() {
            return Err(anyhow!("Address must not be empty"));
        }

        debug!(address, ?when, "looking up weather");
        self.provider.get_weather(&WeatherRequest::address(address, when)).await
    }

    pub async fn at_coordinate(
        &self,
        coordinate: Coordinate,
        when: Option<DateTime<Utc>>,
    ) -> Result<WeatherResponse> {
        debug!(%coordinate, ?when, "looking up weather");
        self.provider.get_weather(&WeatherRequest::coordinate(coordinate, when)).await
    }
}
