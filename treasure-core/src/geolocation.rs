use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::{fmt, sync::Arc};
use tracing::{debug, warn};

use crate::{
    config::{Config, LocationSource},
    error::DeviceError,
    geo::{Coordinate, ImprecisePosition},
    http::{HttpClient, ReqwestHttpClient, fetch_json},
};

pub mod device;

const IP_API_URL: &str = "http://ip-api.com/json/?fields=status,message,lat,lon,city";

/// Answers "where am I?".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self) -> Result<Coordinate>;
}

/// Signature of the static device position call.
pub type PositionSource = fn() -> Result<ImprecisePosition, DeviceError>;

/// Adapts the static [`device`] API to [`Geolocator`].
#[derive(Debug, Clone)]
pub struct DeviceGeolocator {
    source: PositionSource,
    max_uncertainty_m: Option<f64>,
}

impl DeviceGeolocator {
    pub fn new() -> Self {
        Self::with_source(device::current_position)
    }

    pub fn with_source(source: PositionSource) -> Self {
        Self { source, max_uncertainty_m: None }
    }

    /// Reject fixes whose range is wider than `meters` from its midpoint.
    /// `meters` must be finite and non-negative.
    pub fn with_max_uncertainty(mut self, meters: f64) -> Result<Self> {
        check_max_uncertainty(meters)?;
        self.max_uncertainty_m = Some(meters);
        Ok(self)
    }
}

pub(crate) fn check_max_uncertainty(meters: f64) -> Result<()> {
    if !meters.is_finite() || meters < 0.0 {
        return Err(anyhow!("Maximum uncertainty must be a finite, non-negative distance (got {meters})"));
    }
    Ok(())
}

impl Default for DeviceGeolocator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Geolocator for DeviceGeolocator {
    async fn locate(&self) -> Result<Coordinate> {
        let position = (self.source)().context("Failed to read device position")?;
        let uncertainty_m = position.uncertainty_m();

        if let Some(max) = self.max_uncertainty_m.filter(|max| uncertainty_m > *max) {
            warn!(uncertainty_m, max, "rejecting imprecise device position");
            return Err(anyhow!(
                "Device position is too imprecise: ±{uncertainty_m:.0} m exceeds the {max:.0} m limit"
            ));
        }

        let coordinate = position.to_coordinate();
        debug!(%coordinate, uncertainty_m, "device position");
        Ok(coordinate)
    }
}

/// Always reports the same coordinate.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator {
    coordinate: Coordinate,
}

impl FixedGeolocator {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn locate(&self) -> Result<Coordinate> {
        Ok(self.coordinate)
    }
}

/// Approximate position from the public IP address, via ip-api.com.
#[derive(Clone)]
pub struct IpGeolocator {
    http: Arc<dyn HttpClient>,
}

impl IpGeolocator {
    pub fn new() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http_client(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }
}

impl Default for IpGeolocator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IpGeolocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IpGeolocator").finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn locate(&self) -> Result<Coordinate> {
        let parsed: IpApiResponse =
            fetch_json(self.http.as_ref(), IP_API_URL, "ip-api.com").await?;

        if parsed.status != "success" {
            return Err(anyhow!(
                "IP geolocation failed: {}",
                parsed.message.as_deref().unwrap_or("unknown error")
            ));
        }

        let (lat, lon) = parsed
            .lat
            .zip(parsed.lon)
            .ok_or_else(|| anyhow!("IP geolocation response did not include coordinates"))?;

        debug!(city = parsed.city.as_deref().unwrap_or("?"), lat, lon, "IP position");
        Coordinate::new(lat, lon)
    }
}

/// Build the geolocator selected by the `[location]` section.
pub fn geolocator_from_config(config: &Config) -> Result<Box<dyn Geolocator>> {
    let location = &config.location;

    let boxed: Box<dyn Geolocator> = match location.source {
        LocationSource::Device => {
            let device = DeviceGeolocator::new();
            match location.max_uncertainty_m {
                Some(max) => Box::new(device.with_max_uncertainty(max)?),
                None => Box::new(device),
            }
        }
        LocationSource::Fixed => {
            let coordinate = location.fixed_coordinate()?.ok_or_else(|| {
                anyhow!(
                    "Location source 'fixed' needs a position.\n\
                     Hint: set `latitude` and `longitude` under [location] in {}.",
                    Config::config_file_path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|_| "the config file".to_string())
                )
            })?;
            Box::new(FixedGeolocator::new(coordinate))
        }
        LocationSource::Ip => Box::new(IpGeolocator::new()),
    };

    Ok(boxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::LocationConfig,
        http::{HttpResponse, MockHttpClient},
    };

    fn oslo_range() -> Result<ImprecisePosition, DeviceError> {
        ImprecisePosition::new(59_910_000, 59_912_000, 10_750_000, 10_752_000)
    }

    fn wide_range() -> Result<ImprecisePosition, DeviceError> {
        ImprecisePosition::new(59_000_000, 60_000_000, 10_000_000, 11_000_000)
    }

    fn no_fix() -> Result<ImprecisePosition, DeviceError> {
        Err(DeviceError::Unavailable(device::POSITION_ENV))
    }

    #[tokio::test]
    async fn device_adapter_converts_range_midpoint() {
        let coord = DeviceGeolocator::with_source(oslo_range).locate().await.expect("fix");

        assert!((coord.latitude - 59.911).abs() < 1e-9);
        assert!((coord.longitude - 10.751).abs() < 1e-9);
    }

    #[tokio::test]
    async fn device_adapter_rejects_imprecise_fix() {
        let geo = DeviceGeolocator::with_source(wide_range).with_max_uncertainty(500.0).unwrap();
        let err = geo.locate().await.unwrap_err();
        assert!(err.to_string().contains("too imprecise"));

        let geo = DeviceGeolocator::with_source(oslo_range).with_max_uncertainty(500.0).unwrap();
        assert!(geo.locate().await.is_ok());
    }

    #[test]
    fn max_uncertainty_must_be_finite_and_non_negative() {
        for bad in [-5.0, f64::NAN, f64::INFINITY] {
            let err = DeviceGeolocator::with_source(oslo_range).with_max_uncertainty(bad).unwrap_err();
            assert!(err.to_string().contains("finite, non-negative"));
        }
        assert!(DeviceGeolocator::with_source(oslo_range).with_max_uncertainty(0.0).is_ok());
    }

    #[tokio::test]
    async fn default_device_geolocator_reads_the_device_api() {
        let via_adapter = DeviceGeolocator::new().locate().await;
        let direct = device::current_position();

        match (via_adapter, direct) {
            (Ok(coord), Ok(position)) => assert_eq!(coord, position.to_coordinate()),
            (Err(err), Err(device_err)) => {
                assert!(format!("{err:#}").contains(&device_err.to_string()))
            }
            (a, b) => panic!("adapter and device API disagree: {a:?} vs {b:?}"),
        }
    }

    #[tokio::test]
    async fn device_adapter_reports_missing_fix() {
        let err = DeviceGeolocator::with_source(no_fix).locate().await.unwrap_err();

        assert!(err.to_string().contains("Failed to read device position"));
        assert!(format!("{err:#}").contains(device::POSITION_ENV));
    }

    #[tokio::test]
    async fn fixed_geolocator_returns_its_coordinate() {
        let coord = Coordinate { latitude: 1.0, longitude: 2.0 };
        assert_eq!(FixedGeolocator::new(coord).locate().await.unwrap(), coord);
    }

    #[tokio::test]
    async fn ip_geolocator_parses_success() {
        let mut http = MockHttpClient::new();
        http.expect_get()
            .withf(|url| url.starts_with("http://ip-api.com/json/"))
            .times(1)
            .returning(|_| {
                Ok(HttpResponse {
                    status: 200,
                    body: r#"{"status":"success","lat":52.52,"lon":13.405,"city":"Berlin"}"#.into(),
                })
            });

        let coord = IpGeolocator::with_http_client(Arc::new(http)).locate().await.expect("fix");
        assert_eq!(coord, Coordinate { latitude: 52.52, longitude: 13.405 });
    }

    #[tokio::test]
    async fn ip_geolocator_reports_failure_status() {
        let mut http = MockHttpClient::new();
        http.expect_get().returning(|_| {
            Ok(HttpResponse {
                status: 200,
                body: r#"{"status":"fail","message":"private range"}"#.into(),
            })
        });

        let err = IpGeolocator::with_http_client(Arc::new(http)).locate().await.unwrap_err();
        assert!(err.to_string().contains("private range"));
    }

    #[tokio::test]
    async fn config_selects_fixed_geolocator() {
        let mut cfg = Config::default();
        cfg.location = LocationConfig {
            source: LocationSource::Fixed,
            latitude: Some(10.0),
            longitude: Some(20.0),
            max_uncertainty_m: None,
        };

        let geo = geolocator_from_config(&cfg).expect("fixed geolocator");
        assert_eq!(geo.locate().await.unwrap(), Coordinate { latitude: 10.0, longitude: 20.0 });
    }

    #[test]
    fn fixed_source_without_position_errors() {
        let mut cfg = Config::default();
        cfg.location.source = LocationSource::Fixed;

        let err = geolocator_from_config(&cfg).err().expect("missing position");
        assert!(err.to_string().contains("needs a position"));
    }
}
