//! Core library for the `treasure` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Weather lookup over pluggable providers and an injectable HTTP client
//! - Geolocation, including an adapter over the static device position API
//! - Distance and proximity to named treasures
//!
//! It is used by `treasure-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod geo;
pub mod geolocation;
pub mod http;
pub mod model;
pub mod provider;
pub mod treasure;
pub mod weather;

pub use config::{Config, LocationConfig, LocationSource, ProviderConfig};
pub use error::{DeviceError, HttpError};
pub use geo::{Coordinate, ImprecisePosition};
pub use geolocation::{
    DeviceGeolocator, FixedGeolocator, Geolocator, IpGeolocator, geolocator_from_config,
};
pub use http::{HttpClient, HttpResponse, ReqwestHttpClient};
pub use model::{LocationQuery, Treasure, WeatherRequest, WeatherResponse};
pub use provider::{ProviderId, WeatherProvider};
pub use treasure::{Proximity, ProximityThresholds, Sighting, TreasureFinder};
pub use weather::WeatherService;
