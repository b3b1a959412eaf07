use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geo::Coordinate;

/// Where to look up the weather.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Address(String),
    Coordinate(Coordinate),
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationQuery::Address(address) => f.write_str(address),
            LocationQuery::Coordinate(c) => write!(f, "{c}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherRequest {
    pub location: LocationQuery,
    pub when: Option<DateTime<Utc>>,
}

impl WeatherRequest {
    pub fn address(address: impl Into<String>, when: Option<DateTime<Utc>>) -> Self {
        Self { location: LocationQuery::Address(address.into()), when }
    }

    pub fn coordinate(coordinate: Coordinate, when: Option<DateTime<Utc>>) -> Self {
        Self { location: LocationQuery::Coordinate(coordinate), when }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub provider: String,
    pub location_name: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub condition: String,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    pub observation_time: DateTime<Utc>,
}

/// A named hidden spot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treasure {
    pub name: String,
    #[serde(flatten)]
    pub location: Coordinate,
}

impl Treasure {
    pub fn new(name: impl Into<String>, location: Coordinate) -> Self {
        Self { name: name.into(), location }
    }
}
