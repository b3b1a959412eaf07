use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::DeviceError;

/// Micro-degrees per degree.
pub const E6: f64 = 1_000_000.0;

const LAT_LIMIT_E6: i32 = 90_000_000;
const LON_LIMIT_E6: i32 = 180_000_000;

/// A precise geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting values outside the valid degree ranges.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(anyhow!("Latitude {latitude} is outside -90..=90"));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(anyhow!("Longitude {longitude} is outside -180..=180"));
        }

        Ok(Self { latitude, longitude })
    }

    /// Great-circle distance to `other`, in meters.
    pub fn distance_m(&self, other: &Coordinate) -> f64 {
        let from = haversine::Location { latitude: self.latitude, longitude: self.longitude };
        let to = haversine::Location { latitude: other.latitude, longitude: other.longitude };

        haversine::distance(from, to, haversine::Units::Kilometers) * 1000.0
    }
}

/// Unchecked wire form; deserialization goes through [`Coordinate::new`].
#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = anyhow::Error;

    fn try_from(raw: RawCoordinate) -> Result<Self> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

impl FromStr for Coordinate {
    type Err = anyhow::Error;

    /// Parses `"lat,lon"` in decimal degrees.
    fn from_str(s: &str) -> Result<Self> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| anyhow!("Expected coordinates as 'lat,lon', got '{s}'"))?;

        let latitude: f64 =
            lat.trim().parse().map_err(|_| anyhow!("Invalid latitude '{}'", lat.trim()))?;
        let longitude: f64 =
            lon.trim().parse().map_err(|_| anyhow!("Invalid longitude '{}'", lon.trim()))?;

        Self::new(latitude, longitude)
    }
}

/// An imprecise position: the device only knows it is somewhere inside these
/// bounds, expressed in integer micro-degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImprecisePosition {
    pub lat_min_e6: i32,
    pub lat_max_e6: i32,
    pub lon_min_e6: i32,
    pub lon_max_e6: i32,
}

impl ImprecisePosition {
    pub fn new(
        lat_min_e6: i32,
        lat_max_e6: i32,
        lon_min_e6: i32,
        lon_max_e6: i32,
    ) -> Result<Self, DeviceError> {
        check_axis("latitude", lat_min_e6, lat_max_e6, LAT_LIMIT_E6)?;
        check_axis("longitude", lon_min_e6, lon_max_e6, LON_LIMIT_E6)?;

        Ok(Self { lat_min_e6, lat_max_e6, lon_min_e6, lon_max_e6 })
    }

    /// Widen a precise coordinate into a range of `spread_e6` micro-degrees on
    /// each side, clamped to the valid bounds.
    pub fn from_coordinate(coordinate: Coordinate, spread_e6: u32) -> Self {
        let (lat_min_e6, lat_max_e6) =
            widen(coordinate.latitude, spread_e6, LAT_LIMIT_E6);
        let (lon_min_e6, lon_max_e6) =
            widen(coordinate.longitude, spread_e6, LON_LIMIT_E6);

        Self { lat_min_e6, lat_max_e6, lon_min_e6, lon_max_e6 }
    }

    /// Midpoint of the range, in decimal degrees.
    pub fn to_coordinate(&self) -> Coordinate {
        Coordinate {
            latitude: midpoint_e6(self.lat_min_e6, self.lat_max_e6) / E6,
            longitude: midpoint_e6(self.lon_min_e6, self.lon_max_e6) / E6,
        }
    }

    /// Distance from the midpoint to the far corner, in meters.
    pub fn uncertainty_m(&self) -> f64 {
        let corner = Coordinate {
            latitude: f64::from(self.lat_max_e6) / E6,
            longitude: f64::from(self.lon_max_e6) / E6,
        };

        self.to_coordinate().distance_m(&corner)
    }
}

fn check_axis(axis: &'static str, min: i32, max: i32, limit: i32) -> Result<(), DeviceError> {
    for value in [min, max] {
        if !(-limit..=limit).contains(&value) {
            return Err(DeviceError::OutOfBounds { axis, value });
        }
    }
    if min > max {
        return Err(DeviceError::InvertedRange { axis, min, max });
    }
    Ok(())
}

fn midpoint_e6(min: i32, max: i32) -> f64 {
    (i64::from(min) + i64::from(max)) as f64 / 2.0
}

fn widen(degrees: f64, spread_e6: u32, limit: i32) -> (i32, i32) {
    let center = (degrees * E6).round() as i64;
    let spread = i64::from(spread_e6);
    let limit = i64::from(limit);

    let min = (center - spread).clamp(-limit, limit);
    let max = (center + spread).clamp(-limit, limit);

    // Both values are clamped into i32 range above.
    (min as i32, max as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS: Coordinate = Coordinate { latitude: 48.8566, longitude: 2.3522 };
    const LONDON: Coordinate = Coordinate { latitude: 51.5074, longitude: -0.1278 };

    #[test]
    fn distance_between_paris_and_london() {
        let d = PARIS.distance_m(&LONDON);
        assert!((d - 343_500.0).abs() < 1_500.0, "unexpected distance {d}");
    }

    #[test]
    fn distance_is_symmetric_and_zero_for_same_point() {
        assert_eq!(PARIS.distance_m(&PARIS), 0.0);
        assert!((PARIS.distance_m(&LONDON) - LONDON.distance_m(&PARIS)).abs() < 1e-6);
    }

    #[test]
    fn one_degree_of_latitude_at_equator() {
        let a = Coordinate { latitude: 0.0, longitude: 0.0 };
        let b = Coordinate { latitude: 1.0, longitude: 0.0 };
        assert!((a.distance_m(&b) - 111_195.0).abs() < 10.0);
    }

    #[test]
    fn new_rejects_out_of_range_values() {
        assert!(Coordinate::new(90.5, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.1).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn parse_coordinate_pair() {
        let c: Coordinate = " 48.8566 , 2.3522".parse().expect("valid pair");
        assert_eq!(c, PARIS);

        let err = "48.8566".parse::<Coordinate>().unwrap_err();
        assert!(err.to_string().contains("lat,lon"));

        let err = "north,2.0".parse::<Coordinate>().unwrap_err();
        assert!(err.to_string().contains("Invalid latitude"));
    }

    #[test]
    fn deserialize_checks_ranges() {
        let c: Coordinate =
            serde_json::from_str(r#"{"latitude": 48.8566, "longitude": 2.3522}"#).unwrap();
        assert_eq!(c, PARIS);

        let err = serde_json::from_str::<Coordinate>(r#"{"latitude": 500.0, "longitude": 0.0}"#)
            .unwrap_err();
        assert!(err.to_string().contains("Latitude 500 is outside"));
    }

    #[test]
    fn imprecise_position_converts_to_midpoint() {
        let pos = ImprecisePosition::new(48_856_000, 48_857_200, 2_352_000, 2_352_400)
            .expect("valid range");
        let c = pos.to_coordinate();

        assert!((c.latitude - 48.8566).abs() < 1e-9);
        assert!((c.longitude - 2.3522).abs() < 1e-9);
    }

    #[test]
    fn zero_width_range_converts_exactly() {
        let pos = ImprecisePosition::new(-33_868_820, -33_868_820, 151_209_296, 151_209_296)
            .expect("valid range");
        let c = pos.to_coordinate();

        assert_eq!(c.latitude, -33.86882);
        assert_eq!(c.longitude, 151.209296);
        assert_eq!(pos.uncertainty_m(), 0.0);
    }

    #[test]
    fn range_crossing_the_equator_and_meridian() {
        let pos = ImprecisePosition::new(-1_000, 3_000, -2_000, 0).expect("valid range");
        let c = pos.to_coordinate();

        assert!((c.latitude - 0.001).abs() < 1e-12);
        assert!((c.longitude + 0.001).abs() < 1e-12);
    }

    #[test]
    fn new_rejects_inverted_and_out_of_bounds_ranges() {
        assert_eq!(
            ImprecisePosition::new(10, 5, 0, 0),
            Err(DeviceError::InvertedRange { axis: "latitude", min: 10, max: 5 })
        );
        assert_eq!(
            ImprecisePosition::new(0, 0, 0, 180_000_001),
            Err(DeviceError::OutOfBounds { axis: "longitude", value: 180_000_001 })
        );
    }

    #[test]
    fn from_coordinate_widens_and_clamps() {
        let pos = ImprecisePosition::from_coordinate(PARIS, 500);
        assert_eq!(pos.lat_min_e6, 48_856_100);
        assert_eq!(pos.lat_max_e6, 48_857_100);
        assert_eq!(pos.to_coordinate(), PARIS);

        let pole = Coordinate { latitude: 90.0, longitude: 180.0 };
        let pos = ImprecisePosition::from_coordinate(pole, 1_000);
        assert_eq!(pos.lat_max_e6, 90_000_000);
        assert_eq!(pos.lon_max_e6, 180_000_000);
        assert_eq!(pos.lat_min_e6, 89_999_000);
    }

    #[test]
    fn uncertainty_grows_with_spread() {
        let tight = ImprecisePosition::from_coordinate(PARIS, 10);
        let loose = ImprecisePosition::from_coordinate(PARIS, 10_000);

        assert!(tight.uncertainty_m() < 2.0);
        assert!(loose.uncertainty_m() > 1_000.0);
    }
}
