//! Device position API.
//!
//! A process-global, free-function interface in the shape of a third-party
//! positioning library: callers cannot pass it around or replace it, and the
//! position it reports is a micro-degree range rather than a point. Code in
//! this crate reaches it only through [`super::DeviceGeolocator`].

use std::env::VarError;

use crate::{error::DeviceError, geo::ImprecisePosition};

/// Environment variable holding `lat_min,lat_max,lon_min,lon_max`.
pub const POSITION_ENV: &str = "TREASURE_DEVICE_POSITION";

/// Read the current device position.
pub fn current_position() -> Result<ImprecisePosition, DeviceError> {
    position_from(std::env::var(POSITION_ENV))
}

/// Interpret the result of reading [`POSITION_ENV`].
pub fn position_from(var: Result<String, VarError>) -> Result<ImprecisePosition, DeviceError> {
    let raw = var.map_err(|_| DeviceError::Unavailable(POSITION_ENV))?;
    parse_position(&raw)
}

/// Parse `lat_min,lat_max,lon_min,lon_max` in micro-degrees.
pub fn parse_position(raw: &str) -> Result<ImprecisePosition, DeviceError> {
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| DeviceError::Malformed(raw.to_string()))?;

    match values.as_slice() {
        [lat_min, lat_max, lon_min, lon_max] => {
            ImprecisePosition::new(*lat_min, *lat_max, *lon_min, *lon_max)
        }
        _ => Err(DeviceError::Malformed(raw.to_string())),
    }
}
