use thiserror::Error;

/// Failures of the HTTP client seam.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("failed to read response body from {url}: {message}")]
    Body { url: String, message: String },
}

/// Failures of the static device position API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device position is unavailable: {0} is not set")]
    Unavailable(&'static str),

    #[error("malformed device position '{0}': expected lat_min,lat_max,lon_min,lon_max in micro-degrees")]
    Malformed(String),

    #[error("inverted {axis} range: {min} > {max}")]
    InvertedRange { axis: &'static str, min: i32, max: i32 },

    #[error("{axis} bound {value} is outside the valid range")]
    OutOfBounds { axis: &'static str, value: i32 },
}
