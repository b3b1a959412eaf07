//! Treasure proximity.
//!
//! [`TreasureFinder`] asks a [`Geolocator`] where the player is and measures
//! the great-circle distance to each treasure.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::{
    geo::Coordinate,
    geolocation::{DeviceGeolocator, Geolocator},
    model::Treasure,
};

/// How close the player is to a treasure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Proximity {
    Found,
    Hot,
    Warm,
    Cold,
}

impl Proximity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Proximity::Found => "found",
            Proximity::Hot => "hot",
            Proximity::Warm => "warm",
            Proximity::Cold => "cold",
        }
    }
}

impl fmt::Display for Proximity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper distance bounds, in meters, for each [`Proximity`] band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityThresholds {
    pub found_m: f64,
    pub hot_m: f64,
    pub warm_m: f64,
}

impl Default for ProximityThresholds {
    fn default() -> Self {
        Self { found_m: 10.0, hot_m: 100.0, warm_m: 1_000.0 }
    }
}

impl ProximityThresholds {
    /// Require `0 <= found_m <= hot_m <= warm_m`.
    pub fn validate(&self) -> Result<()> {
        let ordered = 0.0 <= self.found_m && self.found_m <= self.hot_m && self.hot_m <= self.warm_m;
        if !ordered {
            return Err(anyhow!(
                "Thresholds must satisfy 0 <= found_m <= hot_m <= warm_m (got {} / {} / {})",
                self.found_m,
                self.hot_m,
                self.warm_m
            ));
        }
        Ok(())
    }

    /// Band for `distance_m`. Bounds are inclusive.
    pub fn classify(&self, distance_m: f64) -> Proximity {
        if distance_m <= self.found_m {
            Proximity::Found
        } else if distance_m <= self.hot_m {
            Proximity::Hot
        } else if distance_m <= self.warm_m {
            Proximity::Warm
        } else {
            Proximity::Cold
        }
    }
}

/// A treasure together with how far away it is.
#[derive(Debug, Clone, PartialEq)]
pub struct Sighting<'a> {
    pub treasure: &'a Treasure,
    pub distance_m: f64,
    pub proximity: Proximity,
}

pub struct TreasureFinder {
    geolocator: Box<dyn Geolocator>,
    thresholds: ProximityThresholds,
}

impl TreasureFinder {
    /// Finder bound to the device position, with default thresholds.
    pub fn new() -> Self {
        Self::with_geolocator(Box::new(DeviceGeolocator::default()))
    }

    pub fn with_geolocator(geolocator: Box<dyn Geolocator>) -> Self {
        Self { geolocator, thresholds: ProximityThresholds::default() }
    }

    pub fn with_thresholds(mut self, thresholds: ProximityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> &ProximityThresholds {
        &self.thresholds
    }

    /// Current position, as reported by the geolocator.
    pub async fn position(&self) -> Result<Coordinate> {
        self.geolocator.locate().await.context("Could not determine current position")
    }

    /// Distance to `treasure`, in meters.
    pub async fn distance_to(&self, treasure: &Treasure) -> Result<f64> {
        let here = self.position().await?;
        Ok(here.distance_m(&treasure.location))
    }

    pub async fn proximity(&self, treasure: &Treasure) -> Result<Proximity> {
        let distance_m = self.distance_to(treasure).await?;
        Ok(self.thresholds.classify(distance_m))
    }

    /// True when the treasure is found or hot.
    pub async fn is_near(&self, treasure: &Treasure) -> Result<bool> {
        let proximity = self.proximity(treasure).await?;
        Ok(proximity <= Proximity::Hot)
    }

    /// Every treasure, closest first. Locates once.
    pub async fn survey<'a>(&self, treasures: &'a [Treasure]) -> Result<Vec<Sighting<'a>>> {
        if treasures.is_empty() {
            return Ok(Vec::new());
        }

        let here = self.position().await?;
        debug!(%here, count = treasures.len(), "surveying treasures");

        let mut sightings: Vec<Sighting<'a>> = treasures
            .iter()
            .map(|treasure| {
                let distance_m = here.distance_m(&treasure.location);
                Sighting { treasure, distance_m, proximity: self.thresholds.classify(distance_m) }
            })
            .collect();

        sightings.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        Ok(sightings)
    }

    /// The closest treasure, or `None` for an empty list.
    pub async fn nearest<'a>(&self, treasures: &'a [Treasure]) -> Result<Option<Sighting<'a>>> {
        Ok(self.survey(treasures).await?.into_iter().next())
    }
}

impl Default for TreasureFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TreasureFinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreasureFinder")
            .field("thresholds", &self.thresholds)
            .finish_non_exhaustive()
    }
}
