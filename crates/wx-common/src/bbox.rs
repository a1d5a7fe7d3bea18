//! Geographic bounding box in decimal degrees.

use serde::{Deserialize, Serialize};

/// A lon/lat bounding box (EPSG:4326, degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Reject inverted, empty or non-finite boxes.
    pub fn validate(&self) -> Result<(), BboxError> {
        let finite = [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.min_lon >= self.max_lon || self.min_lat >= self.max_lat {
            return Err(BboxError::Degenerate(format!(
                "{},{},{},{}",
                self.min_lon, self.min_lat, self.max_lon, self.max_lat
            )));
        }
        Ok(())
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Check if a point is contained within this bbox (edges inclusive).
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Center of the box as (lon, lat).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxError {
    #[error("Degenerate bbox: {0}")]
    Degenerate(String),
}
