//! Regular lon/lat grid of interpolated values.

use serde::Serialize;
use wx_common::{BoundingBox, Variable, WxError, WxResult};

use crate::config::MAX_GRID_NODES;

/// Slack applied when sizing a grid so that spans which are whole multiples
/// of the resolution are not lost to floating-point representation.
const SIZE_EPSILON: f64 = 1e-9;

/// Number of columns and rows for `bbox` at `resolution_deg`.
///
/// `nx = floor(width / res) + 1`, `ny = floor(height / res) + 1`. Fails when
/// the grid would hold more than [`MAX_GRID_NODES`] nodes; the count is
/// checked in floating point before any integer conversion.
pub fn grid_dimensions(bbox: &BoundingBox, resolution_deg: f64) -> WxResult<(usize, usize)> {
    let nx = (bbox.width() / resolution_deg + SIZE_EPSILON).floor() + 1.0;
    let ny = (bbox.height() / resolution_deg + SIZE_EPSILON).floor() + 1.0;
    if !(nx.is_finite() && ny.is_finite()) || nx * ny > MAX_GRID_NODES as f64 {
        return Err(WxError::Config(format!(
            "grid of {}x{} nodes at {} deg exceeds limit of {}",
            nx, ny, resolution_deg, MAX_GRID_NODES
        )));
    }
    Ok((nx as usize, ny as usize))
}

/// Interpolated field for one variable.
///
/// Values are row-major with row 0 at `bbox.min_lat`; `NaN` marks a masked
/// node. Serialized `NaN` values become JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpolationGrid {
    pub variable: Variable,
    pub bbox: BoundingBox,
    pub resolution_deg: f64,
    pub nx: usize,
    pub ny: usize,
    pub values: Vec<f64>,
}

impl InterpolationGrid {
    /// Build a grid from row-major values. Panics if the length does not
    /// match `nx * ny`.
    pub fn from_values(
        variable: Variable,
        bbox: BoundingBox,
        resolution_deg: f64,
        nx: usize,
        ny: usize,
        values: Vec<f64>,
    ) -> Self {
        assert_eq!(values.len(), nx * ny, "grid value count must be nx * ny");
        Self {
            variable,
            bbox,
            resolution_deg,
            nx,
            ny,
            values,
        }
    }

    /// Longitude of column `i`.
    pub fn lon(&self, i: usize) -> f64 {
        self.bbox.min_lon + i as f64 * self.resolution_deg
    }

    /// Latitude of row `j`.
    pub fn lat(&self, j: usize) -> f64 {
        self.bbox.min_lat + j as f64 * self.resolution_deg
    }

    /// Longitude/latitude at fractional grid coordinates.
    pub fn lon_lat_at(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.bbox.min_lon + x * self.resolution_deg,
            self.bbox.min_lat + y * self.resolution_deg,
        )
    }

    pub fn index(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }

    /// Value at column `i`, row `j`; `None` when out of range or masked.
    pub fn value(&self, i: usize, j: usize) -> Option<f64> {
        if i >= self.nx || j >= self.ny {
            return None;
        }
        let v = self.values[self.index(i, j)];
        if v.is_nan() {
            None
        } else {
            Some(v)
        }
    }

    /// Value at the node nearest to a lon/lat, if inside the grid.
    pub fn value_at(&self, lon: f64, lat: f64) -> Option<f64> {
        if !self.bbox.contains_point(lon, lat) {
            return None;
        }
        let i = ((lon - self.bbox.min_lon) / self.resolution_deg).round() as usize;
        let j = ((lat - self.bbox.min_lat) / self.resolution_deg).round() as usize;
        self.value(i.min(self.nx - 1), j.min(self.ny - 1))
    }

    /// Minimum and maximum over unmasked nodes.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    pub fn masked_count(&self) -> usize {
        self.values.len() - self.valid_count()
    }

    pub fn is_fully_masked(&self) -> bool {
        self.valid_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> InterpolationGrid {
        InterpolationGrid::from_values(
            Variable::Pressure,
            BoundingBox::new(-78.0, 38.0, -77.0, 39.0),
            0.5,
            3,
            3,
            vec![
                1008.0, 1009.0, 1010.0,
                1010.0, f64::NAN, 1012.0,
                1012.0, 1013.0, 1014.0,
            ],
        )
    }

    #[test]
    fn test_dimensions_exact_multiples() {
        let bbox = BoundingBox::new(-80.0, 37.0, -75.0, 41.0);
        assert_eq!(grid_dimensions(&bbox, 0.05).unwrap(), (101, 81));
        assert_eq!(grid_dimensions(&bbox, 0.1).unwrap(), (51, 41));
        assert_eq!(grid_dimensions(&bbox, 0.3).unwrap(), (17, 14));
    }

    #[test]
    fn test_dimensions_reject_node_overflow() {
        let bbox = BoundingBox::new(-80.0, 37.0, -75.0, 41.0);
        for res in [1.0e-4, 1.0e-20, f64::MIN_POSITIVE] {
            assert!(matches!(grid_dimensions(&bbox, res), Err(WxError::Config(_))), "{}", res);
        }
    }

    #[test]
    fn test_coordinates_and_lookup() {
        let g = grid();
        assert_eq!(g.lon(2), -77.0);
        assert_eq!(g.lat(1), 38.5);
        assert_eq!(g.value(0, 2), Some(1012.0));
        assert_eq!(g.value(1, 1), None);
        assert_eq!(g.value(3, 0), None);
        assert_eq!(g.value_at(-77.1, 38.9), Some(1014.0));
        assert_eq!(g.value_at(-76.0, 38.9), None);
    }

    #[test]
    fn test_value_range_skips_masked() {
        let g = grid();
        assert_eq!(g.value_range(), Some((1008.0, 1014.0)));
        assert_eq!(g.valid_count(), 8);
        assert_eq!(g.masked_count(), 1);
        assert!(!g.is_fully_masked());
    }

    #[test]
    fn test_nan_serializes_as_null() {
        let json = serde_json::to_value(grid()).unwrap();
        assert!(json["values"][4].is_null());
        assert_eq!(json["variable"], "pressure");
    }
}
