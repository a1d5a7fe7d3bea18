//! Analysis region: a bounding box plus optional boundary polygons.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;

/// The area a refresh cycle covers.
///
/// `boundaries` holds outer rings of `(lon, lat)` vertices (e.g. state
/// outlines). When empty, the region is the bounding box itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub bbox: BoundingBox,
    #[serde(default)]
    pub boundaries: Vec<Vec<(f64, f64)>>,
}

impl Region {
    pub fn from_bbox(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            boundaries: Vec::new(),
        }
    }

    pub fn with_boundary(mut self, ring: Vec<(f64, f64)>) -> Self {
        self.boundaries.push(ring);
        self
    }

    /// Whether a point lies inside the region.
    ///
    /// Points outside the bbox are always outside. Inside the bbox a point
    /// must fall within at least one boundary ring, if any are configured.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        if !self.bbox.contains_point(lon, lat) {
            return false;
        }
        if self.boundaries.is_empty() {
            return true;
        }
        self.boundaries
            .iter()
            .any(|ring| point_in_ring(ring, lon, lat))
    }
}

/// Even-odd ray casting. Rings may be open or closed.
fn point_in_ring(ring: &[(f64, f64)], lon: f64, lat: f64) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > lat) != (yj > lat) {
            let x_cross = xi + (lat - yi) * (xj - xi) / (yj - yi);
            if lon < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<(f64, f64)> {
        vec![(-78.0, 38.0), (-76.0, 38.0), (-76.0, 40.0), (-78.0, 40.0)]
    }

    #[test]
    fn test_bbox_only_region() {
        let region = Region::from_bbox(BoundingBox::new(-80.0, 37.0, -75.0, 41.0));
        assert!(region.contains(-77.0, 39.0));
        assert!(!region.contains(-74.0, 39.0));
    }

    #[test]
    fn test_polygon_masks_inside_bbox() {
        let region =
            Region::from_bbox(BoundingBox::new(-80.0, 37.0, -75.0, 41.0)).with_boundary(square());
        assert!(region.contains(-77.0, 39.0));
        assert!(!region.contains(-79.0, 39.0));
        assert!(!region.contains(-77.0, 40.5));
    }

    #[test]
    fn test_union_of_rings() {
        let east = vec![(-76.0, 38.0), (-75.0, 38.0), (-75.0, 39.0), (-76.0, 39.0)];
        let region = Region::from_bbox(BoundingBox::new(-80.0, 37.0, -75.0, 41.0))
            .with_boundary(square())
            .with_boundary(east);
        assert!(region.contains(-75.5, 38.5));
        assert!(region.contains(-77.5, 39.5));
        assert!(!region.contains(-75.5, 40.5));
    }

    #[test]
    fn test_degenerate_ring_contains_nothing() {
        assert!(!point_in_ring(&[(0.0, 0.0), (1.0, 1.0)], 0.5, 0.5));
    }
}
