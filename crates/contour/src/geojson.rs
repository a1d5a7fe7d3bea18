//! GeoJSON export of contour sets.
//!
//! Each isoline becomes a `LineString` feature carrying its level, so map
//! clients can draw isobars or isotherms without knowing the grid.

use serde::Serialize;

use crate::extract::ContourSet;

/// A GeoJSON FeatureCollection of isolines.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContourFeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<ContourFeature>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContourFeature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    pub geometry: LineGeometry,
    pub properties: ContourProperties,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LineGeometry {
    /// Type identifier (always "LineString").
    #[serde(rename = "type")]
    pub type_: String,

    /// Positions as `[lon, lat]`.
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContourProperties {
    pub variable: String,
    pub level: f64,
    pub closed: bool,
}

impl From<&ContourSet> for ContourFeatureCollection {
    fn from(set: &ContourSet) -> Self {
        let features = set
            .levels
            .iter()
            .flat_map(|level| {
                level.lines.iter().map(move |line| ContourFeature {
                    type_: "Feature".to_string(),
                    geometry: LineGeometry {
                        type_: "LineString".to_string(),
                        coordinates: line.points.iter().map(|p| [p.lon, p.lat]).collect(),
                    },
                    properties: ContourProperties {
                        variable: set.variable.name().to_string(),
                        level: level.level,
                        closed: line.closed,
                    },
                })
            })
            .collect();

        Self {
            type_: "FeatureCollection".to_string(),
            features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ContourLevel, IsoLine};
    use wx_common::{GeoPoint, Variable};

    #[test]
    fn test_feature_per_line_with_lon_lat_order() {
        let set = ContourSet {
            variable: Variable::Pressure,
            interval: 2.0,
            levels: vec![
                ContourLevel { level: 1008.0, lines: vec![] },
                ContourLevel {
                    level: 1010.0,
                    lines: vec![IsoLine {
                        points: vec![GeoPoint::new(39.0, -77.0), GeoPoint::new(39.5, -76.5)],
                        closed: false,
                    }],
                },
            ],
        };

        let fc = ContourFeatureCollection::from(&set);
        assert_eq!(fc.features.len(), 1);

        let json = serde_json::to_value(&fc).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["geometry"]["type"], "LineString");
        assert_eq!(json["features"][0]["geometry"]["coordinates"][0][0], -77.0);
        assert_eq!(json["features"][0]["properties"]["level"], 1010.0);
        assert_eq!(json["features"][0]["properties"]["variable"], "pressure");
    }
}
