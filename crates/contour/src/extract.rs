//! Grid-to-isoline extraction.

use grid_processor::InterpolationGrid;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wx_common::{GeoPoint, Variable};

use crate::levels::generate_contour_levels;
use crate::marching::{march_squares, GridPoint};
use crate::polyline::{connect_segments, smooth_polyline};

/// Configuration for contour extraction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContourConfig {
    /// Number of Chaikin smoothing passes (0 = no smoothing)
    #[serde(default)]
    pub smoothing_passes: u32,
}

/// One isoline in geographic coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsoLine {
    pub points: Vec<GeoPoint>,
    pub closed: bool,
}

/// All isolines at one level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContourLevel {
    pub level: f64,
    pub lines: Vec<IsoLine>,
}

/// Isolines of one variable at a fixed interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContourSet {
    pub variable: Variable,
    pub interval: f64,
    /// Ascending levels. A level the field only touches at isolated nodes
    /// has no lines.
    pub levels: Vec<ContourLevel>,
}

impl ContourSet {
    pub fn empty(variable: Variable, interval: f64) -> Self {
        Self {
            variable,
            interval,
            levels: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_values(&self) -> Vec<f64> {
        self.levels.iter().map(|l| l.level).collect()
    }

    pub fn line_count(&self) -> usize {
        self.levels.iter().map(|l| l.lines.len()).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.levels
            .iter()
            .flat_map(|l| l.lines.iter())
            .map(|line| line.points.len())
            .sum()
    }
}

/// Extract isolines from a grid at every multiple of `interval` within the
/// grid's value range.
///
/// An invalid interval or a fully masked grid yields an empty set. Levels
/// are traced in parallel and collected in ascending order, so output is
/// identical between runs.
pub fn extract_contours(
    grid: &InterpolationGrid,
    interval: f64,
    config: &ContourConfig,
) -> ContourSet {
    let Some((min, max)) = grid.value_range() else {
        return ContourSet::empty(grid.variable, interval);
    };

    let levels = generate_contour_levels(min, max, interval);

    let traced: Vec<ContourLevel> = levels
        .par_iter()
        .map(|&level| ContourLevel {
            level,
            lines: trace_level(grid, level, config),
        })
        .collect();

    let set = ContourSet {
        variable: grid.variable,
        interval,
        levels: traced,
    };

    debug!(
        variable = %grid.variable,
        levels = set.levels.len(),
        lines = set.line_count(),
        "Extracted contours"
    );

    set
}

fn trace_level(grid: &InterpolationGrid, level: f64, config: &ContourConfig) -> Vec<IsoLine> {
    let segments = march_squares(&grid.values, grid.nx, grid.ny, level);
    connect_segments(&segments)
        .iter()
        .map(|line| smooth_polyline(line, config.smoothing_passes))
        .map(|line| IsoLine {
            points: line.points.iter().map(|p| to_geo(grid, p)).collect(),
            closed: line.closed,
        })
        .collect()
}

fn to_geo(grid: &InterpolationGrid, p: &GridPoint) -> GeoPoint {
    let (lon, lat) = grid.lon_lat_at(p.x, p.y);
    GeoPoint::new(lat, lon)
}
