//! Marching squares over a row-major grid.
//!
//! Works in grid index space: `x` is the column, `y` the row, both
//! increasing with longitude and latitude. Cell `(x, y)` has corners
//! `c00 = (x, y)`, `c10 = (x + 1, y)`, `c11 = (x + 1, y + 1)` and
//! `c01 = (x, y + 1)`.

use serde::Serialize;

/// A point in fractional grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridPoint {
    pub x: f64,
    pub y: f64,
}

impl GridPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &GridPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A line segment between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: GridPoint,
    pub end: GridPoint,
}

/// Segments shorter than this are dropped (field touching the level at a node).
const DEGENERATE_LEN: f64 = 1e-12;

/// Marching squares algorithm to generate contour segments for one level.
///
/// Corners with `value >= level` count as above. Cells with any `NaN`
/// corner are skipped. Saddle cells are resolved with the mean of the four
/// corners. Segments come out in row-major cell order.
pub fn march_squares(data: &[f64], width: usize, height: usize, level: f64) -> Vec<Segment> {
    if width < 2 || height < 2 || data.len() != width * height {
        return vec![];
    }

    let mut segments = Vec::new();

    for y in 0..(height - 1) {
        for x in 0..(width - 1) {
            let c00 = data[y * width + x];
            let c10 = data[y * width + x + 1];
            let c11 = data[(y + 1) * width + x + 1];
            let c01 = data[(y + 1) * width + x];

            if c00.is_nan() || c10.is_nan() || c11.is_nan() || c01.is_nan() {
                continue;
            }

            let mut case = 0u8;
            if c00 >= level { case |= 1; }
            if c10 >= level { case |= 2; }
            if c11 >= level { case |= 4; }
            if c01 >= level { case |= 8; }

            if case == 0 || case == 15 {
                continue;
            }

            push_cell_segments(&mut segments, case, x as f64, y as f64, [c00, c10, c11, c01], level);
        }
    }

    segments
}

/// Append the segments for one cell according to the 16-case table.
fn push_cell_segments(
    out: &mut Vec<Segment>,
    case: u8,
    x: f64,
    y: f64,
    corners: [f64; 4],
    level: f64,
) {
    let [c00, c10, c11, c01] = corners;

    let south = interpolate_edge(x, y, x + 1.0, y, c00, c10, level);
    let east = interpolate_edge(x + 1.0, y, x + 1.0, y + 1.0, c10, c11, level);
    let north = interpolate_edge(x, y + 1.0, x + 1.0, y + 1.0, c01, c11, level);
    let west = interpolate_edge(x, y, x, y + 1.0, c00, c01, level);

    let center_above = (c00 + c10 + c11 + c01) / 4.0 >= level;

    let mut push = |start: GridPoint, end: GridPoint| {
        if start.distance(&end) > DEGENERATE_LEN {
            out.push(Segment { start, end });
        }
    };

    match case {
        1 | 14 => push(west, south),
        2 | 13 => push(south, east),
        3 | 12 => push(west, east),
        4 | 11 => push(east, north),
        6 | 9 => push(south, north),
        7 | 8 => push(west, north),
        // Saddles: c00 and c11 above.
        5 if center_above => {
            push(south, east);
            push(west, north);
        }
        5 => {
            push(west, south);
            push(east, north);
        }
        // Saddles: c10 and c01 above.
        10 if center_above => {
            push(west, south);
            push(east, north);
        }
        10 => {
            push(south, east);
            push(west, north);
        }
        _ => {}
    }
}

/// Linearly interpolate between two edge points based on data values
fn interpolate_edge(
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    val1: f64,
    val2: f64,
    level: f64,
) -> GridPoint {
    if (val2 - val1).abs() < 1e-12 {
        return GridPoint::new((x1 + x2) / 2.0, (y1 + y2) / 2.0);
    }

    let t = ((level - val1) / (val2 - val1)).clamp(0.0, 1.0);

    GridPoint::new(x1 + t * (x2 - x1), y1 + t * (y2 - y1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_mismatched_inputs() {
        assert!(march_squares(&[1.0], 1, 1, 0.5).is_empty());
        assert!(march_squares(&[], 0, 0, 0.5).is_empty());
        assert!(march_squares(&[1.0, 2.0], 3, 3, 0.5).is_empty());
    }

    #[test]
    fn test_flat_fields_emit_nothing() {
        assert!(march_squares(&[1.0; 4], 2, 2, 5.0).is_empty());
        assert!(march_squares(&[10.0; 4], 2, 2, 5.0).is_empty());
        assert!(march_squares(&[5.0; 4], 2, 2, 5.0).is_empty());
    }

    #[test]
    fn test_single_corner_above() {
        let data = [
            10.0, 0.0, // row 0
            0.0, 0.0, // row 1
        ];
        let segments = march_squares(&data, 2, 2, 5.0);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, GridPoint::new(0.0, 0.5));
        assert_eq!(segments[0].end, GridPoint::new(0.5, 0.0));
    }

    #[test]
    fn test_interpolation_accuracy() {
        let data = [
            0.0, 10.0, // row 0
            0.0, 10.0, // row 1
        ];
        let segments = march_squares(&data, 2, 2, 2.5);
        assert_eq!(segments.len(), 1);
        assert!((segments[0].start.x - 0.25).abs() < 1e-12);
        assert!((segments[0].end.x - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_saddle_resolved_by_center() {
        // c00 and c11 high, corner mean 5.0.
        let data = [10.0, 0.0, 0.0, 10.0];

        // Mean below level: the high corners are cut off.
        let segs = march_squares(&data, 2, 2, 6.0);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].start, GridPoint::new(0.0, 0.4));
        assert_eq!(segs[0].end, GridPoint::new(0.4, 0.0));

        // Mean at or above level: the low corners are cut off.
        let segs = march_squares(&data, 2, 2, 5.0);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].start, GridPoint::new(0.5, 0.0));
        assert_eq!(segs[0].end, GridPoint::new(1.0, 0.5));
    }

    #[test]
    fn test_nan_cells_skipped() {
        let data = [
            0.0, 10.0, 10.0, // row 0
            0.0, f64::NAN, 10.0, // row 1
        ];
        assert!(march_squares(&data, 3, 2, 5.0).is_empty());
    }

    #[test]
    fn test_level_touching_single_node_is_degenerate() {
        let data = [
            1008.0, 1010.0, // row 0
            1010.0, 1012.0, // row 1
        ];
        assert!(march_squares(&data, 2, 2, 1008.0).is_empty());
        assert!(march_squares(&data, 2, 2, 1012.0).is_empty());
        assert_eq!(march_squares(&data, 2, 2, 1010.0).len(), 1);
    }
}
