//! Isoline extraction for interpolated observation grids.
//!
//! Contours are traced in grid index space with marching squares, linked
//! into polylines, optionally smoothed, and finally converted to
//! geographic coordinates.
//!
//! # Example
//!
//! ```ignore
//! use contour::{extract_contours, ContourConfig};
//!
//! let isobars = extract_contours(&pressure_grid, 2.0, &ContourConfig::default());
//! for level in &isobars.levels {
//!     println!("{} hPa: {} lines", level.level, level.lines.len());
//! }
//! ```

pub mod extract;
pub mod geojson;
pub mod levels;
pub mod marching;
pub mod polyline;

// Re-exports
pub use extract::{extract_contours, ContourConfig, ContourLevel, ContourSet, IsoLine};
pub use geojson::ContourFeatureCollection;
pub use levels::generate_contour_levels;
pub use marching::{march_squares, GridPoint, Segment};
pub use polyline::{connect_segments, smooth_polyline, Polyline};
