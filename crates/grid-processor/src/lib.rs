//! Spatial interpolation of sparse station readings.
//!
//! Turns the merged point observations of one variable into a regular
//! lon/lat grid covering the region's bounding box, using inverse-distance
//! weighting over great-circle distances.
//!
//! # Architecture
//!
//! ```text
//! MergedDataset readings (one variable)
//!      │
//!      ▼
//! interpolate(readings, variable, region, config)
//!      │
//!      ├─► Check station count against min_stations
//!      │
//!      ├─► Size grid from bbox + resolution (nx, ny)
//!      │
//!      ├─► For each row in parallel (rayon):
//!      │         │
//!      │         ├─► Outside region boundary: NaN
//!      │         ├─► Coincident station (< 1 m): station value
//!      │         ├─► No station within max_radius_km: NaN
//!      │         └─► IDW over nearest `neighbors` stations
//!      │
//!      └─► InterpolationGrid
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{interpolate, GridConfig};
//!
//! let grid = interpolate(&dataset.readings, Variable::Pressure, &region, &GridConfig::default())?;
//! let (min, max) = grid.value_range().unwrap();
//! ```

pub mod config;
pub mod grid;
pub mod idw;

// Re-export commonly used types at crate root
pub use config::GridConfig;
pub use grid::{grid_dimensions, InterpolationGrid};
pub use idw::interpolate;
