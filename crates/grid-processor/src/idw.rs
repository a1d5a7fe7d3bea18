//! Inverse-distance-weighted interpolation.

use rayon::prelude::*;
use tracing::{debug, instrument};
use wx_common::{haversine_km, Region, StationReading, Variable, WxError, WxResult};

use crate::config::GridConfig;
use crate::grid::{grid_dimensions, InterpolationGrid};

/// A node closer than this to a station takes the station's value.
pub const COINCIDENT_KM: f64 = 0.001;

/// Station position and value for one variable.
#[derive(Debug, Clone, Copy)]
struct Sample {
    lon: f64,
    lat: f64,
    value: f64,
}

/// Interpolate one variable from station readings onto the region's grid.
///
/// Readings without a finite value for `variable` are ignored. Each node
/// is independent and visits samples in reading order, so results are
/// bit-identical across runs and thread counts.
#[instrument(skip(readings, region, config), fields(variable = %variable))]
pub fn interpolate(
    readings: &[StationReading],
    variable: Variable,
    region: &Region,
    config: &GridConfig,
) -> WxResult<InterpolationGrid> {
    config.validate()?;
    region.bbox.validate()?;

    let samples: Vec<Sample> = readings
        .iter()
        .filter_map(|r| {
            r.value(variable)
                .filter(|v| v.is_finite())
                .map(|value| Sample {
                    lon: r.longitude,
                    lat: r.latitude,
                    value,
                })
        })
        .collect();

    if samples.len() < config.min_stations {
        return Err(WxError::InsufficientData {
            variable,
            available: samples.len(),
            required: config.min_stations,
        });
    }

    let bbox = region.bbox;
    let res = config.resolution_deg;
    let (nx, ny) = grid_dimensions(&bbox, res)?;

    let mut values = vec![f64::NAN; nx * ny];
    values.par_chunks_mut(nx).enumerate().for_each(|(j, row)| {
        let lat = bbox.min_lat + j as f64 * res;
        let mut scratch = Vec::with_capacity(samples.len());
        for (i, cell) in row.iter_mut().enumerate() {
            let lon = bbox.min_lon + i as f64 * res;
            // Edge nodes can overshoot the bbox by rounding; clamp before the boundary test.
            if !region.contains(lon.min(bbox.max_lon), lat.min(bbox.max_lat)) {
                continue;
            }
            *cell = estimate(&samples, lon, lat, config, &mut scratch);
        }
    });

    let grid = InterpolationGrid::from_values(variable, bbox, res, nx, ny, values);

    debug!(
        stations = samples.len(),
        nx,
        ny,
        masked = grid.masked_count(),
        "Interpolated grid"
    );

    Ok(grid)
}

/// IDW estimate at one node; `NaN` when no sample is within range.
fn estimate(
    samples: &[Sample],
    lon: f64,
    lat: f64,
    config: &GridConfig,
    scratch: &mut Vec<(f64, usize)>,
) -> f64 {
    scratch.clear();
    scratch.extend(
        samples
            .iter()
            .enumerate()
            .map(|(idx, s)| (haversine_km(lon, lat, s.lon, s.lat), idx))
            .filter(|(d, _)| *d <= config.max_radius_km),
    );
    if scratch.is_empty() {
        return f64::NAN;
    }

    // Stable tie-break on sample order keeps neighbour selection deterministic.
    scratch.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    scratch.truncate(config.neighbors);

    let (nearest_d, nearest_idx) = scratch[0];
    if nearest_d < COINCIDENT_KM {
        return samples[nearest_idx].value;
    }

    let mut weighted = 0.0;
    let mut total = 0.0;
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &(d, idx) in scratch.iter() {
        let value = samples[idx].value;
        let w = 1.0 / d.powf(config.power);
        weighted += w * value;
        total += w;
        lo = lo.min(value);
        hi = hi.max(value);
    }
    // The weighted mean can round a few ULPs past its inputs.
    (weighted / total).clamp(lo, hi)
}
