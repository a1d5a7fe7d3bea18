//! Synthetic observation generators.
//!
//! These generators create predictable station layouts and smooth analytic
//! fields so interpolation and contour output can be checked against known
//! values.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use wx_common::{BoundingBox, SourceId, StationReading, Variable};

/// Fixed observation time used by generated readings (2024-03-01T15:00Z).
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap()
}

/// Region covering Maryland, Virginia and southern Pennsylvania.
pub fn mid_atlantic_bbox() -> BoundingBox {
    BoundingBox::new(-80.0, 37.0, -75.0, 41.0)
}

/// Fluent builder for a single [`StationReading`].
///
/// Defaults: 50 °F, 1012 hPa, observed at [`base_time`].
#[derive(Debug, Clone)]
pub struct ReadingBuilder {
    reading: StationReading,
}

impl ReadingBuilder {
    pub fn new(source: &str, station_id: &str) -> Self {
        Self {
            reading: StationReading {
                station_id: station_id.to_string(),
                name: station_id.to_string(),
                latitude: 39.0,
                longitude: -77.0,
                values: [(Variable::Temperature, 50.0), (Variable::Pressure, 1012.0)]
                    .into_iter()
                    .collect(),
                observed_at: base_time(),
                source: SourceId::new(source),
            },
        }
    }

    pub fn at(mut self, lon: f64, lat: f64) -> Self {
        self.reading.longitude = lon;
        self.reading.latitude = lat;
        self
    }

    pub fn temperature(mut self, value: f64) -> Self {
        self.reading.values.insert(Variable::Temperature, value);
        self
    }

    pub fn pressure(mut self, value: f64) -> Self {
        self.reading.values.insert(Variable::Pressure, value);
        self
    }

    pub fn without(mut self, variable: Variable) -> Self {
        self.reading.values.remove(&variable);
        self
    }

    pub fn minutes_ago(mut self, minutes: i64) -> Self {
        self.reading.observed_at = base_time() - Duration::minutes(minutes);
        self
    }

    pub fn build(self) -> StationReading {
        self.reading
    }
}

/// Shorthand for a reading with default values at a position.
pub fn reading(source: &str, station_id: &str, lon: f64, lat: f64) -> StationReading {
    ReadingBuilder::new(source, station_id).at(lon, lat).build()
}

/// Smooth analytic pressure field, roughly 1004 to 1020 hPa over the
/// mid-Atlantic box.
pub fn pressure_field(lon: f64, lat: f64) -> f64 {
    1012.0 + 2.0 * (lat - 39.0) - 1.5 * (lon + 77.5) + 0.5 * ((lon * 1.7).sin() * (lat * 1.3).cos())
}

/// Smooth analytic temperature field in °F, warmer to the south-east.
pub fn temperature_field(lon: f64, lat: f64) -> f64 {
    55.0 - 4.0 * (lat - 39.0) + 1.5 * (lon + 77.5)
}

/// Generates `count` stations at reproducible pseudo-random positions
/// inside `bbox`, with values sampled from the analytic fields.
///
/// Station ids are `{prefix}{index:03}`.
pub fn scattered_stations(
    source: &str,
    prefix: &str,
    count: usize,
    bbox: BoundingBox,
    seed: u32,
) -> Vec<StationReading> {
    (0..count)
        .map(|i| {
            let hx = simple_hash(i as u32, 0, seed);
            let hy = simple_hash(i as u32, 1, seed);
            let lon = bbox.min_lon + unit(hx) * bbox.width();
            let lat = bbox.min_lat + unit(hy) * bbox.height();
            ReadingBuilder::new(source, &format!("{}{:03}", prefix, i))
                .at(lon, lat)
                .temperature(temperature_field(lon, lat))
                .pressure(pressure_field(lon, lat))
                .build()
        })
        .collect()
}

/// Deterministic Fisher-Yates shuffle.
pub fn shuffled<T: Clone>(items: &[T], seed: u32) -> Vec<T> {
    let mut out = items.to_vec();
    for i in (1..out.len()).rev() {
        let j = simple_hash(i as u32, 7, seed) as usize % (i + 1);
        out.swap(i, j);
    }
    out
}

/// Collects `(variable, value)` pairs into a value map.
pub fn values(pairs: &[(Variable, f64)]) -> BTreeMap<Variable, f64> {
    pairs.iter().copied().collect()
}

fn unit(h: u32) -> f64 {
    h as f64 / u32::MAX as f64
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}
