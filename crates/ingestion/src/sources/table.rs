//! Header-indexed parsing helpers for delimited observation feeds.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use wx_common::StationReading;

/// Interpretation of one raw field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Field {
    /// Missing-value marker (`M`, `null`, empty).
    Missing,
    Value(f64),
    /// Present but not a number.
    Invalid,
}

impl Field {
    pub(crate) fn parse(raw: &str) -> Self {
        let raw = raw.trim().trim_matches('"');
        if raw.is_empty()
            || raw.eq_ignore_ascii_case("m")
            || raw.eq_ignore_ascii_case("null")
            || raw.eq_ignore_ascii_case("nan")
        {
            return Field::Missing;
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Field::Value(v),
            _ => Field::Invalid,
        }
    }

    pub(crate) fn value(self) -> Option<f64> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Column lookup built from a CSV header row.
#[derive(Debug, Clone)]
pub(crate) struct Header {
    columns: HashMap<String, usize>,
    width: usize,
}

impl Header {
    pub(crate) fn parse(line: &str) -> Self {
        let columns: HashMap<String, usize> = line
            .split(',')
            .enumerate()
            .map(|(i, name)| (name.trim().trim_matches('"').to_ascii_lowercase(), i))
            .collect();
        let width = line.split(',').count();
        Self { columns, width }
    }

    pub(crate) fn index(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    /// Index of a column the feed cannot be read without.
    pub(crate) fn require(&self, name: &str) -> Result<usize, String> {
        self.index(name)
            .ok_or_else(|| format!("response has no '{}' column", name))
    }

    pub(crate) fn width(&self) -> usize {
        self.width
    }
}

/// Parse an observation timestamp as UTC.
///
/// Accepts RFC 3339 and the `YYYY-MM-DD HH:MM[:SS]` form used by the ASOS
/// feeds (already in UTC when requested with `tz=Etc/UTC`).
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim().trim_matches('"');
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Valid decimal-degree coordinate pair.
pub(crate) fn valid_coordinates(lon: f64, lat: f64) -> bool {
    (-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat)
}

/// Keep only the most recent reading per station id.
///
/// When two rows share a timestamp the one carrying more variables wins;
/// a full tie keeps the row that appeared later in the feed. Output is
/// sorted by station id.
pub(crate) fn keep_latest(readings: Vec<StationReading>) -> Vec<StationReading> {
    let mut latest: HashMap<String, StationReading> = HashMap::new();
    for reading in readings {
        match latest.get(&reading.station_id) {
            Some(current)
                if (current.observed_at, current.values.len())
                    > (reading.observed_at, reading.values.len()) => {}
            _ => {
                latest.insert(reading.station_id.clone(), reading);
            }
        }
    }

    let mut out: Vec<StationReading> = latest.into_values().collect();
    out.sort_by(|a, b| a.station_id.cmp(&b.station_id));
    out
}
