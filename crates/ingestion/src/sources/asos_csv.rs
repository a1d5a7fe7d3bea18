//! Parser for ASOS-shaped comma-separated observation tables.
//!
//! Both the IEM `asos.py` service (`format=onlycomma`) and the local station
//! registry use this layout: a header row followed by one row per report,
//! with `station`, `valid`, `lon` and `lat` columns and any of `tmpf`,
//! `mslp`, `alti`.

use std::collections::BTreeMap;

use tracing::debug;
use wx_common::units::{inhg_to_hpa, plausible_pressure_hpa, plausible_temperature_f};
use wx_common::{SourceId, StationReading, Variable};

use super::table::{keep_latest, parse_timestamp, valid_coordinates, Field, Header};

/// Result of parsing one feed body.
#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub readings: Vec<StationReading>,
    pub malformed: usize,
}

struct Columns {
    station: usize,
    valid: usize,
    lon: usize,
    lat: usize,
    name: Option<usize>,
    tmpf: Option<usize>,
    mslp: Option<usize>,
    alti: Option<usize>,
}

impl Columns {
    fn from_header(header: &Header) -> Result<Self, String> {
        Ok(Self {
            station: header.require("station")?,
            valid: header.require("valid")?,
            lon: header.require("lon")?,
            lat: header.require("lat")?,
            name: header.index("name"),
            tmpf: header.index("tmpf"),
            mslp: header.index("mslp"),
            alti: header.index("alti"),
        })
    }
}

/// Parse an ASOS CSV body into the latest reading per station.
///
/// Returns `Err` only when the body as a whole is unusable (no header, or a
/// required column is absent). Rows with the wrong field count, bad
/// coordinates, an unparseable timestamp or a non-numeric value are counted
/// as malformed.
pub fn parse_asos_csv(source: &SourceId, body: &str) -> Result<ParsedFeed, String> {
    let mut lines = body
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'));

    let header = Header::parse(lines.next().ok_or("empty response")?);
    let columns = Columns::from_header(&header)?;

    let mut parsed = ParsedFeed::default();
    let mut rows = Vec::new();

    for line in lines {
        match parse_row(source, &header, &columns, line) {
            Some(reading) => rows.push(reading),
            None => parsed.malformed += 1,
        }
    }

    parsed.readings = keep_latest(rows);
    Ok(parsed)
}

fn parse_row(
    source: &SourceId,
    header: &Header,
    columns: &Columns,
    line: &str,
) -> Option<StationReading> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != header.width() {
        return None;
    }

    let station_id = fields[columns.station].trim().trim_matches('"');
    if station_id.is_empty() {
        return None;
    }

    let lon = Field::parse(fields[columns.lon]).value()?;
    let lat = Field::parse(fields[columns.lat]).value()?;
    if !valid_coordinates(lon, lat) {
        return None;
    }

    let observed_at = parse_timestamp(fields[columns.valid])?;

    let column = |idx: Option<usize>| -> Option<Field> { idx.map(|i| Field::parse(fields[i])) };
    let tmpf = column(columns.tmpf);
    let mslp = column(columns.mslp);
    let alti = column(columns.alti);
    if [tmpf, mslp, alti].contains(&Some(Field::Invalid)) {
        return None;
    }

    let mut values = BTreeMap::new();

    if let Some(t) = tmpf.and_then(Field::value) {
        if plausible_temperature_f(t) {
            values.insert(Variable::Temperature, t);
        } else {
            debug!(source = %source, station = station_id, tmpf = t, "Discarding implausible temperature");
        }
    }

    let pressure = mslp
        .and_then(Field::value)
        .or_else(|| alti.and_then(Field::value).map(inhg_to_hpa));
    if let Some(p) = pressure {
        if plausible_pressure_hpa(p) {
            values.insert(Variable::Pressure, p);
        } else {
            debug!(source = %source, station = station_id, pressure = p, "Discarding implausible pressure");
        }
    }

    let name = columns
        .name
        .map(|i| fields[i].trim().trim_matches('"'))
        .filter(|n| !n.is_empty())
        .unwrap_or(station_id);

    Some(StationReading {
        station_id: station_id.to_string(),
        name: name.to_string(),
        latitude: lat,
        longitude: lon,
        values,
        observed_at,
        source: source.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "\
station,valid,lon,lat,tmpf,alti,mslp
BWI,2024-03-01 13:54,-76.6841,39.1733,48.00,30.02,1016.6
BWI,2024-03-01 14:54,-76.6841,39.1733,50.00,30.01,1016.3
DCA,2024-03-01 14:52,-77.0345,38.8483,53.10,29.98,M
IAD,2024-03-01 14:52,-77.4473,38.9349,M,M,M
";

    #[test]
    fn test_parse_latest_row_per_station() {
        let parsed = parse_asos_csv(&SourceId::new("md_asos"), FEED).unwrap();
        assert_eq!(parsed.malformed, 0);
        assert_eq!(parsed.readings.len(), 3);

        let bwi = &parsed.readings[0];
        assert_eq!(bwi.station_id, "BWI");
        assert_eq!(bwi.value(Variable::Temperature), Some(50.0));
        assert_eq!(bwi.value(Variable::Pressure), Some(1016.3));
    }

    #[test]
    fn test_altimeter_fallback() {
        let parsed = parse_asos_csv(&SourceId::new("md_asos"), FEED).unwrap();
        let dca = &parsed.readings[1];
        let p = dca.value(Variable::Pressure).unwrap();
        assert!((p - 29.98 * 33.863886).abs() < 1e-9);
    }

    #[test]
    fn test_all_missing_row_is_not_malformed() {
        let parsed = parse_asos_csv(&SourceId::new("md_asos"), FEED).unwrap();
        let iad = &parsed.readings[2];
        assert!(iad.values.is_empty());
    }

    #[test]
    fn test_missing_required_column_fails_feed() {
        let err = parse_asos_csv(&SourceId::new("md_asos"), "station,valid,tmpf\nBWI,x,1\n");
        assert!(err.unwrap_err().contains("lon"));
        assert!(parse_asos_csv(&SourceId::new("md_asos"), "\n\n").is_err());
    }

    #[test]
    fn test_implausible_values_dropped() {
        let body = "station,valid,lon,lat,tmpf,mslp\nBWI,2024-03-01 14:54,-76.68,39.17,999,1016.3\n";
        let parsed = parse_asos_csv(&SourceId::new("md_asos"), body).unwrap();
        let bwi = &parsed.readings[0];
        assert_eq!(bwi.value(Variable::Temperature), None);
        assert_eq!(bwi.value(Variable::Pressure), Some(1016.3));
    }
}
