//! Upstream feed fixtures.
//!
//! Small but realistic response bodies for each adapter, including the
//! quirks the parsers must tolerate.

/// IEM `asos.py` response (`format=onlycomma`, `latlon=yes`, `missing=M`).
///
/// - BWI reports twice; the 14:54 row is the latest.
/// - DCA has no `mslp` and falls back to `alti`.
/// - MTN has a truncated row (malformed).
/// - HGR has an unparseable timestamp (malformed).
pub const IEM_ASOS_CSV: &str = "\
station,valid,lon,lat,tmpf,alti,mslp
BWI,2024-03-01 13:54,-76.6841,39.1733,48.00,30.02,1016.6
BWI,2024-03-01 14:54,-76.6841,39.1733,50.00,30.01,1016.3
DCA,2024-03-01 14:52,-77.0345,38.8483,53.10,29.98,M
MTN,2024-03-01 14:50,-76.4133
HGR,03/01/2024 14:53,-77.7296,39.7079,41.00,30.05,1018.0
";

/// Keystone WFS GeoJSON response (`outputFormat=application/json`).
///
/// Temperatures are °C. The feature without `stid` or `name` is malformed.
pub const KEYSTONE_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-77.8600, 40.7900]},
     "properties": {"stid": "PSU", "name": "State College", "t": 7.5, "mslp": 1014.2,
                    "obtime": "2024-03-01T14:45:00Z"}},
    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-76.8500, 40.2200]},
     "properties": {"stid": "MDT", "name": "Harrisburg", "t": 9.0, "mslp": null,
                    "obtime": "2024-03-01T14:50:00Z"}},
    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-75.9700, 40.3700]},
     "properties": {"t": 8.0}}
  ]
}"#;

/// Local station registry in ASOS export layout.
///
/// - HGR reports twice; the 14:53 row is the latest.
/// - SBY has `mslp` missing.
/// - The `XXX` row has a non-numeric longitude (malformed).
pub const STATION_FILE_CSV: &str = "\
station,valid,lon,lat,elevation,tmpf,drct,sped,mslp
HGR,2024-03-01 13:53,-77.7296,39.7079,214.0,39.0,280,8.0,1018.9
HGR,2024-03-01 14:53,-77.7296,39.7079,214.0,41.0,290,9.0,1018.4
ESN,2024-03-01 14:56,-76.0690,38.8042,22.0,49.0,200,6.0,1017.1
SBY,2024-03-01 14:54,-75.5103,38.3405,15.0,52.0,190,5.0,M
XXX,2024-03-01 14:54,west,38.0,15.0,52.0,190,5.0,1017.0
";

/// Common region definitions for testing, as `(min_lon, min_lat, max_lon, max_lat)`.
pub mod bbox {
    /// Maryland, Virginia and southern Pennsylvania.
    pub const MID_ATLANTIC: (f64, f64, f64, f64) = (-80.0, 37.0, -75.0, 41.0);

    /// Small box around the Baltimore/Washington corridor.
    pub const BALT_WASH: (f64, f64, f64, f64) = (-77.5, 38.5, -76.0, 39.5);
}
