//! Station observation model shared by every source adapter.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

/// A field variable carried by readings and interpolated onto the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variable {
    /// Air temperature, °F.
    Temperature,
    /// Mean sea-level pressure, hPa.
    Pressure,
}

impl Variable {
    /// Every variable the pipeline interpolates, in publication order.
    pub const ALL: [Variable; 2] = [Variable::Temperature, Variable::Pressure];

    pub fn name(&self) -> &'static str {
        match self {
            Variable::Temperature => "temperature",
            Variable::Pressure => "pressure",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Variable::Temperature => "degF",
            Variable::Pressure => "hPa",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperature" | "temp" => Ok(Variable::Temperature),
            "pressure" | "mslp" => Ok(Variable::Pressure),
            other => Err(format!("unknown variable: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Configured identifier of one observation network (e.g. `md_asos`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// One normalized observation from one station.
///
/// Values are unit-normalized by the adapter that produced the reading:
/// temperature in °F, pressure in hPa. A variable the station did not
/// report is absent from `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationReading {
    pub station_id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub values: BTreeMap<Variable, f64>,
    pub observed_at: DateTime<Utc>,
    pub source: SourceId,
}

impl StationReading {
    pub fn value(&self, variable: Variable) -> Option<f64> {
        self.values.get(&variable).copied()
    }

    /// Number of `required` variables this reading lacks.
    pub fn missing_count(&self, required: &[Variable]) -> usize {
        required
            .iter()
            .filter(|v| !self.values.contains_key(v))
            .count()
    }

    /// True when the reading carries none of the `required` variables.
    pub fn lacks_all(&self, required: &[Variable]) -> bool {
        !required.is_empty() && self.missing_count(required) == required.len()
    }

    /// Station code used to match the same station across networks.
    pub fn normalized_code(&self) -> String {
        normalize_station_code(&self.station_id)
    }
}

/// Normalize a station code for cross-network matching.
///
/// Codes are trimmed and upper-cased. Four-letter CONUS ICAO identifiers
/// (`KBWI`) are reduced to the three-letter FAA identifier (`BWI`) that the
/// IEM ASOS feeds use.
pub fn normalize_station_code(code: &str) -> String {
    let code = code.trim().to_ascii_uppercase();
    if code.len() == 4 && code.starts_with('K') && code.chars().all(|c| c.is_ascii_alphanumeric()) {
        code[1..].to_string()
    } else {
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(values: &[(Variable, f64)]) -> StationReading {
        StationReading {
            station_id: "BWI".into(),
            name: "Baltimore".into(),
            latitude: 39.1754,
            longitude: -76.6683,
            values: values.iter().copied().collect(),
            observed_at: Utc::now(),
            source: SourceId::new("md_asos"),
        }
    }

    #[test]
    fn test_normalize_station_code() {
        assert_eq!(normalize_station_code("kbwi"), "BWI");
        assert_eq!(normalize_station_code(" BWI "), "BWI");
        assert_eq!(normalize_station_code("KBW"), "KBW");
        assert_eq!(normalize_station_code("PSU01"), "PSU01");
    }

    #[test]
    fn test_missing_count() {
        let required = Variable::ALL;
        assert_eq!(reading(&[]).missing_count(&required), 2);
        assert_eq!(reading(&[(Variable::Pressure, 1012.0)]).missing_count(&required), 1);
        assert!(reading(&[]).lacks_all(&required));
        assert!(!reading(&[(Variable::Temperature, 50.0)]).lacks_all(&required));
    }

    #[test]
    fn test_variable_parse_and_display() {
        assert_eq!("Temperature".parse::<Variable>().unwrap(), Variable::Temperature);
        assert_eq!("mslp".parse::<Variable>().unwrap(), Variable::Pressure);
        assert!("humidity".parse::<Variable>().is_err());
        assert_eq!(Variable::Pressure.to_string(), "pressure");
    }

    #[test]
    fn test_source_id_serializes_as_string() {
        let json = serde_json::to_string(&SourceId::new("pa_keystone")).unwrap();
        assert_eq!(json, "\"pa_keystone\"");
    }
}
