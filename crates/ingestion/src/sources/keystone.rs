//! Penn State Keystone mesonet adapter (GeoServer WFS, GeoJSON output).

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};
use wx_common::units::{celsius_to_fahrenheit, plausible_pressure_hpa, plausible_temperature_f};
use wx_common::{SourceId, StationReading, Variable, WxError, WxResult};

use super::asos_csv::ParsedFeed;
use super::table::{keep_latest, parse_timestamp, valid_coordinates, Field};
use crate::adapter::{SourceAdapter, SourceBatch};

pub const DEFAULT_KEYSTONE_URL: &str = "https://met-kmnfront.met.psu.edu/geoserver/ows";
pub const DEFAULT_KEYSTONE_LAYER: &str = "kmn:pemn";

fn default_keystone_url() -> String {
    DEFAULT_KEYSTONE_URL.to_string()
}

fn default_type_name() -> String {
    DEFAULT_KEYSTONE_LAYER.to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KeystoneSettings {
    #[serde(default = "default_keystone_url")]
    pub base_url: String,
    /// WFS feature type holding the latest station observations.
    #[serde(default = "default_type_name")]
    pub type_name: String,
}

impl Default for KeystoneSettings {
    fn default() -> Self {
        Self {
            base_url: default_keystone_url(),
            type_name: default_type_name(),
        }
    }
}

pub struct KeystoneAdapter {
    id: SourceId,
    settings: KeystoneSettings,
    client: Client,
}

impl KeystoneAdapter {
    pub fn new(id: SourceId, settings: KeystoneSettings, client: Client) -> Self {
        Self {
            id,
            settings,
            client,
        }
    }

    pub fn query_params(&self) -> [(&'static str, &str); 5] {
        [
            ("service", "WFS"),
            ("version", "1.0.0"),
            ("request", "GetFeature"),
            ("typeName", self.settings.type_name.as_str()),
            ("outputFormat", "application/json"),
        ]
    }
}

#[async_trait]
impl SourceAdapter for KeystoneAdapter {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "keystone_wfs"
    }

    #[instrument(skip(self), fields(source = %self.id, layer = %self.settings.type_name))]
    async fn fetch(&self) -> WxResult<SourceBatch> {
        let response = self
            .client
            .get(&self.settings.base_url)
            .query(&self.query_params())
            .send()
            .await
            .map_err(|e| WxError::source_unavailable(&self.id, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "WFS request rejected");
            return Err(WxError::source_unavailable(&self.id, format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| WxError::source_unavailable(&self.id, format!("read failed: {}", e)))?;

        let parsed = parse_feature_collection(&self.id, &body, Utc::now())
            .map_err(|reason| WxError::source_unavailable(&self.id, reason))?;

        info!(
            stations = parsed.readings.len(),
            malformed = parsed.malformed,
            "Fetched Keystone observations"
        );

        Ok(SourceBatch::new(self.id.clone(), parsed.readings, parsed.malformed))
    }
}

// ---------------------------------------------------------------------------
// GeoJSON
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    stid: Option<String>,
    name: Option<String>,
    latitude: Option<Value>,
    longitude: Option<Value>,
    /// Air temperature, °C.
    t: Option<Value>,
    /// Sea-level pressure, hPa.
    mslp: Option<Value>,
    obtime: Option<String>,
}

fn field(value: &Option<Value>) -> Field {
    match value {
        None | Some(Value::Null) => Field::Missing,
        Some(Value::Number(n)) => n.as_f64().map_or(Field::Invalid, Field::Value),
        Some(Value::String(s)) => Field::parse(s),
        Some(_) => Field::Invalid,
    }
}

/// Parse a WFS GeoJSON response.
///
/// A body that is not a feature collection fails the whole fetch; single
/// features that cannot be interpreted are counted as malformed. Features
/// without `obtime` are stamped with `fetched_at`.
pub fn parse_feature_collection(
    source: &SourceId,
    body: &str,
    fetched_at: DateTime<Utc>,
) -> Result<ParsedFeed, String> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|e| format!("invalid GeoJSON: {}", e))?;

    let mut parsed = ParsedFeed::default();
    let mut rows = Vec::with_capacity(collection.features.len());

    for value in collection.features {
        let reading = serde_json::from_value::<Feature>(value)
            .ok()
            .and_then(|feature| feature_to_reading(source, feature, fetched_at));
        match reading {
            Some(r) => rows.push(r),
            None => parsed.malformed += 1,
        }
    }

    parsed.readings = keep_latest(rows);
    Ok(parsed)
}

fn feature_to_reading(
    source: &SourceId,
    feature: Feature,
    fetched_at: DateTime<Utc>,
) -> Option<StationReading> {
    let props = feature.properties;

    let station_id = props
        .stid
        .as_deref()
        .or(props.name.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();

    let (lon, lat) = match feature.geometry {
        Some(Geometry { coordinates }) if coordinates.len() >= 2 => (coordinates[0], coordinates[1]),
        _ => (field(&props.longitude).value()?, field(&props.latitude).value()?),
    };
    if !valid_coordinates(lon, lat) {
        return None;
    }

    let observed_at = match props.obtime.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_timestamp(raw)?,
        _ => fetched_at,
    };

    let t = field(&props.t);
    let mslp = field(&props.mslp);
    if t == Field::Invalid || mslp == Field::Invalid {
        return None;
    }

    let mut values = BTreeMap::new();
    if let Some(f) = t.value().map(celsius_to_fahrenheit) {
        if plausible_temperature_f(f) {
            values.insert(Variable::Temperature, f);
        }
    }
    if let Some(p) = mslp.value() {
        if plausible_pressure_hpa(p) {
            values.insert(Variable::Pressure, p);
        }
    }

    let name = props
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(station_id.as_str())
        .to_string();

    Some(StationReading {
        station_id,
        name,
        latitude: lat,
        longitude: lon,
        values,
        observed_at,
        source: source.clone(),
    })
}
