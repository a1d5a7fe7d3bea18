//! Configuration loading for the refresh service.
//!
//! A single YAML file describes the region, the observation sources and
//! their precedence, and the interpolation and contour settings.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use contour::ContourConfig;
use grid_processor::{grid_dimensions, GridConfig};
use ingestion::{
    http_client, IemAsosAdapter, IemAsosSettings, KeystoneAdapter, KeystoneSettings, MergePolicy,
    SourceAdapter, StationFileAdapter, StationFileSettings,
};
use serde::Deserialize;
use tracing::{debug, info};
use wx_common::{Region, SourceId, Variable};

use crate::pipeline::{Pipeline, PipelineSettings};

/// Root configuration loaded from the service YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct RefresherConfig {
    pub region: Region,
    pub sources: Vec<SourceConfig>,
    /// Source precedence, highest first. Sources not listed rank after every
    /// listed one. When empty, the order of `sources` is used.
    #[serde(default)]
    pub priority: Vec<SourceId>,
    /// Stations from different networks closer than this are one station.
    #[serde(default = "default_proximity_km")]
    pub proximity_km: f64,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub contours: ContourSettings,
}

fn default_proximity_km() -> f64 {
    3.0
}

/// One configured observation source.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub id: SourceId,
    #[serde(flatten)]
    pub kind: SourceKind,
}

/// Adapter type and its settings, selected by the `type` key.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceKind {
    IemAsos(IemAsosSettings),
    KeystoneWfs(KeystoneSettings),
    StationFile(StationFileSettings),
}

/// Refresh cadence and fetch bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    /// Upper bound on a single adapter fetch, including the HTTP request.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_refresh_interval() -> u64 {
    7200
}

fn default_fetch_timeout() -> u64 {
    30
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

/// Contour intervals per variable.
#[derive(Debug, Clone, Deserialize)]
pub struct ContourSettings {
    /// Isobar spacing in hPa.
    #[serde(default = "default_pressure_interval")]
    pub pressure_interval: f64,
    /// Isotherm spacing in °F.
    #[serde(default = "default_temperature_interval")]
    pub temperature_interval: f64,
    #[serde(default)]
    pub smoothing_passes: u32,
}

fn default_pressure_interval() -> f64 {
    2.0
}

fn default_temperature_interval() -> f64 {
    5.0
}

impl Default for ContourSettings {
    fn default() -> Self {
        Self {
            pressure_interval: default_pressure_interval(),
            temperature_interval: default_temperature_interval(),
            smoothing_passes: 0,
        }
    }
}

impl ContourSettings {
    pub fn interval(&self, variable: Variable) -> f64 {
        match variable {
            Variable::Pressure => self.pressure_interval,
            Variable::Temperature => self.temperature_interval,
        }
    }
}

impl RefresherConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        info!(
            path = %path.display(),
            sources = config.sources.len(),
            "Loaded refresher configuration"
        );
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("Failed to parse YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.region
            .bbox
            .validate()
            .context("region.bbox is not a valid bounding box")?;

        for (i, ring) in self.region.boundaries.iter().enumerate() {
            if ring.len() < 3 {
                bail!("region.boundaries[{}] needs at least 3 vertices", i);
            }
        }

        if self.sources.is_empty() {
            bail!("at least one source must be configured");
        }

        let mut ids = HashSet::new();
        for source in &self.sources {
            if !ids.insert(&source.id) {
                bail!("duplicate source id: {}", source.id);
            }
        }

        for id in &self.priority {
            if !ids.contains(id) {
                bail!("priority lists unknown source: {}", id);
            }
        }

        if !(self.proximity_km.is_finite() && self.proximity_km >= 0.0) {
            bail!("proximity_km must be non-negative, got {}", self.proximity_km);
        }

        if self.schedule.refresh_interval_secs == 0 {
            bail!("schedule.refresh_interval_secs must be positive");
        }
        if self.schedule.fetch_timeout_secs == 0 {
            bail!("schedule.fetch_timeout_secs must be positive");
        }

        self.grid.validate().context("invalid grid settings")?;
        grid_dimensions(&self.region.bbox, self.grid.resolution_deg)
            .map_err(|e| anyhow!("{}; raise grid.resolution_deg", e))?;

        for variable in Variable::ALL {
            let interval = self.contours.interval(variable);
            if !(interval.is_finite() && interval > 0.0) {
                bail!("{} contour interval must be positive, got {}", variable, interval);
            }
        }

        Ok(())
    }

    /// Effective source precedence, highest first.
    pub fn effective_priority(&self) -> Vec<SourceId> {
        if self.priority.is_empty() {
            self.sources.iter().map(|s| s.id.clone()).collect()
        } else {
            self.priority.clone()
        }
    }

    pub fn merge_policy(&self) -> MergePolicy {
        MergePolicy::new(
            self.effective_priority(),
            self.proximity_km,
            self.region.bbox,
        )
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.schedule.fetch_timeout_secs)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        let intervals: BTreeMap<Variable, f64> = Variable::ALL
            .iter()
            .map(|v| (*v, self.contours.interval(*v)))
            .collect();

        PipelineSettings {
            merge: self.merge_policy(),
            region: self.region.clone(),
            grid: self.grid.clone(),
            intervals,
            contour: ContourConfig {
                smoothing_passes: self.contours.smoothing_passes,
            },
            fetch_timeout: self.fetch_timeout(),
        }
    }

    /// Instantiate one adapter per configured source.
    pub fn build_adapters(&self) -> Result<Vec<Arc<dyn SourceAdapter>>> {
        let client = http_client(self.fetch_timeout()).context("Failed to build HTTP client")?;

        let adapters = self
            .sources
            .iter()
            .map(|source| {
                let adapter: Arc<dyn SourceAdapter> = match &source.kind {
                    SourceKind::IemAsos(settings) => Arc::new(IemAsosAdapter::new(
                        source.id.clone(),
                        settings.clone(),
                        client.clone(),
                    )),
                    SourceKind::KeystoneWfs(settings) => Arc::new(KeystoneAdapter::new(
                        source.id.clone(),
                        settings.clone(),
                        client.clone(),
                    )),
                    SourceKind::StationFile(settings) => Arc::new(StationFileAdapter::new(
                        source.id.clone(),
                        settings.clone(),
                    )),
                };
                debug!(source = %source.id, kind = adapter.kind(), "Configured source adapter");
                adapter
            })
            .collect();

        Ok(adapters)
    }

    pub fn build_pipeline(&self) -> Result<Pipeline> {
        Ok(Pipeline::new(self.build_adapters()?, self.pipeline_settings()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
region:
  bbox: { min_lon: -80.0, min_lat: 37.0, max_lon: -75.0, max_lat: 41.0 }
sources:
  - id: md_asos
    type: iem_asos
    network: MD_ASOS
    stations: [BWI, DCA]
  - id: pa_keystone
    type: keystone_wfs
  - id: asos_file
    type: station_file
    path: /data/stations.csv
priority: [md_asos, asos_file]
"#;

    #[test]
    fn test_parse_with_defaults() {
        let config = RefresherConfig::from_yaml_str(SAMPLE).unwrap();

        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.proximity_km, 3.0);
        assert_eq!(config.schedule.refresh_interval_secs, 7200);
        assert_eq!(config.schedule.fetch_timeout_secs, 30);
        assert_eq!(config.grid, GridConfig::default());
        assert_eq!(config.contours.interval(Variable::Pressure), 2.0);
        assert_eq!(config.contours.interval(Variable::Temperature), 5.0);
        assert!(config.region.boundaries.is_empty());

        match &config.sources[0].kind {
            SourceKind::IemAsos(settings) => {
                assert_eq!(settings.network, "MD_ASOS");
                assert_eq!(settings.stations, vec!["BWI", "DCA"]);
            }
            other => panic!("expected iem_asos, got {:?}", other),
        }
        match &config.sources[1].kind {
            SourceKind::KeystoneWfs(settings) => {
                assert_eq!(settings, &KeystoneSettings::default());
            }
            other => panic!("expected keystone_wfs, got {:?}", other),
        }
    }

    #[test]
    fn test_priority_order_preserved() {
        let config = RefresherConfig::from_yaml_str(SAMPLE).unwrap();
        let policy = config.merge_policy();

        assert_eq!(
            policy.priority,
            vec![SourceId::new("md_asos"), SourceId::new("asos_file")]
        );
        assert!(policy.rank(&SourceId::new("md_asos")) < policy.rank(&SourceId::new("asos_file")));
        assert!(
            policy.rank(&SourceId::new("asos_file")) < policy.rank(&SourceId::new("pa_keystone"))
        );
    }

    #[test]
    fn test_empty_priority_uses_declaration_order() {
        let yaml = SAMPLE.replace("priority: [md_asos, asos_file]\n", "");
        let config = RefresherConfig::from_yaml_str(&yaml).unwrap();

        assert_eq!(
            config.effective_priority(),
            vec![
                SourceId::new("md_asos"),
                SourceId::new("pa_keystone"),
                SourceId::new("asos_file"),
            ]
        );
    }

    #[test]
    fn test_rejects_unknown_priority_source() {
        let yaml = SAMPLE.replace("[md_asos, asos_file]", "[md_asos, va_asos]");
        let err = RefresherConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(err.to_string().contains("va_asos"));
    }

    #[test]
    fn test_rejects_duplicate_source_ids() {
        let yaml = SAMPLE.replace("id: pa_keystone", "id: md_asos");
        assert!(RefresherConfig::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_rejects_oversized_grid() {
        let yaml = format!("{}grid:\n  resolution_deg: 0.0001\n", SAMPLE);
        let err = RefresherConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(err.to_string().contains("exceeds limit"));
    }

    #[test]
    fn test_rejects_vanishing_resolution() {
        let yaml = format!("{}grid:\n  resolution_deg: 1.0e-20\n", SAMPLE);
        let err = RefresherConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("resolution_deg must be at least"));
    }

    #[test]
    fn test_rejects_unknown_source_type() {
        let yaml = SAMPLE.replace("type: keystone_wfs", "type: synop");
        assert!(RefresherConfig::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_build_adapters_keeps_ids() {
        let config = RefresherConfig::from_yaml_str(SAMPLE).unwrap();
        let adapters = config.build_adapters().unwrap();

        let ids: Vec<&str> = adapters.iter().map(|a| a.id().as_str()).collect();
        assert_eq!(ids, vec!["md_asos", "pa_keystone", "asos_file"]);
        assert_eq!(adapters[2].kind(), "station_file");
    }
}
