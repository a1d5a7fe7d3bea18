//! Configuration for grid interpolation.

use serde::{Deserialize, Serialize};
use wx_common::{WxError, WxResult};

/// Upper bound on grid nodes, to keep a bad resolution from exhausting memory.
pub const MAX_GRID_NODES: usize = 4_000_000;

/// Finest accepted grid spacing in degrees (about 11 cm).
pub const MIN_RESOLUTION_DEG: f64 = 1.0e-6;

/// Interpolation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Grid spacing in degrees, used for both axes.
    #[serde(default = "default_resolution")]
    pub resolution_deg: f64,

    /// Maximum number of nearest stations weighted per node.
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,

    /// Inverse-distance power.
    #[serde(default = "default_power")]
    pub power: f64,

    /// Stations farther than this from a node are ignored.
    #[serde(default = "default_max_radius")]
    pub max_radius_km: f64,

    /// Fewer stations carrying the variable than this fails interpolation.
    #[serde(default = "default_min_stations")]
    pub min_stations: usize,
}

fn default_resolution() -> f64 {
    0.05
}

fn default_neighbors() -> usize {
    8
}

fn default_power() -> f64 {
    2.0
}

fn default_max_radius() -> f64 {
    150.0
}

fn default_min_stations() -> usize {
    3
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            resolution_deg: default_resolution(),
            neighbors: default_neighbors(),
            power: default_power(),
            max_radius_km: default_max_radius(),
            min_stations: default_min_stations(),
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> WxResult<()> {
        if !(self.resolution_deg.is_finite() && self.resolution_deg >= MIN_RESOLUTION_DEG) {
            return Err(WxError::Config(format!(
                "resolution_deg must be at least {}, got {}",
                MIN_RESOLUTION_DEG, self.resolution_deg
            )));
        }
        if self.neighbors == 0 {
            return Err(WxError::Config("neighbors must be at least 1".into()));
        }
        if !(self.power.is_finite() && self.power > 0.0) {
            return Err(WxError::Config(format!("power must be positive, got {}", self.power)));
        }
        if !(self.max_radius_km.is_finite() && self.max_radius_km > 0.0) {
            return Err(WxError::Config(format!(
                "max_radius_km must be positive, got {}",
                self.max_radius_km
            )));
        }
        if self.min_stations == 0 {
            return Err(WxError::Config("min_stations must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let config = GridConfig::default();
        assert_eq!(config.resolution_deg, 0.05);
        assert_eq!(config.neighbors, 8);
        assert_eq!(config.min_stations, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad = [
            GridConfig { resolution_deg: 0.0, ..Default::default() },
            GridConfig { resolution_deg: f64::NAN, ..Default::default() },
            GridConfig { resolution_deg: 1.0e-20, ..Default::default() },
            GridConfig { neighbors: 0, ..Default::default() },
            GridConfig { power: -1.0, ..Default::default() },
            GridConfig { max_radius_km: 0.0, ..Default::default() },
            GridConfig { min_stations: 0, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(WxError::Config(_))), "{:?}", config);
        }
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: GridConfig = serde_json::from_str(r#"{"resolution_deg": 0.1, "power": 3.0}"#).unwrap();
        assert_eq!(config.resolution_deg, 0.1);
        assert_eq!(config.power, 3.0);
        assert_eq!(config.neighbors, 8);
        assert_eq!(config.max_radius_km, 150.0);
    }
}
