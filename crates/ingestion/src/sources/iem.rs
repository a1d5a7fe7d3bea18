//! Iowa Environmental Mesonet ASOS adapter.
//!
//! Queries `cgi-bin/request/asos.py` for today's routine and special
//! reports of one ASOS network (e.g. `MD_ASOS`) and keeps the newest report
//! per station.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use wx_common::{SourceId, WxError, WxResult};

use super::asos_csv::parse_asos_csv;
use crate::adapter::{SourceAdapter, SourceBatch};

pub const DEFAULT_IEM_URL: &str = "https://mesonet.agron.iastate.edu/cgi-bin/request/asos.py";

fn default_iem_url() -> String {
    DEFAULT_IEM_URL.to_string()
}

/// Settings for one IEM ASOS network query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IemAsosSettings {
    #[serde(default = "default_iem_url")]
    pub base_url: String,
    /// IEM network code, e.g. `MD_ASOS`.
    pub network: String,
    /// Station identifiers to request. Empty requests the whole network.
    #[serde(default)]
    pub stations: Vec<String>,
}

pub struct IemAsosAdapter {
    id: SourceId,
    settings: IemAsosSettings,
    client: Client,
}

impl IemAsosAdapter {
    pub fn new(id: SourceId, settings: IemAsosSettings, client: Client) -> Self {
        Self {
            id,
            settings,
            client,
        }
    }

    /// Query parameters for the UTC day containing `now`.
    pub fn query_params(&self, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let start = now.date_naive();
        let end = start + Duration::days(1);

        let mut params = vec![("network", self.settings.network.clone())];
        params.extend(
            self.settings
                .stations
                .iter()
                .map(|s| ("station", s.trim().to_ascii_uppercase())),
        );
        params.extend([
            ("data", "tmpf".to_string()),
            ("data", "alti".to_string()),
            ("data", "mslp".to_string()),
            ("year1", start.year().to_string()),
            ("month1", start.month().to_string()),
            ("day1", start.day().to_string()),
            ("year2", end.year().to_string()),
            ("month2", end.month().to_string()),
            ("day2", end.day().to_string()),
            ("tz", "Etc/UTC".to_string()),
            ("format", "onlycomma".to_string()),
            ("latlon", "yes".to_string()),
            ("missing", "M".to_string()),
            ("trace", "T".to_string()),
            ("direct", "no".to_string()),
            ("report_type", "3".to_string()),
            ("report_type", "4".to_string()),
        ]);
        params
    }
}

#[async_trait]
impl SourceAdapter for IemAsosAdapter {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "iem_asos"
    }

    #[instrument(skip(self), fields(source = %self.id, network = %self.settings.network))]
    async fn fetch(&self) -> WxResult<SourceBatch> {
        let params = self.query_params(Utc::now());

        let response = self
            .client
            .get(&self.settings.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| WxError::source_unavailable(&self.id, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "IEM request rejected");
            return Err(WxError::source_unavailable(&self.id, format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| WxError::source_unavailable(&self.id, format!("read failed: {}", e)))?;

        let parsed = parse_asos_csv(&self.id, &body)
            .map_err(|reason| WxError::source_unavailable(&self.id, reason))?;

        info!(
            stations = parsed.readings.len(),
            malformed = parsed.malformed,
            bytes = body.len(),
            "Fetched IEM ASOS observations"
        );

        Ok(SourceBatch::new(self.id.clone(), parsed.readings, parsed.malformed))
    }
}
