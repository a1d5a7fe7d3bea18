//! Local ASOS station registry file.
//!
//! The file uses the ASOS export layout
//! (`station,valid,lon,lat,elevation,tmpf,drct,sped,mslp`) and may hold a
//! time series per station; only the newest row per station is kept. It is
//! re-read on every cycle so edits take effect without a restart.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument};
use wx_common::{SourceId, WxError, WxResult};

use super::asos_csv::parse_asos_csv;
use crate::adapter::{SourceAdapter, SourceBatch};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationFileSettings {
    pub path: PathBuf,
}

pub struct StationFileAdapter {
    id: SourceId,
    settings: StationFileSettings,
}

impl StationFileAdapter {
    pub fn new(id: SourceId, settings: StationFileSettings) -> Self {
        Self { id, settings }
    }
}

#[async_trait]
impl SourceAdapter for StationFileAdapter {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "station_file"
    }

    #[instrument(skip(self), fields(source = %self.id, path = %self.settings.path.display()))]
    async fn fetch(&self) -> WxResult<SourceBatch> {
        let bytes = tokio::fs::read(&self.settings.path).await.map_err(|e| {
            WxError::source_unavailable(
                &self.id,
                format!("cannot read {}: {}", self.settings.path.display(), e),
            )
        })?;

        // Exports from spreadsheet tools are not always UTF-8.
        let body = String::from_utf8_lossy(&bytes);

        let parsed = parse_asos_csv(&self.id, &body)
            .map_err(|reason| WxError::source_unavailable(&self.id, reason))?;

        info!(
            stations = parsed.readings.len(),
            malformed = parsed.malformed,
            "Loaded station file"
        );

        Ok(SourceBatch::new(self.id.clone(), parsed.readings, parsed.malformed))
    }
}
