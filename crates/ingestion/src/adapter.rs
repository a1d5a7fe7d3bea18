//! The adapter seam between upstream networks and the merge stage.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use wx_common::{SourceId, StationReading, WxError, WxResult};

/// Readings produced by one adapter fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceBatch {
    pub source: SourceId,
    pub readings: Vec<StationReading>,
    /// Rows or features skipped because they could not be interpreted.
    pub malformed: usize,
}

impl SourceBatch {
    pub fn new(source: SourceId, readings: Vec<StationReading>, malformed: usize) -> Self {
        Self {
            source,
            readings,
            malformed,
        }
    }
}

/// One upstream observation network.
///
/// A fetch either yields a batch (possibly with skipped malformed records)
/// or fails as a whole with `WxError::SourceUnavailable`.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Configured identifier of this source.
    fn id(&self) -> &SourceId;

    /// Short adapter kind used in logs (`iem_asos`, `keystone_wfs`, ...).
    fn kind(&self) -> &'static str;

    /// Fetch and normalize the current observations.
    async fn fetch(&self) -> WxResult<SourceBatch>;
}

/// Build the shared HTTP client used by the network adapters.
pub fn http_client(request_timeout: Duration) -> WxResult<Client> {
    Client::builder()
        .timeout(request_timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("mesonet-fusion/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| WxError::Config(format!("Failed to create HTTP client: {}", e)))
}
