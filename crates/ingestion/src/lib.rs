//! Observation ingestion for the fusion pipeline.
//!
//! Each configured network is wrapped in a [`SourceAdapter`] that turns
//! one upstream response into unit-normalized [`StationReading`]s. The
//! batches from every adapter are then reconciled by [`merge`] into a
//! single [`MergedDataset`] with one entry per physical station.
//!
//! # Adapters
//!
//! - [`IemAsosAdapter`]: Iowa Environmental Mesonet ASOS CSV service
//! - [`KeystoneAdapter`]: Penn State Keystone mesonet WFS (GeoJSON)
//! - [`StationFileAdapter`]: local ASOS-format CSV registry
//!
//! [`StationReading`]: wx_common::StationReading

pub mod adapter;
pub mod merge;
pub mod sources;

// Re-exports
pub use adapter::{http_client, SourceAdapter, SourceBatch};
pub use merge::{merge, MergePolicy, MergedDataset, RejectionTally};
pub use sources::iem::{IemAsosAdapter, IemAsosSettings};
pub use sources::keystone::{KeystoneAdapter, KeystoneSettings};
pub use sources::station_file::{StationFileAdapter, StationFileSettings};
