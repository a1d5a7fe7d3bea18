//! Refresh service for the observation fusion pipeline.
//!
//! The [`RefreshScheduler`] runs the pipeline (adapters, merge,
//! interpolation, contours) on a timer and on manual request, and
//! publishes each result into the [`ArtifactCache`]. The status API in
//! [`server`] is a thin read layer over the cache.

pub mod cache;
pub mod config;
pub mod pipeline;
pub mod scheduler;
pub mod server;

pub use cache::{ArtifactCache, CycleState, StatusSnapshot};
pub use config::RefresherConfig;
pub use pipeline::{ArtifactStatus, MapArtifact, Pipeline, PipelineSettings, VariableField};
pub use scheduler::{CycleResult, RefreshAck, RefreshScheduler};
