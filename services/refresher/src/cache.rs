//! The published artifact and the refresh status, shared with readers.
//!
//! Both live in `watch` channels: readers borrow the latest value without
//! waiting on the refresh task, and a publish replaces the artifact
//! pointer in one step.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use wx_common::{SourceId, Variable, WxError};

use crate::pipeline::{ArtifactStatus, MapArtifact};

/// Stage of the refresh state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Fetching,
    Reconciling,
    Interpolating,
    Publishing,
    /// The last cycle failed. The next cycle starts normally.
    Failed,
}

impl CycleState {
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            CycleState::Fetching
                | CycleState::Reconciling
                | CycleState::Interpolating
                | CycleState::Publishing
        )
    }
}

/// Observability snapshot of the refresh service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub state: CycleState,
    pub last_success_time: Option<DateTime<Utc>>,
    pub last_attempt_time: Option<DateTime<Utc>>,
    pub last_outcome: Option<ArtifactStatus>,
    pub last_error: Option<String>,
    /// Sources that failed in the most recent cycle.
    pub source_failures: BTreeSet<SourceId>,
    /// Variables degraded in the most recent published artifact.
    pub degraded_variables: BTreeSet<Variable>,
    /// Cycles started since the service came up.
    pub pipeline_runs: u64,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            state: CycleState::Idle,
            last_success_time: None,
            last_attempt_time: None,
            last_outcome: None,
            last_error: None,
            source_failures: BTreeSet::new(),
            degraded_variables: BTreeSet::new(),
            pipeline_runs: 0,
        }
    }
}

pub struct ArtifactCache {
    artifact: watch::Sender<Option<Arc<MapArtifact>>>,
    status: watch::Sender<StatusSnapshot>,
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactCache {
    pub fn new() -> Self {
        let (artifact, _) = watch::channel(None);
        let (status, _) = watch::channel(StatusSnapshot::default());
        Self { artifact, status }
    }

    /// The current artifact, or `None` before the first successful cycle.
    pub fn current(&self) -> Option<Arc<MapArtifact>> {
        self.artifact.borrow().clone()
    }

    pub fn status(&self) -> StatusSnapshot {
        self.status.borrow().clone()
    }

    pub fn subscribe_artifact(&self) -> watch::Receiver<Option<Arc<MapArtifact>>> {
        self.artifact.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.subscribe()
    }

    /// Record the start of a cycle.
    pub fn begin_cycle(&self, at: DateTime<Utc>) {
        self.status.send_modify(|s| {
            s.state = CycleState::Fetching;
            s.last_attempt_time = Some(at);
            s.pipeline_runs += 1;
        });
    }

    pub fn set_state(&self, state: CycleState) {
        self.status.send_if_modified(|s| {
            if s.state == state {
                return false;
            }
            s.state = state;
            true
        });
    }

    /// Swap in a new artifact and return the shared handle to it.
    pub fn publish(&self, artifact: MapArtifact) -> Arc<MapArtifact> {
        let artifact = Arc::new(artifact);
        self.artifact.send_replace(Some(Arc::clone(&artifact)));

        self.status.send_modify(|s| {
            s.state = CycleState::Idle;
            s.last_success_time = Some(artifact.generated_at);
            s.last_outcome = Some(artifact.status);
            s.last_error = None;
            s.source_failures = artifact.source_failures.clone();
            s.degraded_variables = artifact.degraded_variables.clone();
        });

        artifact
    }

    /// Record a failed cycle. The published artifact is left untouched.
    pub fn record_failure(&self, error: &WxError, source_failures: BTreeSet<SourceId>) {
        self.status.send_modify(|s| {
            s.state = CycleState::Failed;
            s.last_outcome = Some(ArtifactStatus::Failed);
            s.last_error = Some(error.to_string());
            s.source_failures = source_failures;
        });
    }
}
