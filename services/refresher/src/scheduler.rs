//! Refresh scheduler: runs the pipeline on a timer and on demand, one cycle
//! at a time, and publishes into the artifact cache.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};
use wx_common::{SourceId, WxError, WxResult};

use crate::cache::{ArtifactCache, CycleState, StatusSnapshot};
use crate::pipeline::{assemble_artifact, MapArtifact, Pipeline};

/// Answer to a manual refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshAck {
    Started,
    /// A cycle was already running; the request was dropped.
    AlreadyRunning,
}

/// Result of asking the scheduler to run a cycle in the caller's task.
#[derive(Debug)]
pub enum CycleResult {
    Published(Arc<MapArtifact>),
    Failed(WxError),
    /// Another cycle held the run lock.
    Skipped,
}

/// Held for the duration of one cycle. Releases the run lock on drop, also
/// when the cycle panics.
struct CycleGuard {
    flag: Arc<AtomicBool>,
}

impl CycleGuard {
    fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct RefreshScheduler {
    pipeline: Pipeline,
    cache: Arc<ArtifactCache>,
    running: Arc<AtomicBool>,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(pipeline: Pipeline, cache: Arc<ArtifactCache>, interval: Duration) -> Self {
        Self {
            pipeline,
            cache,
            running: Arc::new(AtomicBool::new(false)),
            interval,
        }
    }

    pub fn cache(&self) -> &Arc<ArtifactCache> {
        &self.cache
    }

    pub fn current(&self) -> Option<Arc<MapArtifact>> {
        self.cache.current()
    }

    pub fn status(&self) -> StatusSnapshot {
        self.cache.status()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start a cycle in the background unless one is already running.
    /// Does not wait for the cycle to finish.
    pub fn request_manual_refresh(self: &Arc<Self>) -> RefreshAck {
        let Some(guard) = CycleGuard::try_acquire(&self.running) else {
            info!("Manual refresh ignored, cycle already running");
            return RefreshAck::AlreadyRunning;
        };

        info!("Manual refresh started");
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            scheduler.run_guarded(guard, "manual").await;
        });
        RefreshAck::Started
    }

    /// Run one cycle in the caller's task, or skip if one is running.
    pub async fn run_now(&self) -> CycleResult {
        match CycleGuard::try_acquire(&self.running) {
            Some(guard) => self.run_guarded(guard, "direct").await,
            None => CycleResult::Skipped,
        }
    }

    /// Run an initial cycle, then one per interval until shutdown.
    ///
    /// Shutdown is observed between cycles; a running cycle always finishes.
    pub async fn run_forever(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.interval.as_secs(), "Starting refresh loop");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutting down refresh scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    match CycleGuard::try_acquire(&self.running) {
                        Some(guard) => {
                            self.run_guarded(guard, "timer").await;
                        }
                        None => debug!("Timer tick skipped, cycle already running"),
                    }
                }
            }
        }

        Ok(())
    }

    #[instrument(skip(self, _guard))]
    async fn run_guarded(&self, _guard: CycleGuard, trigger: &'static str) -> CycleResult {
        let started = Instant::now();
        self.cache.begin_cycle(Utc::now());
        counter!("refresh_cycles_total").increment(1);

        let mut source_failures = BTreeSet::new();
        let result = self.execute(&mut source_failures).await;

        for source in &source_failures {
            counter!("source_failures_total", "source" => source.to_string()).increment(1);
        }
        histogram!("refresh_cycle_duration_seconds").record(started.elapsed().as_secs_f64());

        match result {
            Ok(artifact) => {
                info!(
                    trigger,
                    status = ?artifact.status,
                    stations = artifact.dataset.len(),
                    failed_sources = source_failures.len(),
                    degraded = artifact.degraded_variables.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Refresh cycle published"
                );
                CycleResult::Published(artifact)
            }
            Err(e) => {
                counter!("refresh_cycle_failures_total").increment(1);
                error!(
                    trigger,
                    error = %e,
                    failed_sources = source_failures.len(),
                    "Refresh cycle failed, keeping previous artifact"
                );
                self.cache.record_failure(&e, source_failures);
                CycleResult::Failed(e)
            }
        }
    }

    /// Drive the stages in order. `source_failures` is filled as soon as the
    /// fetch stage knows them so a failed cycle can still report them.
    async fn execute(
        &self,
        source_failures: &mut BTreeSet<SourceId>,
    ) -> WxResult<Arc<MapArtifact>> {
        let fetched = self.pipeline.fetch_all().await?;
        source_failures.extend(fetched.failures.iter().cloned());
        fetched.require_any()?;

        self.cache.set_state(CycleState::Reconciling);
        let dataset = Arc::new(self.pipeline.reconcile(&fetched.batches));
        gauge!("merged_stations").set(dataset.len() as f64);
        if dataset.is_empty() {
            warn!("No stations survived the merge");
        }

        self.cache.set_state(CycleState::Interpolating);
        let fields = self.pipeline.build_fields(Arc::clone(&dataset)).await?;

        self.cache.set_state(CycleState::Publishing);
        let artifact = assemble_artifact(Utc::now(), dataset, fields, &fetched);
        Ok(self.cache.publish(artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_is_exclusive_and_released_on_drop() {
        let flag = Arc::new(AtomicBool::new(false));

        let guard = CycleGuard::try_acquire(&flag).unwrap();
        assert!(CycleGuard::try_acquire(&flag).is_none());

        drop(guard);
        assert!(!flag.load(Ordering::Acquire));
        assert!(CycleGuard::try_acquire(&flag).is_some());
    }

    #[test]
    fn test_ack_serialization() {
        assert_eq!(
            serde_json::to_value(RefreshAck::AlreadyRunning).unwrap(),
            "already_running"
        );
        assert_eq!(serde_json::to_value(RefreshAck::Started).unwrap(), "started");
    }
}
