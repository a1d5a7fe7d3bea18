//! One refresh cycle, split into the stages the scheduler drives in order:
//! fetch, reconcile, interpolate (with contours), then assemble the artifact.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use contour::{extract_contours, ContourConfig, ContourSet};
use futures::future::join_all;
use grid_processor::{interpolate, GridConfig, InterpolationGrid};
use ingestion::{merge, MergePolicy, MergedDataset, SourceAdapter, SourceBatch};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use wx_common::{Region, SourceId, Variable, WxError, WxResult};

/// Everything a cycle needs besides the adapters.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub merge: MergePolicy,
    pub region: Region,
    pub grid: GridConfig,
    /// Contour interval per variable.
    pub intervals: BTreeMap<Variable, f64>,
    pub contour: ContourConfig,
    pub fetch_timeout: Duration,
}

/// Published quality of an artifact, also used as a cycle outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Ready,
    /// Published, but a source failed or a variable could not be gridded.
    Degraded,
    /// The cycle published nothing.
    Failed,
}

/// Grid and isolines of one variable. Both are `None` when the variable
/// was degraded this cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableField {
    pub grid: Option<InterpolationGrid>,
    pub contours: Option<ContourSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VariableField {
    fn ready(grid: InterpolationGrid, contours: ContourSet) -> Self {
        Self {
            grid: Some(grid),
            contours: Some(contours),
            error: None,
        }
    }

    fn degraded(error: &WxError) -> Self {
        Self {
            grid: None,
            contours: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.grid.is_none()
    }
}

/// The immutable output of one successful cycle.
#[derive(Debug, Clone, Serialize)]
pub struct MapArtifact {
    pub generated_at: DateTime<Utc>,
    pub status: ArtifactStatus,
    pub dataset: Arc<MergedDataset>,
    pub fields: BTreeMap<Variable, VariableField>,
    pub source_failures: BTreeSet<SourceId>,
    pub degraded_variables: BTreeSet<Variable>,
    /// Records skipped per source because they could not be parsed.
    pub malformed_records: BTreeMap<SourceId, usize>,
}

impl MapArtifact {
    pub fn field(&self, variable: Variable) -> Option<&VariableField> {
        self.fields.get(&variable)
    }

    pub fn grid(&self, variable: Variable) -> Option<&InterpolationGrid> {
        self.field(variable).and_then(|f| f.grid.as_ref())
    }

    pub fn contours(&self, variable: Variable) -> Option<&ContourSet> {
        self.field(variable).and_then(|f| f.contours.as_ref())
    }
}

/// Result of the fetch stage.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub batches: Vec<SourceBatch>,
    pub failures: BTreeSet<SourceId>,
}

impl FetchOutcome {
    /// Fail the cycle when no source produced a batch.
    pub fn require_any(&self) -> WxResult<()> {
        if self.batches.is_empty() {
            return Err(WxError::PipelineFailure(format!(
                "all {} sources unavailable",
                self.failures.len()
            )));
        }
        Ok(())
    }
}

/// Adapters plus settings; stateless between cycles.
pub struct Pipeline {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    settings: Arc<PipelineSettings>,
}

impl Pipeline {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, settings: PipelineSettings) -> Self {
        Self {
            adapters,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn source_ids(&self) -> Vec<SourceId> {
        self.adapters.iter().map(|a| a.id().clone()).collect()
    }

    /// Run every adapter concurrently, each bounded by the fetch timeout.
    ///
    /// A timeout or `SourceUnavailable` excludes that source and records it
    /// in `failures`. A non-recoverable adapter error fails the cycle.
    #[instrument(skip(self), fields(sources = self.adapters.len()))]
    pub async fn fetch_all(&self) -> WxResult<FetchOutcome> {
        let timeout = self.settings.fetch_timeout;

        let fetches = self.adapters.iter().map(|adapter| async move {
            let id = adapter.id().clone();
            let result = match tokio::time::timeout(timeout, adapter.fetch()).await {
                Ok(result) => result,
                Err(_) => Err(WxError::source_unavailable(
                    &id,
                    format!("fetch timed out after {:?}", timeout),
                )),
            };
            (id, adapter.kind(), result)
        });

        let mut outcome = FetchOutcome::default();
        for (id, kind, result) in join_all(fetches).await {
            match result {
                Ok(batch) => {
                    debug!(
                        source = %id,
                        kind,
                        readings = batch.readings.len(),
                        malformed = batch.malformed,
                        "Source fetched"
                    );
                    outcome.batches.push(batch);
                }
                Err(e) if e.is_recoverable() => {
                    warn!(source = %id, kind, error = %e, "Source unavailable this cycle");
                    outcome.failures.insert(id);
                }
                Err(e) => {
                    return Err(WxError::PipelineFailure(format!(
                        "source {} failed fatally: {}",
                        id, e
                    )));
                }
            }
        }

        Ok(outcome)
    }

    /// Merge the fetched batches into one dataset.
    pub fn reconcile(&self, batches: &[SourceBatch]) -> MergedDataset {
        let dataset = merge(batches, &self.settings.merge);
        info!(
            stations = dataset.len(),
            duplicates = dataset.duplicates_resolved,
            outside_region = dataset.rejections.outside_region,
            missing_variables = dataset.rejections.missing_variables,
            "Merged source batches"
        );
        dataset
    }

    /// Interpolate and contour every variable off the async runtime.
    ///
    /// `InsufficientData` degrades only the affected variable; any other
    /// error fails the cycle.
    pub async fn build_fields(
        &self,
        dataset: Arc<MergedDataset>,
    ) -> WxResult<BTreeMap<Variable, VariableField>> {
        let settings = Arc::clone(&self.settings);

        tokio::task::spawn_blocking(move || compute_fields(&dataset, &settings))
            .await
            .map_err(|e| WxError::PipelineFailure(format!("field computation panicked: {}", e)))?
    }
}

fn compute_fields(
    dataset: &MergedDataset,
    settings: &PipelineSettings,
) -> WxResult<BTreeMap<Variable, VariableField>> {
    let mut fields = BTreeMap::new();

    for variable in Variable::ALL {
        let field = match interpolate(&dataset.readings, variable, &settings.region, &settings.grid)
        {
            Ok(grid) => {
                let interval = settings
                    .intervals
                    .get(&variable)
                    .copied()
                    .ok_or_else(|| {
                        WxError::Config(format!("no contour interval for {}", variable))
                    })?;
                let contours = extract_contours(&grid, interval, &settings.contour);
                debug!(
                    %variable,
                    valid_nodes = grid.valid_count(),
                    levels = contours.levels.len(),
                    lines = contours.line_count(),
                    "Field computed"
                );
                VariableField::ready(grid, contours)
            }
            Err(e) if e.is_recoverable() => {
                warn!(%variable, error = %e, "Variable degraded");
                VariableField::degraded(&e)
            }
            Err(e) => return Err(e),
        };
        fields.insert(variable, field);
    }

    Ok(fields)
}

/// Assemble the artifact from the stage outputs.
pub fn assemble_artifact(
    generated_at: DateTime<Utc>,
    dataset: Arc<MergedDataset>,
    fields: BTreeMap<Variable, VariableField>,
    fetched: &FetchOutcome,
) -> MapArtifact {
    let degraded_variables: BTreeSet<Variable> = fields
        .iter()
        .filter(|(_, field)| field.is_degraded())
        .map(|(variable, _)| *variable)
        .collect();

    let status = if degraded_variables.is_empty() && fetched.failures.is_empty() {
        ArtifactStatus::Ready
    } else {
        ArtifactStatus::Degraded
    };

    let malformed_records = fetched
        .batches
        .iter()
        .filter(|b| b.malformed > 0)
        .map(|b| (b.source.clone(), b.malformed))
        .collect();

    MapArtifact {
        generated_at,
        status,
        dataset,
        fields,
        source_failures: fetched.failures.clone(),
        degraded_variables,
        malformed_records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{base_time, mid_atlantic_bbox, ReadingBuilder};

    fn settings() -> PipelineSettings {
        let bbox = mid_atlantic_bbox();
        PipelineSettings {
            merge: MergePolicy::new(vec![SourceId::new("a")], 3.0, bbox),
            region: Region::from_bbox(bbox),
            grid: GridConfig {
                resolution_deg: 0.25,
                ..GridConfig::default()
            },
            intervals: [(Variable::Temperature, 5.0), (Variable::Pressure, 2.0)]
                .into_iter()
                .collect(),
            contour: ContourConfig::default(),
            fetch_timeout: Duration::from_secs(1),
        }
    }

    fn dataset_with_pressure_only() -> MergedDataset {
        let readings = [(-79.0, 38.0), (-76.0, 38.0), (-79.0, 40.0), (-76.0, 40.0)]
            .iter()
            .enumerate()
            .map(|(i, (lon, lat))| {
                ReadingBuilder::new("a", &format!("S{:02}", i))
                    .at(*lon, *lat)
                    .pressure(1008.0 + 2.0 * i as f64)
                    .without(Variable::Temperature)
                    .build()
            })
            .collect();
        MergedDataset {
            readings,
            ..MergedDataset::default()
        }
    }

    #[test]
    fn test_insufficient_variable_is_degraded_not_fatal() {
        let fields = compute_fields(&dataset_with_pressure_only(), &settings()).unwrap();

        assert!(!fields[&Variable::Pressure].is_degraded());
        assert!(fields[&Variable::Temperature].is_degraded());
        assert!(fields[&Variable::Temperature]
            .error
            .as_deref()
            .unwrap()
            .contains("Insufficient data"));
    }

    #[test]
    fn test_assemble_marks_degraded() {
        let fields = compute_fields(&dataset_with_pressure_only(), &settings()).unwrap();
        let fetched = FetchOutcome::default();
        let artifact = assemble_artifact(
            base_time(),
            Arc::new(dataset_with_pressure_only()),
            fields,
            &fetched,
        );

        assert_eq!(artifact.status, ArtifactStatus::Degraded);
        assert_eq!(
            artifact.degraded_variables,
            BTreeSet::from([Variable::Temperature])
        );
        assert!(artifact.grid(Variable::Pressure).is_some());
        assert!(artifact.contours(Variable::Temperature).is_none());
    }

    #[test]
    fn test_invalid_grid_settings_fail_the_cycle() {
        let mut settings = settings();
        settings.grid.resolution_deg = 0.0;

        let err = compute_fields(&dataset_with_pressure_only(), &settings).unwrap_err();
        assert!(!err.is_recoverable());
    }
}
