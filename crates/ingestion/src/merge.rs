//! Merge/dedup engine.
//!
//! Reconciles the batches of every adapter into one reading per physical
//! station. Stations are matched across networks by normalized code first,
//! then by coordinate proximity between groups reported by disjoint sets of
//! sources. Within a matched station a single reading wins by source
//! priority, then recency, then completeness.
//!
//! The engine is pure: the same batches yield the same dataset regardless
//! of batch order or row order inside a batch.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;
use wx_common::{haversine_km, BoundingBox, SourceId, StationReading, Variable};

use crate::adapter::SourceBatch;

/// Rules applied by [`merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct MergePolicy {
    /// Sources in precedence order. Unlisted sources rank below all listed
    /// ones and equal to each other.
    pub priority: Vec<SourceId>,
    /// Cross-network coordinate match distance.
    pub proximity_km: f64,
    /// Readings outside this box are rejected.
    pub bbox: BoundingBox,
    /// A reading lacking every one of these is rejected.
    pub required: Vec<Variable>,
}

impl MergePolicy {
    pub fn new(priority: Vec<SourceId>, proximity_km: f64, bbox: BoundingBox) -> Self {
        Self {
            priority,
            proximity_km,
            bbox,
            required: Variable::ALL.to_vec(),
        }
    }

    /// Precedence rank of a source; lower is preferred.
    pub fn rank(&self, source: &SourceId) -> usize {
        self.priority
            .iter()
            .position(|s| s == source)
            .unwrap_or(self.priority.len())
    }
}

/// Readings dropped before matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RejectionTally {
    pub outside_region: usize,
    pub missing_variables: usize,
}

impl RejectionTally {
    pub fn total(&self) -> usize {
        self.outside_region + self.missing_variables
    }
}

/// One reading per physical station for a refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedDataset {
    /// Winning readings ordered by station identity.
    pub readings: Vec<StationReading>,
    pub rejections: RejectionTally,
    /// Readings discarded because another report of the same station won.
    pub duplicates_resolved: usize,
}

impl MergedDataset {
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Readings that carry `variable`.
    pub fn with_variable(&self, variable: Variable) -> impl Iterator<Item = &StationReading> {
        self.readings
            .iter()
            .filter(move |r| r.values.contains_key(&variable))
    }

    pub fn count_with(&self, variable: Variable) -> usize {
        self.with_variable(variable).count()
    }

    /// Number of winning readings per source.
    pub fn per_source(&self) -> BTreeMap<SourceId, usize> {
        let mut counts = BTreeMap::new();
        for r in &self.readings {
            *counts.entry(r.source.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Readings sharing one normalized station code.
struct CodeGroup {
    code: String,
    members: Vec<StationReading>,
    sources: BTreeSet<SourceId>,
    best_rank: usize,
}

/// Code groups matched into one physical station.
struct Cluster {
    code: String,
    anchor_lon: f64,
    anchor_lat: f64,
    best_rank: usize,
    sources: BTreeSet<SourceId>,
    members: Vec<StationReading>,
}

/// Merge adapter batches into a deduplicated dataset.
pub fn merge(batches: &[SourceBatch], policy: &MergePolicy) -> MergedDataset {
    let mut rejections = RejectionTally::default();
    let mut by_code: BTreeMap<String, Vec<StationReading>> = BTreeMap::new();

    for reading in batches.iter().flat_map(|b| b.readings.iter()) {
        if !policy.bbox.contains_point(reading.longitude, reading.latitude) {
            rejections.outside_region += 1;
            continue;
        }
        if reading.lacks_all(&policy.required) {
            rejections.missing_variables += 1;
            continue;
        }
        by_code
            .entry(reading.normalized_code())
            .or_default()
            .push(reading.clone());
    }

    let mut groups: Vec<CodeGroup> = by_code
        .into_iter()
        .map(|(code, mut members)| {
            members.sort_by(|a, b| compare_candidates(a, b, policy));
            let sources = members.iter().map(|r| r.source.clone()).collect();
            let best_rank = policy.rank(&members[0].source);
            CodeGroup {
                code,
                members,
                sources,
                best_rank,
            }
        })
        .collect();

    // Higher-precedence networks anchor the clusters.
    groups.sort_by(|a, b| a.best_rank.cmp(&b.best_rank).then_with(|| a.code.cmp(&b.code)));

    let mut clusters: Vec<Cluster> = Vec::new();
    for group in groups {
        let head = &group.members[0];
        let (lon, lat) = (head.longitude, head.latitude);

        let target = clusters
            .iter()
            .enumerate()
            .filter(|(_, c)| c.sources.is_disjoint(&group.sources))
            .map(|(i, c)| (i, haversine_km(c.anchor_lon, c.anchor_lat, lon, lat)))
            .filter(|(_, d)| *d < policy.proximity_km)
            .min_by(|(ia, da), (ib, db)| {
                da.total_cmp(db)
                    .then_with(|| clusters[*ia].best_rank.cmp(&clusters[*ib].best_rank))
                    .then_with(|| clusters[*ia].code.cmp(&clusters[*ib].code))
            })
            .map(|(i, _)| i);

        match target {
            Some(i) => {
                let cluster = &mut clusters[i];
                debug!(
                    station = %cluster.code,
                    matched = %group.code,
                    "Matched stations by proximity"
                );
                cluster.sources.extend(group.sources);
                cluster.best_rank = cluster.best_rank.min(group.best_rank);
                cluster.members.extend(group.members);
            }
            None => clusters.push(Cluster {
                code: group.code,
                anchor_lon: lon,
                anchor_lat: lat,
                best_rank: group.best_rank,
                sources: group.sources,
                members: group.members,
            }),
        }
    }

    let mut duplicates_resolved = 0;
    let mut winners: Vec<(String, StationReading)> = clusters
        .into_iter()
        .filter_map(|mut cluster| {
            cluster
                .members
                .sort_by(|a, b| compare_candidates(a, b, policy));
            duplicates_resolved += cluster.members.len() - 1;
            cluster
                .members
                .into_iter()
                .next()
                .map(|winner| (cluster.code, winner))
        })
        .collect();

    winners.sort_by(|(ca, ra), (cb, rb)| ca.cmp(cb).then_with(|| compare_candidates(ra, rb, policy)));

    let dataset = MergedDataset {
        readings: winners.into_iter().map(|(_, r)| r).collect(),
        rejections,
        duplicates_resolved,
    };

    debug!(
        stations = dataset.len(),
        duplicates = dataset.duplicates_resolved,
        outside_region = rejections.outside_region,
        missing_variables = rejections.missing_variables,
        "Merged source batches"
    );

    dataset
}

/// Total preference order between two reports of the same station.
/// `Less` means `a` is preferred.
fn compare_candidates(a: &StationReading, b: &StationReading, policy: &MergePolicy) -> Ordering {
    policy
        .rank(&a.source)
        .cmp(&policy.rank(&b.source))
        .then_with(|| b.observed_at.cmp(&a.observed_at))
        .then_with(|| {
            a.missing_count(&policy.required)
                .cmp(&b.missing_count(&policy.required))
        })
        .then_with(|| a.source.cmp(&b.source))
        .then_with(|| a.station_id.cmp(&b.station_id))
        .then_with(|| a.latitude.total_cmp(&b.latitude))
        .then_with(|| a.longitude.total_cmp(&b.longitude))
        .then_with(|| compare_values(a, b))
        .then_with(|| a.name.cmp(&b.name))
}

fn compare_values(a: &StationReading, b: &StationReading) -> Ordering {
    let mut left = a.values.iter();
    let mut right = b.values.iter();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some((va, xa)), Some((vb, xb))) => {
                let ord = va.cmp(vb).then_with(|| xa.total_cmp(xb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}
