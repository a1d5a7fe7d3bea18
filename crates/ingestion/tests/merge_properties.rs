//! Merge/dedup properties: idempotence, order independence, identity
//! uniqueness and the priority > recency > completeness tie-break.

use std::collections::HashSet;

use ingestion::{merge, MergePolicy, SourceBatch};
use test_utils::{mid_atlantic_bbox, reading, scattered_stations, shuffled, ReadingBuilder};
use wx_common::{BoundingBox, SourceId, StationReading, Variable};

fn policy() -> MergePolicy {
    MergePolicy::new(
        vec![
            SourceId::new("md_asos"),
            SourceId::new("va_asos"),
            SourceId::new("pa_keystone"),
        ],
        3.0,
        mid_atlantic_bbox(),
    )
}

fn batch(source: &str, readings: Vec<StationReading>) -> SourceBatch {
    SourceBatch::new(SourceId::new(source), readings, 0)
}

/// Three overlapping networks: shared ASOS codes, ICAO/FAA spellings and
/// co-located stations with unrelated codes. The scattered background
/// stations of each network sit in separate strips north of 39.5°N.
fn overlapping_batches() -> Vec<SourceBatch> {
    let mut md = scattered_stations("md_asos", "M", 25, BoundingBox::new(-80.0, 39.5, -78.2, 41.0), 1);
    md.push(reading("md_asos", "BWI", -76.6841, 39.1733));
    md.push(reading("md_asos", "DCA", -77.0345, 38.8483));

    let mut va = scattered_stations("va_asos", "V", 25, BoundingBox::new(-78.0, 39.5, -76.6, 41.0), 2);
    va.push(reading("va_asos", "DCA", -77.0345, 38.8483));
    va.push(reading("va_asos", "IAD", -77.4473, 38.9349));

    let mut pa = scattered_stations("pa_keystone", "P", 25, BoundingBox::new(-76.4, 39.5, -75.0, 41.0), 3);
    pa.push(reading("pa_keystone", "KBWI", -76.6840, 39.1730));
    pa.push(reading("pa_keystone", "DULLES", -77.4470, 38.9350));

    vec![
        batch("md_asos", md),
        batch("va_asos", va),
        batch("pa_keystone", pa),
    ]
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_merge_is_idempotent() {
    let batches = overlapping_batches();
    let first = merge(&batches, &policy());
    let second = merge(&batches, &policy());
    assert_eq!(first, second);
}

#[test]
fn test_merge_is_order_independent() {
    let batches = overlapping_batches();
    let expected = merge(&batches, &policy());

    for seed in 0..5 {
        let mut reordered: Vec<SourceBatch> = shuffled(&batches, seed)
            .into_iter()
            .map(|mut b| {
                b.readings = shuffled(&b.readings, seed + 100);
                b
            })
            .collect();
        reordered.reverse();
        assert_eq!(merge(&reordered, &policy()), expected, "seed {}", seed);
    }
}

#[test]
fn test_remerging_output_is_stable() {
    let merged = merge(&overlapping_batches(), &policy());
    let again = merge(&[batch("merged", merged.readings.clone())], &policy());
    assert_eq!(again.readings, merged.readings);
    assert_eq!(again.duplicates_resolved, 0);
}

// ============================================================================
// Identity
// ============================================================================

#[test]
fn test_no_duplicate_identities() {
    let merged = merge(&overlapping_batches(), &policy());
    let codes: HashSet<String> = merged.readings.iter().map(|r| r.normalized_code()).collect();
    assert_eq!(codes.len(), merged.len());

    let bwi: Vec<_> = merged
        .readings
        .iter()
        .filter(|r| r.normalized_code() == "BWI")
        .collect();
    assert_eq!(bwi.len(), 1);
    assert_eq!(bwi[0].source.as_str(), "md_asos");
}

#[test]
fn test_colocated_stations_matched_by_proximity() {
    let merged = merge(&overlapping_batches(), &policy());
    assert!(merged.readings.iter().any(|r| r.station_id == "IAD"));
    assert!(!merged.readings.iter().any(|r| r.station_id == "DULLES"));
}

#[test]
fn test_duplicate_accounting() {
    let batches = overlapping_batches();
    let input: usize = batches.iter().map(|b| b.readings.len()).sum();
    let merged = merge(&batches, &policy());
    assert_eq!(
        merged.len() + merged.duplicates_resolved + merged.rejections.total(),
        input
    );
}

// ============================================================================
// Tie-breaks
// ============================================================================

#[test]
fn test_priority_beats_recency() {
    let stale_primary = ReadingBuilder::new("md_asos", "BWI")
        .minutes_ago(50)
        .temperature(40.0)
        .build();
    let fresh_secondary = ReadingBuilder::new("pa_keystone", "BWI")
        .temperature(60.0)
        .build();

    let merged = merge(
        &[
            batch("pa_keystone", vec![fresh_secondary]),
            batch("md_asos", vec![stale_primary]),
        ],
        &policy(),
    );
    assert_eq!(merged.readings[0].value(Variable::Temperature), Some(40.0));
}

#[test]
fn test_recency_beats_completeness() {
    let old_full = ReadingBuilder::new("asos_file", "HGR").minutes_ago(60).build();
    let new_partial = ReadingBuilder::new("station_csv", "HGR")
        .without(Variable::Pressure)
        .temperature(44.0)
        .build();

    let merged = merge(
        &[
            batch("asos_file", vec![old_full]),
            batch("station_csv", vec![new_partial]),
        ],
        &policy(),
    );
    assert_eq!(merged.len(), 1);
    assert_eq!(merged.readings[0].source.as_str(), "station_csv");
    assert_eq!(merged.readings[0].value(Variable::Pressure), None);
}

#[test]
fn test_completeness_breaks_equal_recency() {
    let partial = ReadingBuilder::new("asos_file", "HGR")
        .without(Variable::Pressure)
        .build();
    let full = ReadingBuilder::new("station_csv", "HGR").build();

    let merged = merge(
        &[batch("asos_file", vec![partial]), batch("station_csv", vec![full])],
        &policy(),
    );
    assert_eq!(merged.readings[0].source.as_str(), "station_csv");
}

// ============================================================================
// Partial sources
// ============================================================================

#[test]
fn test_one_source_missing_still_merges_the_rest() {
    let mut batches = overlapping_batches();
    batches.remove(1);
    let merged = merge(&batches, &policy());

    let sources: HashSet<&str> = merged.readings.iter().map(|r| r.source.as_str()).collect();
    assert!(sources.contains("md_asos"));
    assert!(sources.contains("pa_keystone"));
    assert!(!sources.contains("va_asos"));
    assert!(merged.readings.iter().any(|r| r.station_id == "DCA"));
}
