//! The shipped configuration must load and describe every source kind.

use std::path::PathBuf;

use refresher::config::SourceKind;
use tokio_test::{assert_err, assert_ok};
use refresher::RefresherConfig;
use wx_common::{SourceId, Variable};

fn sample_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/refresher.yaml")
}

#[test]
fn test_sample_config_loads() {
    let config = assert_ok!(RefresherConfig::load(&sample_config_path()));

    assert_eq!(config.sources.len(), 4);
    assert_eq!(
        config.effective_priority(),
        ["md_asos", "va_asos", "pa_keystone", "asos_file"]
            .iter()
            .map(|s| SourceId::new(*s))
            .collect::<Vec<_>>()
    );
    assert_eq!(config.refresh_interval().as_secs(), 7200);
    assert_eq!(config.contours.interval(Variable::Pressure), 2.0);
    assert_eq!(config.contours.interval(Variable::Temperature), 5.0);

    let kinds: Vec<&str> = config
        .sources
        .iter()
        .map(|s| match s.kind {
            SourceKind::IemAsos(_) => "iem_asos",
            SourceKind::KeystoneWfs(_) => "keystone_wfs",
            SourceKind::StationFile(_) => "station_file",
        })
        .collect();
    assert_eq!(kinds, vec!["iem_asos", "iem_asos", "keystone_wfs", "station_file"]);
}

#[test]
fn test_sample_config_builds_pipeline() {
    let config = assert_ok!(RefresherConfig::load(&sample_config_path()));
    let pipeline = assert_ok!(config.build_pipeline());

    assert_eq!(pipeline.source_ids().len(), 4);
    assert_eq!(pipeline.settings().merge.proximity_km, 3.0);
    assert_eq!(pipeline.settings().contour.smoothing_passes, 1);
}

#[test]
fn test_missing_config_file_reports_path() {
    let err = assert_err!(RefresherConfig::load(&PathBuf::from(
        "/nonexistent/refresher.yaml"
    )));
    assert!(format!("{:#}", err).contains("/nonexistent/refresher.yaml"));
}
