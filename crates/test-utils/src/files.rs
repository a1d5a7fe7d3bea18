//! Temporary file helpers for adapter and config tests.

use std::io::Write;
use std::path::{Path, PathBuf};

/// Creates a temporary directory with a specific prefix.
///
/// The directory is removed when the returned handle is dropped.
pub fn temp_test_dir_with_prefix(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temporary test directory")
}

/// Writes `contents` to `dir/name` and returns the full path.
pub fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("Failed to create fixture file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write fixture file");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_fixture_round_trip() {
        let dir = temp_test_dir_with_prefix("mesonet_test_");
        assert!(dir.path().to_string_lossy().contains("mesonet_test_"));

        let path = write_fixture(dir.path(), "stations.csv", "station,valid\n");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "station,valid\n");
    }
}
