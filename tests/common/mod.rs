//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

use quadview_rs::loader::{decode, DecodedMat, MatSource, RawField, SyntheticSource};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Build a signal path from string segments
pub fn path(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| s.to_string()).collect()
}

/// A two-sensor raw fixture: Radar (ts 0..2) and Lidar (ts 5..7)
pub fn radar_lidar_source() -> SyntheticSource {
    SyntheticSource::new(Some(5.0))
        .with_field(
            "Radar",
            RawField::Struct(vec![
                (
                    "TimestampLogfile".into(),
                    RawField::Series(vec![0.0, 1.0, 2.0]),
                ),
                ("Range".into(), RawField::Series(vec![10.0, 11.0, 12.0])),
                ("RangeRate".into(), RawField::Series(vec![-1.0, 0.0, 1.0])),
            ]),
        )
        .with_field(
            "Lidar",
            RawField::Struct(vec![
                (
                    "TimestampLogfile".into(),
                    RawField::Series(vec![5.0, 6.0, 7.0]),
                ),
                ("Distance".into(), RawField::Series(vec![20.0, 21.0, 22.0])),
                ("Range".into(), RawField::Series(vec![30.0, 31.0, 32.0])),
            ]),
        )
}

/// Decode the two-sensor fixture
pub fn radar_lidar_decoded() -> DecodedMat {
    let raw = radar_lidar_source()
        .read(Path::new("fixture.mat"))
        .expect("synthetic source cannot fail");
    decode(raw)
}

/// Write `contents` to `name` inside `dir` and return the full path
pub fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}
