//! In-memory [`MatSource`] used by tests and the `--demo` launch mode.
//!
//! Plays the role the mock probe plays in a hardware-facing tool: the
//! whole selection/plotting stack can be exercised without a real MAT
//! file on disk.

use crate::error::Result;
use crate::loader::mat_source::{MatSource, RawField, RawMat};
use std::path::Path;

/// A canned MAT-file source returning a fixed raw tree
#[derive(Debug, Clone, Default)]
pub struct SyntheticSource {
    mat: RawMat,
}

impl SyntheticSource {
    /// Empty source with the given header version
    pub fn new(version: Option<f64>) -> Self {
        Self {
            mat: RawMat {
                version,
                fields: Vec::new(),
            },
        }
    }

    /// Append a top-level field
    pub fn with_field(mut self, name: impl Into<String>, field: RawField) -> Self {
        self.mat.fields.push((name.into(), field));
        self
    }

    /// A small two-sensor recording used by the demo mode
    pub fn demo() -> Self {
        let samples = 600usize;
        let ts: Vec<f64> = (0..samples).map(|i| 1000.0 + i as f64 * 0.05).collect();
        let range: Vec<f64> = ts.iter().map(|t| 40.0 + 12.0 * (t * 0.4).sin()).collect();
        let speed: Vec<f64> = ts.iter().map(|t| 4.8 * (t * 0.4).cos()).collect();
        let distance: Vec<f64> = ts.iter().map(|t| 25.0 + 0.6 * (t - 1000.0)).collect();

        Self::new(Some(5.0))
            .with_field(
                "Radar",
                RawField::Struct(vec![
                    ("TimestampLogfile".into(), RawField::Series(ts.clone())),
                    ("Range".into(), RawField::Series(range)),
                    ("RangeRate".into(), RawField::Series(speed)),
                ]),
            )
            .with_field(
                "Lidar",
                RawField::Struct(vec![
                    ("TimestampLogfile".into(), RawField::Series(ts)),
                    ("Distance".into(), RawField::Series(distance)),
                ]),
            )
            .with_field("RecorderId", RawField::Scalar(7.0))
    }
}

impl MatSource for SyntheticSource {
    fn read(&self, _path: &Path) -> Result<RawMat> {
        Ok(self.mat.clone())
    }
}
