//! Production [`MatSource`] backed by the `matfile` crate.
//!
//! The reader parses numeric arrays out of MAT-File level 5 containers.
//! The format version is sniffed separately from the 128-byte preamble,
//! whose textual description carries a `N.M` version number; files at or
//! above 7.3 still load but are flagged unverified by the decoder.

use crate::error::{QuadViewError, Result};
use crate::loader::mat_source::{MatSource, RawField, RawMat};
use regex::Regex;
use std::path::Path;

/// Length of the MAT preamble holding the textual description
const HEADER_TEXT_LEN: usize = 116;

/// Reads `.mat` files from disk
#[derive(Debug, Default, Clone, Copy)]
pub struct MatfileSource;

impl MatSource for MatfileSource {
    fn read(&self, path: &Path) -> Result<RawMat> {
        let bytes = std::fs::read(path)?;
        let version = sniff_version(&bytes);

        let mat = matfile::MatFile::parse(bytes.as_slice())
            .map_err(|e| QuadViewError::Mat(format!("{:?}", e)))?;

        let mut fields = Vec::new();
        for array in mat.arrays() {
            let name = array.name().to_string();
            // Reserved metadata never crosses the source boundary
            if name.starts_with("__") {
                continue;
            }
            let values = numeric_to_f64(array.data());
            let field = if values.len() == 1 {
                RawField::Scalar(values[0])
            } else {
                RawField::Series(values)
            };
            fields.push((name, field));
        }

        tracing::debug!(
            path = %path.display(),
            fields = fields.len(),
            version = ?version,
            "MAT file read"
        );

        Ok(RawMat { version, fields })
    }
}

/// Extract the `N.M` format version from the preamble's description text
fn sniff_version(bytes: &[u8]) -> Option<f64> {
    let header = bytes.get(..HEADER_TEXT_LEN.min(bytes.len()))?;
    let text = String::from_utf8_lossy(header);
    let pattern = Regex::new(r"\d+\.\d+").ok()?;
    pattern.find(&text)?.as_str().parse().ok()
}

/// Flatten a numeric array to `f64`, discarding any imaginary part
fn numeric_to_f64(data: &matfile::NumericData) -> Vec<f64> {
    use matfile::NumericData;
    match data {
        NumericData::Int8 { real, .. } => real.iter().map(|&v| v as f64).collect(),
        NumericData::UInt8 { real, .. } => real.iter().map(|&v| v as f64).collect(),
        NumericData::Int16 { real, .. } => real.iter().map(|&v| v as f64).collect(),
        NumericData::UInt16 { real, .. } => real.iter().map(|&v| v as f64).collect(),
        NumericData::Int32 { real, .. } => real.iter().map(|&v| v as f64).collect(),
        NumericData::UInt32 { real, .. } => real.iter().map(|&v| v as f64).collect(),
        NumericData::Int64 { real, .. } => real.iter().map(|&v| v as f64).collect(),
        NumericData::UInt64 { real, .. } => real.iter().map(|&v| v as f64).collect(),
        NumericData::Single { real, .. } => real.iter().map(|&v| v as f64).collect(),
        NumericData::Double { real, .. } => real.clone(),
    }
}
