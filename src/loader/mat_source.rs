//! The external MAT-reader contract.
//!
//! Mirrors the probe seam of a hardware-facing tool: the application only
//! ever sees the [`MatSource`] trait, so tests and the demo mode can swap
//! in an in-memory source while production reads real files.

use crate::error::Result;
use std::path::Path;

/// Recognized MAT-file extension
pub const MAT_EXTENSION: &str = "mat";

/// A raw top-level or nested MAT field, as handed over by the reader.
///
/// Struct fields keep whatever order the reader produced; the decoder
/// imposes the canonical case-insensitive ordering afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum RawField {
    /// A MATLAB struct: named fields in reader order
    Struct(Vec<(String, RawField)>),
    /// A MATLAB struct array: one [`RawField::Struct`] per element
    StructArray(Vec<RawField>),
    /// A numeric array
    Series(Vec<f64>),
    /// A single numeric value
    Scalar(f64),
}

/// A parsed MAT file: format version plus top-level fields.
///
/// Reserved metadata fields (`__header__`, `__version__`, `__globals__`)
/// never appear in `fields`: stripping them is part of the source
/// contract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMat {
    /// Format version from the file header, when the source could sniff it
    pub version: Option<f64>,
    /// Top-level fields in reader order
    pub fields: Vec<(String, RawField)>,
}

/// Unified interface for MAT-file readers.
///
/// Implementations must be `Send` so a future background loader can own
/// one across threads.
pub trait MatSource: Send {
    /// Read and parse the file at `path` into a raw field tree
    fn read(&self, path: &Path) -> Result<RawMat>;
}

/// True iff `path` points at an existing file with the `.mat` extension
pub fn is_mat_file(path: &Path) -> bool {
    path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(MAT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_mat_file_checks_extension_and_existence() {
        assert!(!is_mat_file(Path::new("/nonexistent/log.mat")));

        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("log.txt");
        std::fs::write(&txt, b"not a mat file").unwrap();
        assert!(!is_mat_file(&txt));

        let mat = dir.path().join("log.mat");
        std::fs::write(&mat, b"").unwrap();
        assert!(is_mat_file(&mat));
    }
}
