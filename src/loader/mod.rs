//! MAT-file input layer.
//!
//! The binary MAT format itself is never decoded here. That work is
//! delegated through the [`MatSource`] trait, whose implementations hand
//! back a [`RawMat`]: the file's top-level fields as a raw tree, plus the
//! format version sniffed from the header. [`decoder`] then converts the
//! raw tree into the application [`Dataset`](crate::types::Dataset) with
//! deterministic, case-insensitive key ordering.
//!
//! Two sources ship with the crate:
//!
//! - [`MatfileSource`] - reads real files via the `matfile` crate
//! - [`SyntheticSource`] - in-memory fixtures for tests and the demo mode

pub mod decoder;
pub mod mat_source;
pub mod matfile_source;
pub mod synthetic;

pub use decoder::{decode, DecodedMat, UNVERIFIED_VERSION};
pub use mat_source::{is_mat_file, MatSource, RawField, RawMat, MAT_EXTENSION};
pub use matfile_source::MatfileSource;
pub use synthetic::SyntheticSource;
