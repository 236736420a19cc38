//! Core data types for QuadView-RS
//!
//! This module contains the fundamental data structures used throughout
//! the application for representing the loaded dataset, signal paths and
//! the two selection stores.
//!
//! # Main Types
//!
//! - [`Value`] - A node of the decoded dataset (struct / list / series / scalar)
//! - [`Dataset`] - The top-level decoded MAT content, an ordered nested mapping
//! - [`SignalValue`] - A selected signal: plain series or derived (own time axis)
//! - [`SelectionEntry`] - Per-group selection state (shared time base + children)
//! - [`TimeBase`] - Adjusted/raw timestamp pair shared by a group's plain signals
//!
//! # Signal paths
//!
//! A signal is addressed by an ordered list of keys into the nested dataset.
//! The last two segments are the ones that matter for selection: the
//! second-to-last names the *parent* group, the last names the *child*
//! series inside it. Paths shorter than two segments are invalid.
//!
//! # Custom signals
//!
//! Signals produced by user scripts live under the [`CUSTOM_GROUP`] key of
//! the dataset as `{x, y}` structs and carry their own timestamp array.
//! Whether an entry is plain or derived is decided once, at selection time,
//! and recorded in the [`SignalValue`] variant, never re-inspected later.

use indexmap::IndexMap;

/// Key of the shared timestamp array expected inside every plottable group
pub const TIMESTAMP_KEY: &str = "TimestampLogfile";

/// Dataset group under which script-derived signals are merged
pub const CUSTOM_GROUP: &str = "CustomItems";

/// The decoded content of a MAT file: an ordered, case-insensitively
/// key-unique nested mapping. Replaced wholesale on every file load.
pub type Dataset = IndexMap<String, Value>;

/// A node of the decoded dataset
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A nested struct (field order is the decode order)
    Struct(Dataset),
    /// A struct array / cell array (elements are usually structs)
    List(Vec<Value>),
    /// A numeric array
    Series(Vec<f64>),
    /// A single numeric value
    Scalar(f64),
}

impl Value {
    /// Borrow this value as a struct mapping, if it is one
    pub fn as_struct(&self) -> Option<&Dataset> {
        match self {
            Value::Struct(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow this value as a numeric series, if it is one
    pub fn as_series(&self) -> Option<&[f64]> {
        match self {
            Value::Series(values) => Some(values),
            _ => None,
        }
    }

    /// True for struct and list nodes (the ones the tree index descends into)
    pub fn has_children(&self) -> bool {
        matches!(self, Value::Struct(_) | Value::List(_))
    }
}

/// Walk `keys` down the nested dataset, returning the addressed value.
///
/// Total over absent keys: any miss or non-struct intermediate yields `None`.
pub fn resolve<'a>(data: &'a Dataset, keys: &[String]) -> Option<&'a Value> {
    let (first, rest) = keys.split_first()?;
    let mut current = data.get(first)?;
    for key in rest {
        current = current.as_struct()?.get(key)?;
    }
    Some(current)
}

/// True iff `path` is long enough to name a parent group and a child signal
pub fn is_valid_path(path: &[String]) -> bool {
    path.len() >= 2
}

/// Split a signal path into its `(parent, child)` trailing segments.
///
/// Returns `None` for invalid (too short) paths.
pub fn split_parent_child(path: &[String]) -> Option<(&str, &str)> {
    if !is_valid_path(path) {
        return None;
    }
    Some((path[path.len() - 2].as_str(), path[path.len() - 1].as_str()))
}

/// Qualified display name of a signal, `parent/child`
pub fn qualified_name(parent: &str, child: &str) -> String {
    format!("{}/{}", parent, child)
}

/// Subtract the reference offset from a raw timestamp array.
///
/// An unset or zero reference leaves the timestamps untouched (a copy of
/// the raw array is still returned; `ts` and `ts_raw` never alias).
pub fn offset_series(raw: &[f64], ts_ref: Option<f64>) -> Vec<f64> {
    match ts_ref {
        Some(r) if r != 0.0 => raw.iter().map(|t| t - r).collect(),
        _ => raw.to_vec(),
    }
}

/// An `(x, y)` numeric pair produced by a custom signal function
#[derive(Debug, Clone, PartialEq)]
pub struct XySeries {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Adjusted/raw timestamp pair shared by a group's plain signals.
///
/// `ts_raw` is immutable once set; `ts` is recomputed on every reference
/// change as `ts_raw - global_ts_ref`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBase {
    pub ts: Vec<f64>,
    pub ts_raw: Vec<f64>,
}

impl TimeBase {
    /// Build a time base from a raw timestamp array and the current reference
    pub fn new(ts_raw: &[f64], ts_ref: Option<f64>) -> Self {
        Self {
            ts: offset_series(ts_raw, ts_ref),
            ts_raw: ts_raw.to_vec(),
        }
    }

    /// Recompute `ts` for a new reference value
    pub fn retime(&mut self, ts_ref: Option<f64>) {
        self.ts = offset_series(&self.ts_raw, ts_ref);
    }
}

/// A selected signal's data, tagged by origin.
///
/// The tag is resolved once at selection time; downstream code matches on
/// the variant instead of re-inspecting runtime shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalValue {
    /// A recorded series sharing its group's [`TimeBase`]
    Plain(Vec<f64>),
    /// A script-derived series carrying its own independent time axis
    Derived {
        ts: Vec<f64>,
        ts_raw: Vec<f64>,
        val: Vec<f64>,
    },
}

impl SignalValue {
    /// The value array of this signal
    pub fn values(&self) -> &[f64] {
        match self {
            SignalValue::Plain(val) => val,
            SignalValue::Derived { val, .. } => val,
        }
    }
}

/// Selection state for one parent group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionEntry {
    /// Shared time base, present whenever at least one plain child is held.
    /// Created lazily on the first plain selection and reused (not
    /// recomputed) by later siblings.
    pub time: Option<TimeBase>,
    /// Selected children, keyed by child name
    pub children: IndexMap<String, SignalValue>,
}

/// A selection store: parent name -> per-group selection state.
///
/// Two independent instances exist, one for plotting and one for the
/// insight-only display. Parents with the same name under different
/// top-level groups share a slot here, so later selections overwrite
/// earlier ones. That is long-standing documented behavior, not a bug.
pub type SelectionStore = IndexMap<String, SelectionEntry>;
