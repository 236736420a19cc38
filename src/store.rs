//! The signal-selection and time-reference state machine.
//!
//! [`SignalStore`] owns the loaded dataset, the two selection stores
//! (plotting and insight-only) and the global reference timestamp. Every
//! mutation of selection state goes through its operations so the
//! invariants stay in one place:
//!
//! - a selection entry holds a `ts`/`ts_raw` time base whenever it holds
//!   at least one plain child, and is removed with its last child;
//! - `ts == ts_raw - global_ts_ref` for every selected signal, in both
//!   stores, including derived signals' own time axes, re-established by
//!   a single recomputation walk on every reference change;
//! - a new file load replaces the dataset and clears both stores in one
//!   call, so no reader ever observes a half-replaced session.
//!
//! All lookup operations are total over absent keys: misses produce
//! `false`/empty sentinels, never panics. Collaborators learn about state
//! changes through [`StoreEvent`]s on a channel handed out at
//! construction.

use crate::conf;
use crate::error::{Result, ResultExt};
use crate::loader::{decode, DecodedMat, MatSource};
use crate::nested;
use crate::scripting::ScriptEngine;
use crate::types::{
    is_valid_path, offset_series, qualified_name, resolve, split_parent_child, Dataset,
    SelectionStore, SignalValue, TimeBase, Value, CUSTOM_GROUP, TIMESTAMP_KEY,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::Path;

/// Change notifications for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// A new dataset replaced the session; selections were cleared
    NewDataLoaded,
    /// Selection contents or displayed timestamps changed; re-plot needed
    SelectionChanged,
    /// The auto-derived reference timestamp changed (placeholder text)
    TsRefPlaceholderChanged,
    /// Custom signals were merged into the dataset; the tree gained nodes
    TreeNodesAdded,
}

/// Which of the two selection stores an operation addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionKind {
    /// Signals drawn in the analysis plot
    #[default]
    Plot,
    /// Signals shown only in the data-insight readout
    InsightOnly,
}

/// A flat view of one selected signal, used by the insight builders
struct SelectedSignal<'a> {
    parent: &'a str,
    child: &'a str,
    ts: &'a [f64],
    val: &'a [f64],
}

/// Owner of the session state: dataset, selections, reference timestamp
pub struct SignalStore {
    dataset: Option<Dataset>,
    plot_selection: SelectionStore,
    insight_selection: SelectionStore,
    /// Auto-derived at load time; never mutated afterwards
    loaded_ts_ref: Option<f64>,
    /// Live, user-adjustable reference value
    global_ts_ref: Option<f64>,
    events: Sender<StoreEvent>,
}

impl SignalStore {
    /// Create an empty store and the receiver for its change notifications
    pub fn new() -> (Self, Receiver<StoreEvent>) {
        let (events, receiver) = unbounded();
        (
            Self {
                dataset: None,
                plot_selection: SelectionStore::new(),
                insight_selection: SelectionStore::new(),
                loaded_ts_ref: None,
                global_ts_ref: None,
                events,
            },
            receiver,
        )
    }

    /// True once a dataset has been loaded
    pub fn is_mat_loaded(&self) -> bool {
        self.dataset.is_some()
    }

    /// The loaded dataset, if any
    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// The plotting selection store
    pub fn plot_selection(&self) -> &SelectionStore {
        &self.plot_selection
    }

    /// The insight-only selection store
    pub fn insight_selection(&self) -> &SelectionStore {
        &self.insight_selection
    }

    /// The live reference timestamp
    pub fn global_ts_ref(&self) -> Option<f64> {
        self.global_ts_ref
    }

    /// The reference timestamp derived at load time
    pub fn loaded_ts_ref(&self) -> Option<f64> {
        self.loaded_ts_ref
    }

    /// Read a MAT file through `source` and install it as the new session.
    pub fn load_file(&mut self, source: &dyn MatSource, path: &Path) -> Result<()> {
        let raw = source
            .read(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        self.install(decode(raw));
        tracing::info!(path = %path.display(), "MAT file loaded");
        Ok(())
    }

    /// Install an already decoded dataset (demo mode, tests).
    ///
    /// Replaces the dataset, clears both selection stores and reseeds the
    /// reference timestamp in one step, atomic from any reader's view.
    pub fn load_decoded(&mut self, decoded: DecodedMat) {
        self.install(decoded);
    }

    fn install(&mut self, decoded: DecodedMat) {
        if decoded.unverified {
            tracing::warn!(
                "MAT format version {} or above has not been verified; results are not guaranteed",
                crate::loader::UNVERIFIED_VERSION
            );
        }
        self.plot_selection.clear();
        self.insight_selection.clear();
        self.loaded_ts_ref = nested::min_value(&decoded.data, &HashSet::from([TIMESTAMP_KEY]));
        self.global_ts_ref = self.loaded_ts_ref;
        self.dataset = Some(decoded.data);
        self.emit(StoreEvent::NewDataLoaded);
        self.emit(StoreEvent::TsRefPlaceholderChanged);
    }

    /// True iff the signal addressed by `path` is held in `kind`'s store
    pub fn is_selected(&self, path: &[String], kind: SelectionKind) -> bool {
        let Some((parent, child)) = split_parent_child(path) else {
            return false;
        };
        self.selection(kind)
            .get(parent)
            .is_some_and(|entry| entry.children.contains_key(child))
    }

    /// Select the signal addressed by `path` into `kind`'s store.
    ///
    /// Plain series require a `TimestampLogfile` sibling in their group;
    /// derived (custom) entries carry their own time axis and do not.
    /// Callers check [`Self::is_selected`] first; `select` does not guard
    /// against re-selection itself.
    pub fn select(&mut self, path: &[String], kind: SelectionKind) -> bool {
        if !is_valid_path(path) {
            tracing::debug!(?path, "invalid signal path");
            return false;
        }
        let (parent, child) = match split_parent_child(path) {
            Some(pair) => (pair.0.to_string(), pair.1.to_string()),
            None => return false,
        };
        let Some(dataset) = self.dataset.as_ref() else {
            return false;
        };
        let group = match resolve(dataset, &path[..path.len() - 1]).and_then(Value::as_struct) {
            Some(group) if !group.is_empty() => group,
            _ => {
                tracing::debug!(?path, "signal group not found or empty");
                return false;
            }
        };

        let selected = match group.get(child.as_str()) {
            // A struct-valued child is a derived signal carrying its own axis
            Some(Value::Struct(fields)) => {
                let (Some(x), Some(y)) = (
                    fields.get("x").and_then(Value::as_series),
                    fields.get("y").and_then(Value::as_series),
                ) else {
                    tracing::debug!(?path, "derived signal lacks numeric x/y");
                    return false;
                };
                SignalValue::Derived {
                    ts: offset_series(x, self.global_ts_ref),
                    ts_raw: x.to_vec(),
                    val: y.to_vec(),
                }
            }
            Some(Value::Series(values)) => SignalValue::Plain(values.clone()),
            Some(Value::Scalar(scalar)) => SignalValue::Plain(vec![*scalar]),
            _ => {
                tracing::debug!(?path, "signal not found in its group");
                return false;
            }
        };

        // Plain signals cannot be plotted without a shared time axis
        let time_base = if matches!(selected, SignalValue::Plain(_)) {
            match group.get(TIMESTAMP_KEY).and_then(Value::as_series) {
                Some(ts_raw) => Some(TimeBase::new(ts_raw, self.global_ts_ref)),
                None => {
                    tracing::debug!(
                        ?path,
                        "group has no {} array, cannot plot without a time axis",
                        TIMESTAMP_KEY
                    );
                    return false;
                }
            }
        } else {
            None
        };

        let entry = self.selection_mut(kind).entry(parent).or_default();
        // The time base is created once per entry and reused by later
        // siblings, never recomputed here
        if entry.time.is_none() {
            entry.time = time_base;
        }
        entry.children.insert(child, selected);

        self.emit(StoreEvent::SelectionChanged);
        true
    }

    /// Remove the signal addressed by `path` from `kind`'s store.
    ///
    /// Removing the last child removes the whole entry, so no orphaned
    /// timestamp-only bookkeeping is left behind. Returns whether anything
    /// was removed and the qualified `parent/child` name.
    pub fn deselect(&mut self, path: &[String], kind: SelectionKind) -> (bool, String) {
        let Some((parent, child)) = split_parent_child(path) else {
            return (false, String::new());
        };
        let (parent, child) = (parent.to_string(), child.to_string());
        let store = self.selection_mut(kind);
        let Some(entry) = store.get_mut(&parent) else {
            return (false, String::new());
        };
        if entry.children.shift_remove(&child).is_none() {
            return (false, String::new());
        }
        if entry.children.is_empty() {
            store.shift_remove(&parent);
        }

        self.emit(StoreEvent::SelectionChanged);
        (true, qualified_name(&parent, &child))
    }

    /// Clear both selection stores, keeping the dataset intact
    pub fn deselect_all_signals(&mut self) {
        if self.plot_selection.is_empty() && self.insight_selection.is_empty() {
            return;
        }
        self.plot_selection.clear();
        self.insight_selection.clear();
        self.emit(StoreEvent::SelectionChanged);
    }

    /// Update the live reference timestamp and recompute every displayed
    /// timestamp in both stores.
    ///
    /// No-op (returns false) when no dataset is loaded, the value is not
    /// finite, or it equals the current reference.
    pub fn update_global_ts_ref(&mut self, value: f64) -> bool {
        if self.dataset.is_none() || !value.is_finite() {
            return false;
        }
        if self.global_ts_ref == Some(value) {
            return false;
        }
        self.global_ts_ref = Some(value);

        // The single recomputation path: every selected signal in both
        // stores is visited exactly once
        let ts_ref = self.global_ts_ref;
        for store in [&mut self.plot_selection, &mut self.insight_selection] {
            for entry in store.values_mut() {
                if let Some(time) = entry.time.as_mut() {
                    time.retime(ts_ref);
                }
                for value in entry.children.values_mut() {
                    if let SignalValue::Derived { ts, ts_raw, .. } = value {
                        *ts = offset_series(ts_raw, ts_ref);
                    }
                }
            }
        }

        self.emit(StoreEvent::SelectionChanged);
        true
    }

    /// Text front door for reference updates; coercion failure rejects
    pub fn update_global_ts_ref_text(&mut self, text: &str) -> bool {
        match text.trim().parse::<f64>() {
            Ok(value) => self.update_global_ts_ref(value),
            Err(_) => {
                tracing::debug!(input = text, "reference timestamp is not numeric, ignored");
                false
            }
        }
    }

    /// Reset the reference timestamp to the value derived at load time
    pub fn reset_global_ts_ref(&mut self) -> bool {
        match self.loaded_ts_ref {
            Some(value) => self.update_global_ts_ref(value),
            None => false,
        }
    }

    /// Run a custom-function script and merge its results into the
    /// dataset's custom group.
    ///
    /// Existing function names have their x/y content updated in place;
    /// other custom signals survive untouched. Returns the names of the
    /// merged functions.
    pub fn add_custom_data_points(
        &mut self,
        engine: &ScriptEngine,
        script_path: &Path,
    ) -> Result<Vec<String>> {
        let Some(dataset) = self.dataset.as_ref() else {
            return Ok(Vec::new());
        };
        let results = engine.load(script_path, dataset)?;
        if results.is_empty() {
            return Ok(Vec::new());
        }

        let names: Vec<String> = results.keys().cloned().collect();
        let mut overlay = Dataset::new();
        for (name, series) in results {
            let mut fields = Dataset::new();
            fields.insert("x".into(), Value::Series(series.x));
            fields.insert("y".into(), Value::Series(series.y));
            overlay.insert(name, Value::Struct(fields));
        }

        let dataset = self.dataset.as_mut().expect("dataset checked above");
        let base = dataset
            .get(CUSTOM_GROUP)
            .cloned()
            .unwrap_or_else(|| Value::Struct(Dataset::new()));
        let merged = nested::merge(&base, &Value::Struct(overlay));
        dataset.insert(CUSTOM_GROUP.to_string(), merged);

        self.emit(StoreEvent::TreeNodesAdded);
        Ok(names)
    }

    /// Read-only lookup of a selected signal's plot data.
    ///
    /// Checks the plotting store first, then the insight-only store.
    /// Returns `(ts, values, qualified_name)`, empty on any miss.
    pub fn get_signal_data(&self, path: &[String]) -> (Vec<f64>, Vec<f64>, String) {
        let Some((parent, child)) = split_parent_child(path) else {
            return (Vec::new(), Vec::new(), String::new());
        };
        for store in [&self.plot_selection, &self.insight_selection] {
            let Some(entry) = store.get(parent) else {
                continue;
            };
            let Some(value) = entry.children.get(child) else {
                continue;
            };
            let (ts, val) = match value {
                SignalValue::Plain(val) => {
                    let ts = entry.time.as_ref().map(|t| t.ts.clone()).unwrap_or_default();
                    (ts, val.clone())
                }
                SignalValue::Derived { ts, val, .. } => (ts.clone(), val.clone()),
            };
            return (ts, val, qualified_name(parent, child));
        }
        (Vec::new(), Vec::new(), String::new())
    }

    /// Snapshot of current values (first sample) of every selected signal,
    /// across both stores, keyed by display name.
    pub fn get_default_insight(&self) -> IndexMap<String, f64> {
        let signals = self.collect_signals();
        let mut insight = IndexMap::new();
        for signal in &signals {
            if let Some(first) = signal.val.first() {
                insight.insert(display_name(signal, &signals), *first);
            }
        }
        insight
    }

    /// Values of the named series at the sample closest to `ref_time`.
    ///
    /// `series` filters by qualified name; an empty slice means every
    /// selected signal. Nearest-neighbor by minimum absolute difference,
    /// ties resolving to the first occurrence.
    pub fn get_time_based_insight(
        &self,
        series: &[String],
        ref_time: f64,
    ) -> IndexMap<String, f64> {
        let signals = self.collect_signals();
        let mut insight = IndexMap::new();
        for signal in &signals {
            if !series.is_empty()
                && !series
                    .iter()
                    .any(|s| s == &qualified_name(signal.parent, signal.child))
            {
                continue;
            }
            let Some(index) = nearest_index(signal.ts, ref_time) else {
                continue;
            };
            if let Some(value) = signal.val.get(index) {
                insight.insert(display_name(signal, &signals), *value);
            }
        }
        insight
    }

    /// Formatted default insight, ready for the text display
    pub fn default_insight_text(&self) -> String {
        nested::format_insight(&self.get_default_insight())
    }

    /// Formatted time-based insight, ready for the text display
    pub fn time_based_insight_text(&self, series: &[String], ref_time: f64) -> String {
        nested::format_insight(&self.get_time_based_insight(series, ref_time))
    }

    /// Apply a parsed `.conf` file: primary groups select into the plot
    /// store, secondary groups into the insight-only store. Already
    /// selected signals are left alone. Returns (plot, insight) counts.
    pub fn apply_conf(&mut self, path: &Path) -> (usize, usize) {
        let (primary, secondary) = conf::parse(path);
        let plot = self.select_groups(&primary, SelectionKind::Plot);
        let insight = self.select_groups(&secondary, SelectionKind::InsightOnly);
        tracing::info!(
            path = %path.display(),
            plot,
            insight,
            "configuration applied"
        );
        (plot, insight)
    }

    fn select_groups(&mut self, groups: &[Vec<String>], kind: SelectionKind) -> usize {
        let mut count = 0;
        for group in groups {
            if self.is_selected(group, kind) {
                continue;
            }
            if self.select(group, kind) {
                count += 1;
            }
        }
        count
    }

    fn selection(&self, kind: SelectionKind) -> &SelectionStore {
        match kind {
            SelectionKind::Plot => &self.plot_selection,
            SelectionKind::InsightOnly => &self.insight_selection,
        }
    }

    fn selection_mut(&mut self, kind: SelectionKind) -> &mut SelectionStore {
        match kind {
            SelectionKind::Plot => &mut self.plot_selection,
            SelectionKind::InsightOnly => &mut self.insight_selection,
        }
    }

    /// Flatten both stores into per-signal views (plot store first)
    fn collect_signals(&self) -> Vec<SelectedSignal<'_>> {
        let mut signals = Vec::new();
        for store in [&self.plot_selection, &self.insight_selection] {
            for (parent, entry) in store {
                for (child, value) in &entry.children {
                    let (ts, val) = match value {
                        SignalValue::Plain(val) => {
                            let ts = entry
                                .time
                                .as_ref()
                                .map(|t| t.ts.as_slice())
                                .unwrap_or_default();
                            (ts, val.as_slice())
                        }
                        SignalValue::Derived { ts, val, .. } => (ts.as_slice(), val.as_slice()),
                    };
                    signals.push(SelectedSignal {
                        parent,
                        child,
                        ts,
                        val,
                    });
                }
            }
        }
        signals
    }

    fn emit(&self, event: StoreEvent) {
        // A dropped receiver only means no UI is listening (tests)
        let _ = self.events.send(event);
    }
}

/// Display name for the insight readout: the bare child name, qualified
/// with the parent only when the child name collides across parents.
fn display_name(signal: &SelectedSignal<'_>, all: &[SelectedSignal<'_>]) -> String {
    let collides = all
        .iter()
        .any(|other| other.child == signal.child && other.parent != signal.parent);
    if collides {
        qualified_name(signal.parent, signal.child)
    } else {
        signal.child.to_string()
    }
}

/// Index of the sample whose timestamp is closest to `target`.
///
/// Ties resolve to the first occurrence (strict improvement required).
fn nearest_index(ts: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, t) in ts.iter().enumerate() {
        let distance = (t - target).abs();
        if best.is_none_or(|(_, current)| distance < current) {
            best = Some((index, distance));
        }
    }
    best.map(|(index, _)| index)
}
