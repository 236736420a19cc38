//! # QuadView-RS: MATLAB Signal-Log Viewer
//!
//! A desktop tool for visually inspecting recorded MATLAB (.mat) signal
//! logs: a tree of named signals, a time-series plot, a data-insight
//! readout and a scrubber synchronized across them.
//!
//! ## Architecture
//!
//! - **Loader**: reads MAT files through the [`loader::MatSource`] seam
//!   and decodes them into an ordered nested [`types::Dataset`]
//! - **Store**: [`store::SignalStore`] owns the session (dataset, the
//!   two selection stores and the global reference timestamp) and is the
//!   only place selection state is ever mutated
//! - **Tree**: [`tree::SignalTree`] indexes the dataset's keys for the
//!   browser panel, with debounced wildcard filtering
//! - **Scripting**: Rhai-based custom signal functions deriving new x/y
//!   series from the loaded data
//! - **Frontend**: an eframe/egui shell rendering the quad layout
//!
//! ## Example
//!
//! ```ignore
//! use quadview_rs::loader::MatfileSource;
//! use quadview_rs::store::{SelectionKind, SignalStore};
//!
//! let (mut store, events) = SignalStore::new();
//! store.load_file(&MatfileSource, "recording.mat".as_ref())?;
//! store.select(&["Radar".into(), "Range".into()], SelectionKind::Plot);
//! let (ts, values, name) = store.get_signal_data(&["Radar".into(), "Range".into()]);
//! ```

pub mod conf;
pub mod config;
pub mod error;
pub mod frontend;
pub mod loader;
pub mod nested;
pub mod scripting;
pub mod store;
pub mod tree;
pub mod types;

// Re-export commonly used types
pub use config::AppState;
pub use error::{QuadViewError, Result};
pub use frontend::QuadViewApp;
pub use loader::{MatSource, MatfileSource, SyntheticSource};
pub use scripting::ScriptEngine;
pub use store::{SelectionKind, SignalStore, StoreEvent};
pub use tree::{FilterDebouncer, SignalTree};
pub use types::{Dataset, SignalValue, Value};
