//! Application state persistence.
//!
//! Remembers the things a user expects to survive a restart: recently
//! opened log files, the theme choice and the last tree filter. Stored as
//! JSON in the platform-appropriate data directory:
//!
//! - **Linux**: `~/.local/share/quadview-rs/`
//! - **macOS**: `~/Library/Application Support/quadview-rs/`
//! - **Windows**: `%APPDATA%\quadview-rs\`
//!
//! A missing or corrupt state file falls back to defaults with a logged
//! warning; persistence failures are never fatal.

use crate::error::{QuadViewError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "quadview-rs";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Maximum number of recent files to remember
pub const MAX_RECENT_FILES: usize = 10;

/// Persisted application state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    /// Recently opened MAT files, most recent first
    #[serde(default)]
    pub recent_files: Vec<PathBuf>,
    /// Dark theme preference
    #[serde(default = "default_dark_mode")]
    pub dark_mode: bool,
    /// Last tree filter text
    #[serde(default)]
    pub last_filter: String,
}

fn default_dark_mode() -> bool {
    true
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            recent_files: Vec::new(),
            dark_mode: true,
            last_filter: String::new(),
        }
    }
}

impl AppState {
    /// Load the persisted state, falling back to defaults on any failure
    pub fn load_or_default() -> Self {
        match Self::state_file_path() {
            Some(path) => match Self::load(&path) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(error = %e, "could not load app state, using defaults");
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }

    fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| QuadViewError::Serialization(e.to_string()))
    }

    /// Persist the state to the data directory
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::state_file_path() else {
            return Err(QuadViewError::Config(
                "no data directory available".to_string(),
            ));
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| QuadViewError::Serialization(e.to_string()))?;
        std::fs::write(&path, contents)?;
        Ok(())
    }

    /// Add a file to the recents list, most recent first, capped
    pub fn add_recent_file(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.recent_files.retain(|p| p != &path);
        self.recent_files.insert(0, path);
        self.recent_files.truncate(MAX_RECENT_FILES);
    }

    /// Drop recents that no longer exist on disk
    pub fn cleanup_missing_files(&mut self) {
        self.recent_files.retain(|p| p.is_file());
    }

    /// The most recently opened file, if any
    pub fn last_file(&self) -> Option<&Path> {
        self.recent_files.first().map(PathBuf::as_path)
    }

    fn state_file_path() -> Option<PathBuf> {
        dirs_next::data_dir().map(|p| p.join(APP_ID).join(APP_STATE_FILE))
    }
}
