//! Session context: what the user is working on right now.
//!
//! - [`tracker`] - focus and recent-file tracking plus graph-derived
//!   working sets

pub mod tracker;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::structure::Category;

pub use tracker::ContextTracker;

/// Architectural layer a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Contract,
    Backend,
    Frontend,
    Test,
    Config,
}

impl Layer {
    /// Layers in detection order.
    pub fn all() -> &'static [Layer] {
        &[
            Layer::Contract,
            Layer::Backend,
            Layer::Frontend,
            Layer::Test,
            Layer::Config,
        ]
    }

    /// Structure category backing this layer.
    pub fn category(&self) -> Category {
        match self {
            Layer::Contract => Category::Contracts,
            Layer::Backend => Category::Backend,
            Layer::Frontend => Category::Frontend,
            Layer::Test => Category::Tests,
            Layer::Config => Category::Config,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Contract => "contract",
            Layer::Backend => "backend",
            Layer::Frontend => "frontend",
            Layer::Test => "test",
            Layer::Config => "config",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable session state, persisted alongside the analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextState {
    #[serde(default)]
    pub current_focus: Option<Vec<String>>,
    /// Most-recent-first, no duplicates.
    #[serde(default)]
    pub recent_files: Vec<String>,
    #[serde(default)]
    pub active_layer: Option<Layer>,
    pub last_updated: DateTime<Utc>,
}

impl Default for ContextState {
    fn default() -> Self {
        Self {
            current_focus: None,
            recent_files: Vec::new(),
            active_layer: None,
            last_updated: Utc::now(),
        }
    }
}

impl ContextState {
    /// Move `file` to the front of the recent list, keeping at most `limit`.
    pub fn touch(&mut self, file: &str, limit: usize) {
        self.recent_files.retain(|f| f != file);
        self.recent_files.insert(0, file.to_string());
        self.recent_files.truncate(limit);
        self.last_updated = Utc::now();
    }

    /// Focus files, empty when none are set.
    pub fn focus(&self) -> &[String] {
        self.current_focus.as_deref().unwrap_or(&[])
    }
}
