//! Analysis cache.
//!
//! - [`store`] - key-value persistence ([`JsonFileStore`], [`MemoryStore`])
//! - [`analysis_cache`] - the single cached [`ProjectAnalysis`] slot with
//!   staleness and per-file patching

pub mod analysis_cache;
pub mod store;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::DependencyRelationship;
use crate::stack::ProjectStack;
use crate::structure::ProjectStructure;

pub use analysis_cache::AnalysisCache;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, ANALYSIS_KEY, CONTEXT_STATE_KEY};

/// Combined result of a full project scan; the unit of caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalysis {
    pub stack: ProjectStack,
    pub structure: ProjectStructure,
    pub relationships: Vec<DependencyRelationship>,
    pub root_path: PathBuf,
    pub analyzed_at: DateTime<Utc>,
}

/// Persisted wrapper recording when the analysis was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedAnalysis {
    pub analysis: ProjectAnalysis,
    pub cached_at: DateTime<Utc>,
}
