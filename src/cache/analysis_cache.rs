//! The cached analysis slot.
//!
//! Holds at most one [`ProjectAnalysis`]. Callers always receive clones.
//! Persistence failures are logged and show up later as cache misses; no
//! method here returns an error.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::store::{load_json, save_json, KeyValueStore, ANALYSIS_KEY};
use super::{CachedAnalysis, ProjectAnalysis};
use crate::config::AnalysisConfig;
use crate::graph::{RelationType, RelationshipResolver};

/// Cache of the most recent project analysis.
pub struct AnalysisCache {
    store: Arc<dyn KeyValueStore>,
    config: AnalysisConfig,
}

impl AnalysisCache {
    pub fn new(store: Arc<dyn KeyValueStore>, config: AnalysisConfig) -> Self {
        Self { store, config }
    }

    /// The cached analysis, if one is stored and readable.
    pub fn get(&self) -> Option<ProjectAnalysis> {
        self.get_entry().map(|entry| entry.analysis)
    }

    /// The cached analysis together with its write timestamp.
    pub fn get_entry(&self) -> Option<CachedAnalysis> {
        load_json(self.store.as_ref(), ANALYSIS_KEY)
    }

    /// Replace the cached analysis.
    pub fn put(&self, analysis: &ProjectAnalysis) {
        let entry = CachedAnalysis {
            analysis: analysis.clone(),
            cached_at: Utc::now(),
        };
        if save_json(self.store.as_ref(), ANALYSIS_KEY, &entry) {
            debug!(
                "Cached analysis with {} relationships",
                analysis.relationships.len()
            );
        }
    }

    /// Whether the cache is missing or older than `max_age`.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.is_stale_at(Utc::now(), max_age)
    }

    /// Staleness relative to an explicit clock reading.
    pub fn is_stale_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match self.get() {
            Some(analysis) => is_older_than(analysis.analyzed_at, now, max_age),
            None => true,
        }
    }

    /// Refresh the edges of one file without rescanning the project.
    ///
    /// Every edge touching `path` is dropped. If the file still exists, its
    /// edges are re-resolved from its current content and appended, and the
    /// files that imported it before the patch are re-scanned so that only
    /// imports still present in their content come back. File categories are
    /// not recomputed.
    pub fn patch_file(&self, path: &str) {
        let Some(mut analysis) = self.get() else {
            debug!("No cached analysis to patch for {}", path);
            return;
        };

        let root = analysis.root_path.clone();
        let content = std::fs::read_to_string(root.join(path)).ok();
        let before = analysis.relationships.len();

        let importers: BTreeSet<String> = analysis
            .relationships
            .iter()
            .filter(|rel| rel.kind == RelationType::Import && rel.to == path && rel.from != path)
            .map(|rel| rel.from.clone())
            .collect();

        analysis.relationships.retain(|rel| !rel.touches(path));
        let retained = analysis.relationships.len();

        if let Some(content) = content {
            let resolver = RelationshipResolver::new(&root, &self.config);
            let fresh = resolver.resolve_file(path, &content, &analysis.structure);
            analysis.relationships.extend(fresh);

            for importer in &importers {
                let importer_content = match std::fs::read_to_string(root.join(importer)) {
                    Ok(importer_content) => importer_content,
                    Err(e) => {
                        debug!("Dropping imports of unreadable {}: {}", importer, e);
                        continue;
                    }
                };
                let still_imported: Vec<_> = resolver
                    .import_edges(importer, &importer_content, &analysis.structure)
                    .into_iter()
                    .filter(|rel| rel.to == path)
                    .collect();
                analysis.relationships.extend(still_imported);
            }
        }

        info!(
            "Patched {}: {} edges removed, {} added",
            path,
            before - retained,
            analysis.relationships.len() - retained
        );

        self.put(&analysis);
    }
}

fn is_older_than(analyzed_at: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    let age = now.signed_duration_since(analyzed_at);
    match chrono::Duration::from_std(max_age) {
        Ok(max_age) => age > max_age,
        Err(_) => false,
    }
}
