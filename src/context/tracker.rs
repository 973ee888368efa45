//! Context state tracking.
//!
//! The tracker owns the session [`ContextState`] and reads the cached
//! analysis to answer "what is relevant right now" queries. State is written
//! back to the store after every mutation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use super::{ContextState, Layer};
use crate::cache::store::{load_json, save_json, KeyValueStore, CONTEXT_STATE_KEY};
use crate::cache::{AnalysisCache, ProjectAnalysis};
use crate::config::AnalysisConfig;
use crate::graph::{reverse_import_index, DependencyRelationship};
use crate::paths;
use crate::structure::Category;

/// Categories searched for sibling files.
const SIBLING_CATEGORIES: &[Category] = &[
    Category::Contracts,
    Category::Backend,
    Category::Frontend,
    Category::Tests,
];

const ELLIPSIS: &str = "...";

/// Tracks focus, recent files and the active layer for one session.
pub struct ContextTracker {
    cache: Arc<AnalysisCache>,
    store: Arc<dyn KeyValueStore>,
    state: ContextState,
    recent_limit: usize,
    sibling_limit: usize,
}

impl ContextTracker {
    /// Create a tracker, restoring persisted state or starting fresh.
    pub fn new(
        cache: Arc<AnalysisCache>,
        store: Arc<dyn KeyValueStore>,
        config: &AnalysisConfig,
    ) -> Self {
        let state = load_json(store.as_ref(), CONTEXT_STATE_KEY).unwrap_or_default();
        Self {
            cache,
            store,
            state,
            recent_limit: config.recent_files_limit,
            sibling_limit: config.sibling_limit,
        }
    }

    pub fn state(&self) -> &ContextState {
        &self.state
    }

    /// Replace the focus set and infer the active layer from it.
    pub fn set_focus(&mut self, files: Vec<String>) {
        if let Some(analysis) = self.cache.get() {
            if let Some(layer) = files
                .iter()
                .find_map(|file| Self::detect_layer(file, &analysis))
            {
                self.state.active_layer = Some(layer);
            }
        }
        self.state.current_focus = Some(files);
        self.state.last_updated = Utc::now();
        self.persist();
    }

    pub fn clear_focus(&mut self) {
        self.state.current_focus = None;
        self.state.last_updated = Utc::now();
        self.persist();
    }

    /// Record a file touch in the MRU list and follow its layer.
    pub fn add_recent(&mut self, file: &str) {
        self.state.touch(file, self.recent_limit);
        if let Some(layer) = self
            .cache
            .get()
            .and_then(|analysis| Self::detect_layer(file, &analysis))
        {
            self.state.active_layer = Some(layer);
        }
        self.persist();
    }

    /// Files related to the focus set, at most `max_files`, all existing.
    ///
    /// For each focus file this collects the other endpoint of every
    /// touching edge, then up to `sibling_limit` files from the same
    /// directory in the contract, backend, frontend and test categories.
    /// `focus` defaults to the current focus.
    pub fn get_related(&self, focus: Option<&[String]>, max_files: usize) -> Vec<String> {
        let Some(analysis) = self.cache.get() else {
            return Vec::new();
        };
        let focus = focus.unwrap_or_else(|| self.state.focus());
        Self::related_in(&analysis, focus, max_files, self.sibling_limit)
    }

    fn related_in(
        analysis: &ProjectAnalysis,
        focus: &[String],
        max_files: usize,
        sibling_limit: usize,
    ) -> Vec<String> {
        let focus_set: HashSet<&str> = focus.iter().map(String::as_str).collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mut related: Vec<String> = Vec::new();

        let mut push = |candidate: &str, related: &mut Vec<String>| {
            if !focus_set.contains(candidate) && seen.insert(candidate.to_string()) {
                related.push(candidate.to_string());
            }
        };

        for file in focus {
            for rel in &analysis.relationships {
                if let Some(other) = rel.other_end(file) {
                    push(other, &mut related);
                }
            }

            let dir = paths::parent_dir(file);
            let siblings = SIBLING_CATEGORIES
                .iter()
                .flat_map(|&category| analysis.structure.files(category).iter())
                .filter(|candidate| *candidate != file && paths::parent_dir(candidate) == dir)
                .take(sibling_limit);
            for sibling in siblings {
                push(sibling.as_str(), &mut related);
            }
        }

        related.truncate(max_files);
        related
            .into_iter()
            .filter(|path| analysis.root_path.join(path).is_file())
            .collect()
    }

    /// Layer of `file`: first of contract, backend, frontend, test, config.
    pub fn detect_layer(file: &str, analysis: &ProjectAnalysis) -> Option<Layer> {
        Layer::all()
            .iter()
            .copied()
            .find(|layer| analysis.structure.files(layer.category()).contains(file))
    }

    /// Every file that imports `file`, directly or transitively.
    pub fn find_transitive_dependents(&self, file: &str) -> Vec<String> {
        match self.cache.get() {
            Some(analysis) => transitive_dependents(&analysis.relationships, file),
            None => Vec::new(),
        }
    }

    /// Bounded natural-language description of the current context.
    ///
    /// Hard-truncated to `max_length` characters, ending in `...` when cut.
    pub fn summarize(&self, max_length: usize) -> String {
        let analysis = self.cache.get();
        let mut parts: Vec<String> = Vec::new();

        if let Some(stack) = analysis.as_ref().and_then(|a| a.stack.describe()) {
            parts.push(format!("Stack: {}.", stack));
        }

        if let Some(layer) = self.state.active_layer {
            parts.push(format!("Active layer: {}.", layer));
        }

        let focus = self.state.focus();
        if !focus.is_empty() {
            let shown: Vec<&str> = focus.iter().take(3).map(String::as_str).collect();
            let mut line = format!("Focus: {}", shown.join(", "));
            if focus.len() > shown.len() {
                line.push_str(&format!(" (+{} more)", focus.len() - shown.len()));
            }
            line.push('.');
            parts.push(line);
        }

        if let Some(analysis) = &analysis {
            let counts: Vec<String> = analysis
                .structure
                .counts()
                .into_iter()
                .filter(|(_, n)| *n > 0)
                .map(|(category, n)| format!("{} {}", n, category))
                .collect();
            if !counts.is_empty() {
                parts.push(format!("Files: {}.", counts.join(", ")));
            }
        }

        let text = if parts.is_empty() {
            "No project context available.".to_string()
        } else {
            parts.join(" ")
        };

        truncate_with_ellipsis(&text, max_length)
    }

    fn persist(&self) {
        if save_json(self.store.as_ref(), CONTEXT_STATE_KEY, &self.state) {
            debug!(
                "Saved context state ({} recent files)",
                self.state.recent_files.len()
            );
        }
    }
}

/// Reverse-import reachability from `file`, sorted, `file` excluded.
///
/// Iterative DFS with a visited set; terminates on cyclic graphs.
pub fn transitive_dependents(relationships: &[DependencyRelationship], file: &str) -> Vec<String> {
    let importers: HashMap<&str, Vec<&str>> = reverse_import_index(relationships);

    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(file);
    let mut stack: Vec<&str> = vec![file];

    while let Some(node) = stack.pop() {
        for &importer in importers.get(node).into_iter().flatten() {
            if visited.insert(importer) {
                stack.push(importer);
            }
        }
    }

    let mut dependents: Vec<String> = visited
        .into_iter()
        .filter(|&path| path != file)
        .map(str::to_string)
        .collect();
    dependents.sort();
    dependents
}

/// Cut `text` to `max_length` characters, replacing the tail with `...`.
pub fn truncate_with_ellipsis(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    if max_length <= ELLIPSIS.len() {
        return ELLIPSIS.chars().take(max_length).collect();
    }
    let mut cut: String = text.chars().take(max_length - ELLIPSIS.len()).collect();
    cut.push_str(ELLIPSIS);
    cut
}
