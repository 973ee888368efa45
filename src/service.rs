//! Project graph service.
//!
//! The single entry point used by hosts and the CLI. Every call is
//! synchronous and does its work on the calling thread. Inputs may be
//! absolute or relative paths; they are normalised to repo-relative
//! `/`-separated strings before reaching the cache or the tracker.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::cache::{AnalysisCache, JsonFileStore, KeyValueStore, ProjectAnalysis};
use crate::config::AnalysisConfig;
use crate::context::{ContextState, ContextTracker, Layer};
use crate::error::Result;
use crate::graph::{BrokenRelationship, RelationshipResolver, RelationshipValidator};
use crate::paths;
use crate::stack::detect_stack;
use crate::structure::map_structure;

/// Related files pulled into the auto-load set.
const AUTO_LOAD_RELATED: usize = 5;

/// Layer-specific configuration files pulled into the auto-load set.
const AUTO_LOAD_CONFIGS: usize = 2;

/// Result of [`ProjectGraphService::analyze`].
#[derive(Debug, Clone)]
pub struct AnalyzeOutcome {
    pub analysis: ProjectAnalysis,
    /// Whether the analysis came from the cache.
    pub cached: bool,
    /// Scannable files skipped by the import scan limit.
    pub unscanned_files: usize,
}

/// Dependency graph and context cache for one project root.
pub struct ProjectGraphService {
    root: PathBuf,
    config: AnalysisConfig,
    cache: Arc<AnalysisCache>,
    tracker: ContextTracker,
}

impl ProjectGraphService {
    /// Open a project, reading `.layermap/settings.json` and using the
    /// on-disk cache under `.layermap/cache`.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but is invalid.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = canonical_root(root.as_ref());
        let config = AnalysisConfig::load(&root)?;
        let store: Arc<dyn KeyValueStore> =
            Arc::new(JsonFileStore::new(AnalysisConfig::cache_dir(&root)));
        Ok(Self::with_store(root, config, store))
    }

    /// Build a service over an explicit store.
    pub fn with_store<P: AsRef<Path>>(
        root: P,
        config: AnalysisConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let root = canonical_root(root.as_ref());
        let cache = Arc::new(AnalysisCache::new(store.clone(), config.clone()));
        let tracker = ContextTracker::new(cache.clone(), store, &config);
        Self {
            root,
            config,
            cache,
            tracker,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Return the cached analysis, or rebuild it when missing, stale or
    /// `force` is set.
    pub fn analyze(&self, force: bool) -> AnalyzeOutcome {
        if !force {
            if let Some(entry) = self.cache.get_entry() {
                if !self.cache.is_stale(self.config.max_age()) {
                    debug!("Using cached analysis from {}", entry.cached_at);
                    return AnalyzeOutcome {
                        analysis: entry.analysis,
                        cached: true,
                        unscanned_files: 0,
                    };
                }
            }
        }

        info!("Analyzing project at {}", self.root.display());

        let stack = detect_stack(&self.root);
        let structure = map_structure(&self.root, &self.config);
        let resolution =
            RelationshipResolver::new(&self.root, &self.config).resolve_all(&structure);

        let analysis = ProjectAnalysis {
            stack,
            structure,
            relationships: resolution.relationships,
            root_path: self.root.clone(),
            analyzed_at: Utc::now(),
        };

        info!(
            "Analysis complete: {} files, {} relationships ({} files scanned)",
            analysis.structure.total_files(),
            analysis.relationships.len(),
            resolution.scanned
        );

        self.cache.put(&analysis);

        AnalyzeOutcome {
            analysis,
            cached: false,
            unscanned_files: resolution.unscanned,
        }
    }

    /// Refresh the graph after a write and record the file as recent.
    pub fn on_file_written<P: AsRef<Path>>(&mut self, path: P) {
        let rel = self.relative(path.as_ref());
        self.cache.patch_file(&rel);
        self.tracker.add_recent(&rel);
    }

    /// Drop a deleted file from the graph.
    pub fn on_file_deleted<P: AsRef<Path>>(&mut self, path: P) {
        let rel = self.relative(path.as_ref());
        self.cache.patch_file(&rel);
    }

    /// Set the focus files.
    pub fn set_focus<P: AsRef<Path>>(&mut self, files: &[P]) {
        let files = files.iter().map(|f| self.relative(f.as_ref())).collect();
        self.tracker.set_focus(files);
    }

    pub fn clear_focus(&mut self) {
        self.tracker.clear_focus();
    }

    pub fn context_state(&self) -> &ContextState {
        self.tracker.state()
    }

    /// Files related to `files` (or the current focus when empty).
    pub fn related<P: AsRef<Path>>(&self, files: &[P], max_files: usize) -> Vec<String> {
        if files.is_empty() {
            return self.tracker.get_related(None, max_files);
        }
        let focus: Vec<String> = files.iter().map(|f| self.relative(f.as_ref())).collect();
        self.tracker.get_related(Some(&focus), max_files)
    }

    /// Files importing `path`, directly or transitively.
    pub fn dependents<P: AsRef<Path>>(&self, path: P) -> Vec<String> {
        let rel = self.relative(path.as_ref());
        self.tracker.find_transitive_dependents(&rel)
    }

    pub fn get_context_summary(&self, max_length: usize) -> String {
        self.tracker.summarize(max_length)
    }

    /// Working set for a fresh session.
    ///
    /// Current focus, then the top related files, then up to two config
    /// files suited to the active layer. Only existing files are returned.
    pub fn get_files_to_auto_load(&self) -> Vec<String> {
        let state = self.tracker.state();
        let mut seen: HashSet<String> = HashSet::new();
        let mut files: Vec<String> = Vec::new();

        let configs = state
            .active_layer
            .map(layer_config_files)
            .unwrap_or(&[])
            .iter()
            .filter(|name| self.root.join(name).is_file())
            .take(AUTO_LOAD_CONFIGS)
            .map(|name| name.to_string());

        let candidates = state
            .focus()
            .iter()
            .cloned()
            .chain(self.tracker.get_related(None, AUTO_LOAD_RELATED))
            .chain(configs);

        for file in candidates {
            if self.root.join(&file).is_file() && seen.insert(file.clone()) {
                files.push(file);
            }
        }
        files
    }

    /// Audit the cached analysis; empty when nothing is cached.
    pub fn validate(&self) -> Vec<BrokenRelationship> {
        match self.cache.get() {
            Some(analysis) => RelationshipValidator::new(&self.root).validate(&analysis),
            None => {
                debug!("No cached analysis to validate");
                Vec::new()
            }
        }
    }

    fn relative(&self, path: &Path) -> String {
        if path.is_absolute() && !path.starts_with(&self.root) {
            if let Some(canonical) = canonicalize_lenient(path) {
                return paths::to_relative(&self.root, &canonical);
            }
        }
        paths::to_relative(&self.root, path)
    }
}

/// Config files worth loading alongside work in `layer`, in preference order.
fn layer_config_files(layer: Layer) -> &'static [&'static str] {
    match layer {
        Layer::Contract => &[
            "hardhat.config.ts",
            "hardhat.config.js",
            "foundry.toml",
            "Anchor.toml",
            "truffle-config.js",
        ],
        Layer::Backend => &["tsconfig.json", "package.json", "Cargo.toml", "pyproject.toml"],
        Layer::Frontend => &[
            "tsconfig.json",
            "next.config.js",
            "next.config.mjs",
            "vite.config.ts",
            "tailwind.config.js",
            "tailwind.config.ts",
            "package.json",
        ],
        Layer::Test => &[
            "jest.config.js",
            "jest.config.ts",
            "vitest.config.ts",
            "hardhat.config.ts",
            "foundry.toml",
        ],
        Layer::Config => &[],
    }
}

fn canonical_root(root: &Path) -> PathBuf {
    root.canonicalize().unwrap_or_else(|_| root.to_path_buf())
}

/// Canonicalise `path`, falling back to its parent for files that no
/// longer exist.
fn canonicalize_lenient(path: &Path) -> Option<PathBuf> {
    if let Ok(canonical) = path.canonicalize() {
        return Some(canonical);
    }
    let parent = path.parent()?.canonicalize().ok()?;
    Some(parent.join(path.file_name()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::graph::{BrokenReason, DependencyRelationship};
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn service(root: &Path) -> ProjectGraphService {
        ProjectGraphService::with_store(root, AnalysisConfig::default(), Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_analyze_caches_until_forced() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/a.ts", "import { b } from './b';");
        write(temp.path(), "src/b.ts", "export const b = 1;");

        let svc = service(temp.path());
        let first = svc.analyze(false);
        assert!(!first.cached);
        assert_eq!(
            first.analysis.relationships,
            vec![DependencyRelationship::import("src/a.ts", "src/b.ts")]
        );

        let second = svc.analyze(false);
        assert!(second.cached);
        assert_eq!(second.analysis, first.analysis);

        assert!(!svc.analyze(true).cached);
    }

    #[test]
    fn test_stale_cache_is_rebuilt() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.ts", "");

        let config = AnalysisConfig {
            max_age_secs: 0,
            ..AnalysisConfig::default()
        };
        let svc = ProjectGraphService::with_store(temp.path(), config, Arc::new(MemoryStore::new()));
        svc.analyze(false);
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert!(!svc.analyze(false).cached);
    }

    #[test]
    fn test_written_file_is_patched_and_recent() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.ts", "");
        write(temp.path(), "b.ts", "");

        let mut svc = service(temp.path());
        svc.analyze(false);
        assert!(svc.analyze(false).analysis.relationships.is_empty());

        write(temp.path(), "a.ts", "import './b';");
        svc.on_file_written(temp.path().join("a.ts"));

        let analysis = svc.analyze(false).analysis;
        assert_eq!(
            analysis.relationships,
            vec![DependencyRelationship::import("a.ts", "b.ts")]
        );
        assert_eq!(svc.context_state().recent_files, vec!["a.ts"]);
    }

    #[test]
    fn test_written_target_drops_stale_importer_edge() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.ts", "import './b';");
        write(temp.path(), "b.ts", "");

        let mut svc = service(temp.path());
        assert_eq!(
            svc.analyze(false).analysis.relationships,
            vec![DependencyRelationship::import("a.ts", "b.ts")]
        );

        // The importer changes but only the target is reported as written.
        write(temp.path(), "a.ts", "");
        svc.on_file_written(temp.path().join("b.ts"));

        assert!(svc.analyze(false).analysis.relationships.is_empty());
        assert!(svc.dependents("b.ts").is_empty());
    }

    #[test]
    fn test_deleted_target_is_reported_and_not_related() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.ts", "import { b } from './b';");
        write(temp.path(), "b.ts", "export const b = 1;");

        let mut svc = service(temp.path());
        svc.analyze(false);
        assert!(svc.validate().is_empty());

        fs::remove_file(temp.path().join("b.ts")).unwrap();
        let findings = svc.validate();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].reason, BrokenReason::ImportNotFound);

        svc.on_file_deleted("b.ts");
        assert!(svc.related(&["a.ts"], 10).is_empty());
        assert!(svc.validate().is_empty());
    }

    #[test]
    fn test_dependents_through_service() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.ts", "import './b';");
        write(temp.path(), "b.ts", "import './c';");
        write(temp.path(), "c.ts", "");

        let svc = service(temp.path());
        svc.analyze(false);
        assert_eq!(svc.dependents("c.ts"), vec!["a.ts", "b.ts"]);
        assert_eq!(svc.dependents(temp.path().join("c.ts")), vec!["a.ts", "b.ts"]);
    }

    #[test]
    fn test_auto_load_includes_layer_configs() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "hardhat.config.ts", "export default {};");
        write(temp.path(), "foundry.toml", "");
        write(temp.path(), "Anchor.toml", "");
        write(temp.path(), "contracts/Token.sol", "pragma solidity ^0.8.0;");
        write(temp.path(), "test/Token.test.ts", "");

        let mut svc = service(temp.path());
        svc.analyze(false);
        svc.set_focus(&["contracts/Token.sol"]);

        let files = svc.get_files_to_auto_load();
        assert_eq!(files[0], "contracts/Token.sol");
        assert!(files.contains(&"test/Token.test.ts".to_string()));
        assert!(files.contains(&"hardhat.config.ts".to_string()));
        assert!(files.contains(&"foundry.toml".to_string()));
        assert!(!files.contains(&"Anchor.toml".to_string()));
    }

    #[test]
    fn test_auto_load_skips_missing_focus() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.ts", "");

        let mut svc = service(temp.path());
        svc.analyze(false);
        svc.set_focus(&["a.ts", "gone.ts"]);
        assert_eq!(svc.get_files_to_auto_load(), vec!["a.ts"]);
    }

    #[test]
    fn test_validate_without_cache_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(service(temp.path()).validate().is_empty());
    }

    #[test]
    fn test_open_persists_to_layermap_dir() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.ts", "");

        let svc = ProjectGraphService::open(temp.path()).unwrap();
        svc.analyze(false);
        assert!(temp
            .path()
            .join(".layermap/cache/project-analysis.json")
            .exists());

        let reopened = ProjectGraphService::open(temp.path()).unwrap();
        assert!(reopened.analyze(false).cached);
    }
}
