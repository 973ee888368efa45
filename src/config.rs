//! Configuration management for layermap.
//!
//! Settings are read from `.layermap/settings.json` in the project root.
//! Every field is optional; a missing file yields [`AnalysisConfig::default`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::Glob;
use serde::{Deserialize, Serialize};

use crate::error::{LayermapError, Result};

/// Name of the tool-private directory inside a project.
pub const LAYERMAP_DIR: &str = ".layermap";

/// Default directories to ignore when walking a project.
///
/// Covers build output, dependency directories, version control and
/// tool-private directories.
pub fn default_ignore_dirs() -> HashSet<&'static str> {
    [
        "node_modules",
        ".next",
        ".nuxt",
        ".svelte-kit",
        "target",
        ".venv",
        "venv",
        "__pycache__",
        "dist",
        "build",
        "out",
        "artifacts",
        "cache",
        "typechain",
        "typechain-types",
        "coverage",
        ".git",
        ".hg",
        ".svn",
        ".turbo",
        ".vercel",
        ".cache",
        ".idea",
        ".vscode",
        ".anchor",
        ".claude",
        LAYERMAP_DIR,
    ]
    .into_iter()
    .collect()
}

/// Default files to ignore when walking a project.
pub fn default_ignore_files() -> HashSet<&'static str> {
    [
        "package-lock.json",
        "pnpm-lock.yaml",
        "yarn.lock",
        "bun.lockb",
        "Cargo.lock",
        "poetry.lock",
        ".DS_Store",
        "thumbs.db",
    ]
    .into_iter()
    .collect()
}

/// File extension tables.
pub mod extensions {
    /// Extensions that make a file part of the tracked source universe.
    pub const SOURCE: &[&str] = &[
        "ts", "tsx", "js", "jsx", "mjs", "cjs", "vue", "svelte", "sol", "vy", "rs", "py", "go",
        "move", "cairo", "json", "toml", "yaml", "yml", "sh", "css", "scss", "html",
    ];

    /// Extensions whose content is scanned for import statements.
    pub const SCANNABLE: &[&str] = &[
        "ts", "tsx", "js", "jsx", "mjs", "cjs", "vue", "svelte", "sol",
    ];

    /// Suffixes tried, in order, when resolving an extensionless import.
    pub const IMPORT_CANDIDATES: &[&str] = &[
        ".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".sol", ".json",
    ];

    /// Check whether a path ends in one of the given extensions.
    pub fn has_extension(path: &str, table: &[&str]) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => table.contains(&ext),
            _ => false,
        }
    }
}

/// Analysis configuration loaded from `.layermap/settings.json`.
///
/// # Example settings.json
///
/// ```json
/// {
///   "maxAgeSecs": 600,
///   "importScanLimit": null,
///   "ignore": ["legacy/**"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Staleness window for the cached analysis, in seconds.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,

    /// Maximum number of files scanned for imports during a full rebuild.
    ///
    /// `None` scans every file.
    #[serde(default = "default_import_scan_limit")]
    pub import_scan_limit: Option<usize>,

    /// Maximum `file -> tsconfig.json` edges recorded per tsconfig.
    #[serde(default = "default_tsconfig_edge_cap")]
    pub tsconfig_edge_cap: usize,

    /// Length of the most-recently-used file list.
    #[serde(default = "default_recent_files_limit")]
    pub recent_files_limit: usize,

    /// Sibling files contributed per focus file to the related set.
    #[serde(default = "default_sibling_limit")]
    pub sibling_limit: usize,

    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    /// Extra glob patterns excluded from the structure map.
    #[serde(default)]
    pub ignore: Vec<String>,
}

fn default_max_age_secs() -> u64 {
    300
}

fn default_import_scan_limit() -> Option<usize> {
    Some(100)
}

fn default_tsconfig_edge_cap() -> usize {
    20
}

fn default_recent_files_limit() -> usize {
    20
}

fn default_sibling_limit() -> usize {
    3
}

fn default_true() -> bool {
    true
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age_secs(),
            import_scan_limit: default_import_scan_limit(),
            tsconfig_edge_cap: default_tsconfig_edge_cap(),
            recent_files_limit: default_recent_files_limit(),
            sibling_limit: default_sibling_limit(),
            respect_gitignore: true,
            ignore: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a project directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but cannot be read,
    /// parsed, or fails validation.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let settings_path = Self::settings_path(project_dir);

        if !settings_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&settings_path)
            .map_err(|e| LayermapError::io(&settings_path, e))?;
        let config: AnalysisConfig = serde_json::from_str(&content).map_err(|e| {
            LayermapError::config_with_path(e.to_string(), settings_path.clone())
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Get the settings.json path for a project
    pub fn settings_path(project_dir: &Path) -> PathBuf {
        project_dir.join(LAYERMAP_DIR).join("settings.json")
    }

    /// Get the cache directory for a project
    pub fn cache_dir(project_dir: &Path) -> PathBuf {
        project_dir.join(LAYERMAP_DIR).join("cache")
    }

    /// Staleness window as a [`Duration`].
    #[must_use]
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    /// Validates limits and ignore patterns.
    ///
    /// # Errors
    ///
    /// Returns [`LayermapError::InvalidConfig`] for zero limits and
    /// [`LayermapError::Glob`] for patterns that do not compile.
    pub fn validate(&self) -> Result<()> {
        if self.import_scan_limit == Some(0) {
            return Err(LayermapError::invalid_config(
                "importScanLimit",
                "must be greater than zero (use null for no limit)",
            ));
        }
        let limits = [
            ("recentFilesLimit", self.recent_files_limit),
            ("tsconfigEdgeCap", self.tsconfig_edge_cap),
            ("siblingLimit", self.sibling_limit),
        ];
        if let Some((field, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(LayermapError::invalid_config(*field, "must be greater than zero"));
        }
        for pattern in &self.ignore {
            Glob::new(pattern).map_err(|source| LayermapError::Glob {
                pattern: pattern.clone(),
                source,
            })?;
        }
        Ok(())
    }
}
