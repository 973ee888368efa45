//! Structure mapping with ordered glob rules.
//!
//! Category rule sets run in the fixed order contracts, backend, frontend,
//! tests, config, scripts. Patterns inside one set are unioned; across sets
//! the first category to match a file keeps it. Whatever is left over and
//! carries a common source extension lands in `other`.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::{debug, warn};

use super::{Category, ProjectStructure};
use crate::config::{default_ignore_dirs, default_ignore_files, extensions, AnalysisConfig};
use crate::paths;

const CONTRACT_PATTERNS: &[&str] = &[
    "contracts/**/*.{sol,vy,rs,move,cairo}",
    "**/contracts/**/*.{sol,vy}",
    "src/**/*.sol",
    "programs/**/*.rs",
    "sources/**/*.move",
];

const BACKEND_PATTERNS: &[&str] = &[
    "**/{backend,server,api}/**/*.{ts,js,mjs,cjs,py,rs,go}",
    "services/**/*.{ts,js,mjs,cjs,py,rs,go}",
    "**/*.controller.ts",
];

const FRONTEND_PATTERNS: &[&str] = &[
    "**/{frontend,web,client}/**/*.{ts,tsx,js,jsx,vue,svelte,css,scss,html}",
    "{app,pages,components}/**/*.{ts,tsx,js,jsx,vue,svelte,css,scss}",
    "src/{app,pages,components,hooks}/**/*.{ts,tsx,js,jsx,vue,svelte,css,scss}",
    "**/*.{tsx,jsx,vue,svelte}",
];

const TEST_PATTERNS: &[&str] = &[
    "**/{test,tests,__tests__}/**/*",
    "**/*.{test,spec}.*",
    "**/*.t.sol",
    "**/test_*.py",
    "**/*_test.{go,py}",
];

const CONFIG_PATTERNS: &[&str] = &[
    "**/*.config.{js,ts,mjs,cjs}",
    "**/tsconfig*.json",
    "**/package.json",
    "**/*.toml",
    "**/*.{yaml,yml}",
    "**/.env.example",
    "**/.eslintrc*",
    "**/.prettierrc*",
    "**/remappings.txt",
    "**/{angular,nest-cli}.json",
];

const SCRIPT_PATTERNS: &[&str] = &[
    "{scripts,script,deploy,tasks,migrations}/**/*.{ts,js,mjs,cjs,sh,py,sol}",
    "**/*.s.sol",
    "**/*.sh",
];

/// Maps a project tree onto [`ProjectStructure`].
pub struct StructureMapper {
    project_dir: PathBuf,
    respect_gitignore: bool,
    ignore_rules: Vec<String>,
}

impl StructureMapper {
    /// Create a mapper using the given configuration's ignore settings.
    pub fn new<P: AsRef<Path>>(project_dir: P, config: &AnalysisConfig) -> Self {
        Self {
            project_dir: project_dir.as_ref().to_path_buf(),
            respect_gitignore: config.respect_gitignore,
            ignore_rules: config.ignore.clone(),
        }
    }

    /// Glob patterns for a category, in match order.
    pub fn patterns(category: Category) -> &'static [&'static str] {
        match category {
            Category::Contracts => CONTRACT_PATTERNS,
            Category::Backend => BACKEND_PATTERNS,
            Category::Frontend => FRONTEND_PATTERNS,
            Category::Tests => TEST_PATTERNS,
            Category::Config => CONFIG_PATTERNS,
            Category::Scripts => SCRIPT_PATTERNS,
            Category::Other => &[],
        }
    }

    /// Walk the tree and classify every file.
    ///
    /// Unreadable directories are skipped; the result is always complete for
    /// what could be read.
    pub fn map(&self) -> ProjectStructure {
        let files = self.collect_files();
        let mut structure = ProjectStructure::default();

        for &category in Category::all() {
            if category == Category::Other {
                continue;
            }
            let rules = build_set(Self::patterns(category));
            for file in &files {
                if rules.is_match(file) {
                    structure.claim(category, file.clone());
                }
            }
        }

        for file in &files {
            if extensions::has_extension(file, extensions::SOURCE) {
                structure.claim(Category::Other, file.clone());
            }
        }

        debug!(
            "Mapped {} of {} files under {}",
            structure.total_files(),
            files.len(),
            self.project_dir.display()
        );
        structure
    }

    /// All non-ignored files as sorted repo-relative paths.
    fn collect_files(&self) -> Vec<String> {
        let ignore_dirs = default_ignore_dirs();
        let ignore_files = default_ignore_files();
        let user_rules = build_set(
            &self
                .ignore_rules
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>(),
        );

        let walker = WalkBuilder::new(&self.project_dir)
            .hidden(false)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .git_global(false)
            .require_git(false)
            .filter_entry(move |entry| {
                let name = entry.file_name().to_string_lossy();
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                if entry.depth() == 0 {
                    return true;
                }
                if is_dir {
                    !ignore_dirs.contains(name.as_ref())
                } else {
                    !ignore_files.contains(name.as_ref())
                }
            })
            .build();

        let mut files: Vec<String> = walker
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(err) => {
                    debug!("Skipping unreadable entry: {}", err);
                    None
                }
            })
            .filter(|e| e.file_type().is_some_and(|t| t.is_file()))
            .map(|e| paths::to_relative(&self.project_dir, e.path()))
            .filter(|rel| !rel.is_empty() && !user_rules.is_match(rel))
            .collect();

        files.sort();
        files
    }
}

/// Compile patterns into a set; patterns that fail to compile are skipped.
fn build_set(patterns: &[&str]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match GlobBuilder::new(pattern).literal_separator(true).build() {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => warn!("Skipping invalid glob '{}': {}", pattern, e),
        }
    }
    builder.build().unwrap_or_else(|e| {
        warn!("Failed to build glob set: {}", e);
        GlobSet::empty()
    })
}
