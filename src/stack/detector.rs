//! Technology stack detection.
//!
//! Every field of [`ProjectStack`] is decided by an independent check. A check
//! walks its markers in a fixed priority order: explicit config file, then a
//! dependency-manifest entry, then a directory-pattern heuristic. The first
//! hit wins; no hit (or an unreadable manifest) leaves the field empty.
//!
//! # Example
//!
//! ```rust,ignore
//! use layermap::stack::StackDetector;
//!
//! let stack = StackDetector::new("/path/to/project").detect();
//! if let Some(fw) = stack.contract_framework {
//!     println!("Contracts built with {}", fw);
//! }
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::kinds::{BackendFramework, ContractFramework, FrontendFramework, Language, PackageManager};
use super::ProjectStack;
use crate::config::default_ignore_dirs;

/// Manifest file names counted for monorepo detection.
const MANIFEST_FILES: &[&str] = &["package.json", "Cargo.toml", "pyproject.toml", "go.mod"];

/// Subdirectories searched for backend manifests in addition to the root.
const BACKEND_DIRS: &[&str] = &["", "backend", "server", "api"];

/// Subdirectories searched for frontend manifests in addition to the root.
const FRONTEND_DIRS: &[&str] = &["", "frontend", "web", "app", "client"];

/// Detects the technology stack of a project directory.
pub struct StackDetector {
    project_dir: PathBuf,
}

/// Everything learned from one walk of the tree.
#[derive(Default)]
struct TreeSurvey {
    language_counts: HashMap<Language, usize>,
    manifest_count: usize,
    has_solidity_in_contracts_dir: bool,
}

impl StackDetector {
    /// Create a new stack detector for the given project directory.
    pub fn new<P: AsRef<Path>>(project_dir: P) -> Self {
        Self {
            project_dir: project_dir.as_ref().to_path_buf(),
        }
    }

    /// Run every check and assemble the stack snapshot.
    pub fn detect(&self) -> ProjectStack {
        let survey = self.survey();

        let stack = ProjectStack {
            contract_framework: self.detect_contract_framework(&survey),
            backend_framework: self.detect_backend_framework(),
            frontend_framework: self.detect_frontend_framework(),
            language: Self::pick_language(&survey.language_counts),
            package_manager: self.detect_package_manager(),
            monorepo: self.detect_monorepo(&survey),
        };

        debug!(?stack, "Detected project stack");
        stack
    }

    fn survey(&self) -> TreeSurvey {
        let ignore = default_ignore_dirs();
        let mut survey = TreeSurvey::default();

        for entry in WalkDir::new(&self.project_dir)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e
                        .file_name()
                        .to_str()
                        .is_some_and(|name| ignore.contains(name))
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy();

            if MANIFEST_FILES.contains(&name.as_ref()) {
                survey.manifest_count += 1;
            }

            if let Some(lang) = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(Language::from_extension)
            {
                *survey.language_counts.entry(lang).or_default() += 1;

                if lang == Language::Solidity
                    && path
                        .strip_prefix(&self.project_dir)
                        .map(|rel| rel.starts_with("contracts"))
                        .unwrap_or(false)
                {
                    survey.has_solidity_in_contracts_dir = true;
                }
            }
        }

        survey
    }

    fn detect_contract_framework(&self, survey: &TreeSurvey) -> Option<ContractFramework> {
        // Explicit config files
        if self.any_exists(&[
            "hardhat.config.js",
            "hardhat.config.ts",
            "hardhat.config.cjs",
            "hardhat.config.mjs",
        ]) {
            return Some(ContractFramework::Hardhat);
        }
        if self.exists("foundry.toml") {
            return Some(ContractFramework::Foundry);
        }
        if self.any_exists(&["truffle-config.js", "truffle.js"]) {
            return Some(ContractFramework::Truffle);
        }
        if self.exists("Anchor.toml") {
            return Some(ContractFramework::Anchor);
        }
        if self.any_exists(&["brownie-config.yaml", "brownie-config.yml"]) {
            return Some(ContractFramework::Brownie);
        }

        // Manifest entries
        let node_deps = self.node_dependencies("");
        if node_deps.contains("hardhat") {
            return Some(ContractFramework::Hardhat);
        }
        if node_deps.contains("truffle") {
            return Some(ContractFramework::Truffle);
        }
        if self.cargo_dependencies("").contains("anchor-lang") {
            return Some(ContractFramework::Anchor);
        }

        // Directory heuristics
        if self.project_dir.join("lib/forge-std").is_dir() {
            return Some(ContractFramework::Foundry);
        }
        if self.project_dir.join("programs").is_dir() {
            return Some(ContractFramework::Anchor);
        }
        if survey.has_solidity_in_contracts_dir {
            return Some(ContractFramework::Hardhat);
        }

        None
    }

    fn detect_backend_framework(&self) -> Option<BackendFramework> {
        if BACKEND_DIRS
            .iter()
            .any(|dir| self.exists(&Self::in_dir(dir, "nest-cli.json")))
        {
            return Some(BackendFramework::NestJs);
        }
        if BACKEND_DIRS
            .iter()
            .any(|dir| self.exists(&Self::in_dir(dir, "manage.py")))
        {
            return Some(BackendFramework::Django);
        }

        for dir in BACKEND_DIRS {
            let node_deps = self.node_dependencies(dir);
            for (dep, fw) in [
                ("@nestjs/core", BackendFramework::NestJs),
                ("express", BackendFramework::Express),
                ("fastify", BackendFramework::Fastify),
                ("koa", BackendFramework::Koa),
            ] {
                if node_deps.contains(dep) {
                    return Some(fw);
                }
            }

            let python = self.python_manifest_text(dir);
            for (dep, fw) in [
                ("fastapi", BackendFramework::FastApi),
                ("django", BackendFramework::Django),
                ("flask", BackendFramework::Flask),
            ] {
                if python.contains(dep) {
                    return Some(fw);
                }
            }

            let cargo_deps = self.cargo_dependencies(dir);
            if cargo_deps.contains("axum") {
                return Some(BackendFramework::Axum);
            }
            if cargo_deps.contains("actix-web") {
                return Some(BackendFramework::Actix);
            }
        }

        None
    }

    fn detect_frontend_framework(&self) -> Option<FrontendFramework> {
        let configs: [(&[&str], FrontendFramework); 5] = [
            (
                &["next.config.js", "next.config.mjs", "next.config.ts"],
                FrontendFramework::Next,
            ),
            (
                &["nuxt.config.js", "nuxt.config.ts"],
                FrontendFramework::Nuxt,
            ),
            (&["svelte.config.js"], FrontendFramework::SvelteKit),
            (&["angular.json"], FrontendFramework::Angular),
            (&["remix.config.js"], FrontendFramework::Remix),
        ];

        for (files, fw) in configs {
            let found = FRONTEND_DIRS.iter().any(|dir| {
                files
                    .iter()
                    .any(|file| self.exists(&Self::in_dir(dir, file)))
            });
            if found {
                return Some(fw);
            }
        }

        for dir in FRONTEND_DIRS {
            let deps = self.node_dependencies(dir);
            for (dep, fw) in [
                ("next", FrontendFramework::Next),
                ("nuxt", FrontendFramework::Nuxt),
                ("@sveltejs/kit", FrontendFramework::SvelteKit),
                ("@angular/core", FrontendFramework::Angular),
                ("@remix-run/react", FrontendFramework::Remix),
                ("vue", FrontendFramework::Vue),
                ("svelte", FrontendFramework::Svelte),
                ("react", FrontendFramework::React),
            ] {
                if deps.contains(dep) {
                    return Some(fw);
                }
            }
        }

        None
    }

    /// Largest count wins; ties go to the earliest member of [`Language::all`].
    fn pick_language(counts: &HashMap<Language, usize>) -> Option<Language> {
        let max = counts.values().copied().max().filter(|&m| m > 0)?;
        Language::all()
            .iter()
            .copied()
            .find(|lang| counts.get(lang).copied() == Some(max))
    }

    fn detect_package_manager(&self) -> Option<PackageManager> {
        for (lockfile, pm) in [
            ("pnpm-lock.yaml", PackageManager::Pnpm),
            ("yarn.lock", PackageManager::Yarn),
            ("bun.lockb", PackageManager::Bun),
            ("bun.lock", PackageManager::Bun),
            ("package-lock.json", PackageManager::Npm),
            ("Cargo.lock", PackageManager::Cargo),
            ("poetry.lock", PackageManager::Poetry),
        ] {
            if self.exists(lockfile) {
                return Some(pm);
            }
        }

        if let Some(declared) = self
            .read_package_json("")
            .as_ref()
            .and_then(|pkg| pkg.get("packageManager"))
            .and_then(|v| v.as_str())
        {
            let name = declared.split('@').next().unwrap_or(declared);
            if let Some(pm) = PackageManager::all()
                .iter()
                .copied()
                .find(|pm| pm.as_str() == name)
            {
                return Some(pm);
            }
        }

        if self.exists("package.json") {
            return Some(PackageManager::Npm);
        }
        if self.exists("Cargo.toml") {
            return Some(PackageManager::Cargo);
        }
        if self.any_exists(&["requirements.txt", "pyproject.toml"]) {
            return Some(PackageManager::Pip);
        }

        None
    }

    fn detect_monorepo(&self, survey: &TreeSurvey) -> bool {
        if self.any_exists(&["pnpm-workspace.yaml", "lerna.json", "nx.json", "turbo.json"]) {
            return true;
        }

        let npm_workspaces = self
            .read_package_json("")
            .is_some_and(|pkg| pkg.get("workspaces").is_some());
        if npm_workspaces {
            return true;
        }

        let cargo_workspace = self
            .read_cargo_toml("")
            .is_some_and(|manifest| manifest.get("workspace").is_some());
        if cargo_workspace {
            return true;
        }

        survey.manifest_count > 1
    }

    // =========================================================================
    // Manifest readers - every failure degrades to "nothing found"
    // =========================================================================

    fn read_package_json(&self, dir: &str) -> Option<serde_json::Value> {
        let path = self.project_dir.join(Self::in_dir(dir, "package.json"));
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Ignoring malformed {}: {}", path.display(), e);
                None
            }
        }
    }

    fn read_cargo_toml(&self, dir: &str) -> Option<toml::Value> {
        let path = self.project_dir.join(Self::in_dir(dir, "Cargo.toml"));
        let content = std::fs::read_to_string(&path).ok()?;
        match toml::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Ignoring malformed {}: {}", path.display(), e);
                None
            }
        }
    }

    fn node_dependencies(&self, dir: &str) -> BTreeSet<String> {
        let Some(pkg) = self.read_package_json(dir) else {
            return BTreeSet::new();
        };

        ["dependencies", "devDependencies", "peerDependencies"]
            .iter()
            .filter_map(|section| pkg.get(section).and_then(|v| v.as_object()))
            .flat_map(|deps| deps.keys().cloned())
            .collect()
    }

    fn cargo_dependencies(&self, dir: &str) -> BTreeSet<String> {
        let Some(manifest) = self.read_cargo_toml(dir) else {
            return BTreeSet::new();
        };

        let mut deps = BTreeSet::new();
        for section in ["dependencies", "dev-dependencies"] {
            if let Some(table) = manifest.get(section).and_then(|v| v.as_table()) {
                deps.extend(table.keys().cloned());
            }
        }
        if let Some(table) = manifest
            .get("workspace")
            .and_then(|w| w.get("dependencies"))
            .and_then(|v| v.as_table())
        {
            deps.extend(table.keys().cloned());
        }
        deps
    }

    /// Lowercased text of the Python manifests in `dir`, concatenated.
    fn python_manifest_text(&self, dir: &str) -> String {
        ["requirements.txt", "pyproject.toml"]
            .iter()
            .filter_map(|file| {
                std::fs::read_to_string(self.project_dir.join(Self::in_dir(dir, file))).ok()
            })
            .collect::<Vec<_>>()
            .join("\n")
            .to_lowercase()
    }

    fn in_dir(dir: &str, file: &str) -> String {
        if dir.is_empty() {
            file.to_string()
        } else {
            format!("{}/{}", dir, file)
        }
    }

    fn exists(&self, rel: &str) -> bool {
        self.project_dir.join(rel).exists()
    }

    fn any_exists(&self, rels: &[&str]) -> bool {
        rels.iter().any(|rel| self.exists(rel))
    }
}
