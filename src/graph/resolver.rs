//! Relationship resolution from textual heuristics.
//!
//! Four edge families are produced:
//!
//! - `import` - module specifiers found by an [`ImportScanner`], resolved
//!   against the known-file universe; a relative specifier matching no
//!   known file still yields an edge to its normalised path so that
//!   validation can report it
//! - `test` - a test whose normalised name contains a contract's name
//! - `config` (script) - a script whose content mentions a contract
//! - `config` (tsconfig) - backend/frontend files under a `tsconfig.json`
//!
//! Reading a file can fail; such a file contributes no edges and resolution
//! carries on.
//!
//! # Known limitation
//!
//! A full rebuild scans at most `import_scan_limit` files for imports (100
//! by default). Files past the bound are not scanned, so the import graph is
//! an under-approximation on large trees. [`Resolution::unscanned`] reports
//! how many files were skipped.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::{import_candidates, is_package_specifier, DependencyRelationship, RelationType};
use crate::config::{extensions, AnalysisConfig};
use crate::paths;
use crate::structure::ProjectStructure;

/// Static `import`, dynamic `import()`/`require()` and `export ... from`.
static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:\bimport\s+(?:[\w*{}\s,$]+?\s+from\s+)?|\bimport\s*\(\s*|\brequire\s*\(\s*|\bexport\s+[\w*{}\s,$]+?\s+from\s+)["']([^"'\n]+)["']"#,
    )
    .expect("import pattern is valid")
});

/// Extracts raw module specifiers from file content.
///
/// Swapping in a parser-backed scanner changes nothing for callers of
/// [`RelationshipResolver`].
pub trait ImportScanner: Send + Sync {
    /// Module specifiers in source order, duplicates included.
    fn scan(&self, content: &str) -> Vec<String>;
}

/// Regex-based scanner covering ES modules, CommonJS and Solidity imports.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextualImportScanner;

impl ImportScanner for TextualImportScanner {
    fn scan(&self, content: &str) -> Vec<String> {
        IMPORT_RE
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// Output of a full rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub relationships: Vec<DependencyRelationship>,
    /// Files whose imports were scanned.
    pub scanned: usize,
    /// Scannable files left out by the scan bound.
    pub unscanned: usize,
}

/// Where an import specifier points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// A known project file.
    File(String),
    /// A bare package name; never a real file.
    Package(String),
    /// A relative or root-absolute path matching no known file.
    Unresolved(String),
}

/// Builds dependency edges for a mapped project.
pub struct RelationshipResolver {
    project_dir: PathBuf,
    scanner: Box<dyn ImportScanner>,
    import_scan_limit: Option<usize>,
    tsconfig_edge_cap: usize,
}

impl RelationshipResolver {
    /// Create a resolver with the textual scanner.
    pub fn new<P: AsRef<Path>>(project_dir: P, config: &AnalysisConfig) -> Self {
        Self::with_scanner(project_dir, config, Box::new(TextualImportScanner))
    }

    /// Create a resolver with a custom import scanner.
    pub fn with_scanner<P: AsRef<Path>>(
        project_dir: P,
        config: &AnalysisConfig,
        scanner: Box<dyn ImportScanner>,
    ) -> Self {
        Self {
            project_dir: project_dir.as_ref().to_path_buf(),
            scanner,
            import_scan_limit: config.import_scan_limit,
            tsconfig_edge_cap: config.tsconfig_edge_cap,
        }
    }

    /// Rebuild every edge for the project.
    pub fn resolve_all(&self, structure: &ProjectStructure) -> Resolution {
        let scannable: Vec<&String> = structure
            .all_files()
            .filter(|f| extensions::has_extension(f, extensions::SCANNABLE))
            .collect();

        let limit = self.import_scan_limit.unwrap_or(usize::MAX);
        let scanned = scannable.len().min(limit);
        let unscanned = scannable.len() - scanned;
        if unscanned > 0 {
            warn!(
                "Import scan limited to {} files; {} files were not scanned and their imports are missing from the graph",
                scanned, unscanned
            );
        }

        let mut relationships = Vec::new();

        for file in scannable.into_iter().take(limit) {
            if let Some(content) = self.read(file) {
                relationships.extend(self.import_edges(file, &content, structure));
            }
        }

        for test in &structure.tests {
            relationships.extend(test_edges(test, &structure.contracts));
        }

        for script in &structure.scripts {
            if let Some(content) = self.read(script) {
                relationships.extend(script_edges(script, &content, &structure.contracts));
            }
        }

        for config in structure
            .config
            .iter()
            .filter(|c| paths::file_name(c) == "tsconfig.json")
        {
            relationships.extend(tsconfig_edges(config, structure, self.tsconfig_edge_cap));
        }

        debug!(
            "Resolved {} relationships from {} scanned files",
            relationships.len(),
            scanned
        );

        Resolution {
            relationships,
            scanned,
            unscanned,
        }
    }

    /// Every edge involving `path`, given its current content.
    ///
    /// Outgoing imports come from `content`. Test, script and tsconfig
    /// edges are produced in both directions. Incoming imports are not: they
    /// depend on the importer's content, not on this file's.
    pub fn resolve_file(
        &self,
        path: &str,
        content: &str,
        structure: &ProjectStructure,
    ) -> Vec<DependencyRelationship> {
        let mut relationships = Vec::new();

        if extensions::has_extension(path, extensions::SCANNABLE) {
            relationships.extend(self.import_edges(path, content, structure));
        }

        if structure.tests.contains(path) {
            relationships.extend(test_edges(path, &structure.contracts));
        }

        if structure.contracts.contains(path) {
            for test in &structure.tests {
                if test_matches(test, path) {
                    relationships.push(DependencyRelationship::new(
                        test.clone(),
                        path,
                        RelationType::Test,
                    ));
                }
            }
            for script in &structure.scripts {
                if let Some(script_content) = self.read(script) {
                    if script_mentions(&script_content, path) {
                        relationships.push(DependencyRelationship::new(
                            script.clone(),
                            path,
                            RelationType::Config,
                        ));
                    }
                }
            }
        }

        if structure.scripts.contains(path) {
            relationships.extend(script_edges(path, content, &structure.contracts));
        }

        if structure.backend.contains(path) || structure.frontend.contains(path) {
            for config in structure
                .config
                .iter()
                .filter(|c| paths::file_name(c) == "tsconfig.json")
            {
                relationships.extend(
                    tsconfig_edges(config, structure, self.tsconfig_edge_cap)
                        .into_iter()
                        .filter(|rel| rel.from == path),
                );
            }
        }

        if structure.config.contains(path) && paths::file_name(path) == "tsconfig.json" {
            relationships.extend(tsconfig_edges(path, structure, self.tsconfig_edge_cap));
        }

        relationships
    }

    /// `import` edges for one file's content.
    pub fn import_edges(
        &self,
        file: &str,
        content: &str,
        structure: &ProjectStructure,
    ) -> Vec<DependencyRelationship> {
        self.scanner
            .scan(content)
            .iter()
            .filter_map(|spec| resolve_import(file, spec, structure))
            .map(|target| match target {
                ImportTarget::File(to)
                | ImportTarget::Package(to)
                | ImportTarget::Unresolved(to) => DependencyRelationship::import(file, to),
            })
            .collect()
    }

    fn read(&self, rel: &str) -> Option<String> {
        match std::fs::read_to_string(self.project_dir.join(rel)) {
            Ok(content) => Some(content),
            Err(e) => {
                debug!("Skipping unreadable file {}: {}", rel, e);
                None
            }
        }
    }
}

/// Resolve one specifier written in `importer`.
///
/// Returns `None` for dependency-directory paths, `@types/` packages and
/// scoped or dotted package paths. A path specifier whose candidates all
/// miss comes back as [`ImportTarget::Unresolved`] with the normalised base,
/// written `./name` when it sits at the root and has no extension.
pub fn resolve_import(
    importer: &str,
    spec: &str,
    structure: &ProjectStructure,
) -> Option<ImportTarget> {
    if spec.contains("node_modules") || spec.starts_with("@types/") {
        return None;
    }

    let base = if spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../")
    {
        paths::join(paths::parent_dir(importer), spec)
    } else if spec.starts_with('/') {
        paths::normalize(spec)
    } else if is_package_specifier(spec) {
        return Some(ImportTarget::Package(spec.to_string()));
    } else {
        return None;
    };

    // Empty or root-escaping paths can never name a project file.
    if base.is_empty() || base == ".." || base.starts_with("../") {
        return None;
    }

    let target = match import_candidates(&base)
        .into_iter()
        .find(|candidate| structure.contains(candidate))
    {
        Some(file) => ImportTarget::File(file),
        // Keep a root-level miss from reading as a package name.
        None if is_package_specifier(&base) => ImportTarget::Unresolved(format!("./{}", base)),
        None => ImportTarget::Unresolved(base),
    };
    Some(target)
}

/// Lowercase alphanumeric stem of a file name.
///
/// With `strip_test_suffix`, a trailing `.test`/`.spec` before the
/// extension is removed first.
pub fn normalized_name(path: &str, strip_test_suffix: bool) -> String {
    let name = paths::file_name(path);
    let mut stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);
    if strip_test_suffix {
        stem = stem
            .strip_suffix(".test")
            .or_else(|| stem.strip_suffix(".spec"))
            .unwrap_or(stem);
    }
    stem.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn test_matches(test: &str, contract: &str) -> bool {
    let contract_name = normalized_name(contract, false);
    !contract_name.is_empty() && normalized_name(test, true).contains(&contract_name)
}

fn test_edges<'a>(
    test: &str,
    contracts: impl IntoIterator<Item = &'a String>,
) -> Vec<DependencyRelationship> {
    contracts
        .into_iter()
        .filter(|contract| test_matches(test, contract))
        .map(|contract| DependencyRelationship::new(test, contract.clone(), RelationType::Test))
        .collect()
}

fn script_mentions(content: &str, contract: &str) -> bool {
    let name = normalized_name(contract, false);
    (!name.is_empty() && content.to_lowercase().contains(&name)) || content.contains(contract)
}

fn script_edges<'a>(
    script: &str,
    content: &str,
    contracts: impl IntoIterator<Item = &'a String>,
) -> Vec<DependencyRelationship> {
    contracts
        .into_iter()
        .filter(|contract| script_mentions(content, contract))
        .map(|contract| DependencyRelationship::new(script, contract.clone(), RelationType::Config))
        .collect()
}

/// `file -> tsconfig` edges for backend/frontend files at or below the
/// config's directory, at most `cap` of them.
fn tsconfig_edges(
    config: &str,
    structure: &ProjectStructure,
    cap: usize,
) -> Vec<DependencyRelationship> {
    let dir = paths::parent_dir(config);
    structure
        .backend
        .iter()
        .chain(structure.frontend.iter())
        .filter(|file| {
            let file_dir = paths::parent_dir(file);
            file_dir == dir || paths::is_within(file_dir, dir)
        })
        .take(cap)
        .map(|file| DependencyRelationship::new(file.clone(), config, RelationType::Config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::Category;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn structure_of(entries: &[(Category, &str)]) -> ProjectStructure {
        let mut structure = ProjectStructure::default();
        for (category, path) in entries {
            structure.claim(*category, *path);
        }
        structure
    }

    #[test]
    fn test_scanner_shapes() {
        let content = r#"
import { a } from "./a";
import "./side-effect";
import * as b from '../b';
import type { T } from "./types";
const c = require('./c');
const d = await import("./d");
export { e } from "./e";
export * from './f';
import Token from "../contracts/Token.sol";
"#;
        let specs = TextualImportScanner.scan(content);
        assert_eq!(
            specs,
            vec![
                "./a",
                "./side-effect",
                "../b",
                "./types",
                "./c",
                "./d",
                "./e",
                "./f",
                "../contracts/Token.sol",
            ]
        );
    }

    #[test]
    fn test_scanner_multiline_import() {
        let content = "import {\n  alpha,\n  beta,\n} from './greek';\n";
        assert_eq!(TextualImportScanner.scan(content), vec!["./greek"]);
    }

    #[test]
    fn test_resolve_relative_with_extension_and_index() {
        let structure = structure_of(&[
            (Category::Other, "src/b.ts"),
            (Category::Other, "src/lib/index.ts"),
        ]);

        assert_eq!(
            resolve_import("src/a.ts", "./b", &structure),
            Some(ImportTarget::File("src/b.ts".to_string()))
        );
        assert_eq!(
            resolve_import("src/a.ts", "./lib", &structure),
            Some(ImportTarget::File("src/lib/index.ts".to_string()))
        );
        assert_eq!(
            resolve_import("src/deep/a.ts", "../b", &structure),
            Some(ImportTarget::File("src/b.ts".to_string()))
        );
        assert_eq!(
            resolve_import("a.ts", "/src/b", &structure),
            Some(ImportTarget::File("src/b.ts".to_string()))
        );
    }

    #[test]
    fn test_resolve_unknown_relative_is_unresolved() {
        let structure = structure_of(&[(Category::Other, "src/a.ts")]);
        assert_eq!(
            resolve_import("src/a.ts", "./missing", &structure),
            Some(ImportTarget::Unresolved("src/missing".to_string()))
        );
        assert_eq!(
            resolve_import("src/a.ts", "/lib/gone", &structure),
            Some(ImportTarget::Unresolved("lib/gone".to_string()))
        );
        assert_eq!(
            resolve_import("a.ts", "./missing", &structure),
            Some(ImportTarget::Unresolved("./missing".to_string()))
        );
        assert_eq!(resolve_import("a.ts", "..", &structure), None);
        assert_eq!(resolve_import("a.ts", "../outside", &structure), None);
    }

    #[test]
    fn test_unmatched_relative_import_still_yields_edge() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.ts", "import x from './missing';");
        let structure = structure_of(&[(Category::Other, "a.ts")]);

        let resolver = RelationshipResolver::new(temp.path(), &AnalysisConfig::default());
        assert_eq!(
            resolver.resolve_all(&structure).relationships,
            vec![DependencyRelationship::import("a.ts", "./missing")]
        );
    }

    #[test]
    fn test_resolve_packages() {
        let structure = ProjectStructure::default();
        assert_eq!(
            resolve_import("a.ts", "ethers", &structure),
            Some(ImportTarget::Package("ethers".to_string()))
        );
        assert_eq!(resolve_import("a.ts", "@openzeppelin/contracts/token", &structure), None);
        assert_eq!(resolve_import("a.ts", "@types/node", &structure), None);
        assert_eq!(resolve_import("a.ts", "../node_modules/x", &structure), None);
    }

    #[test]
    fn test_normalized_name() {
        assert_eq!(normalized_name("contracts/My_Token.sol", false), "mytoken");
        assert_eq!(normalized_name("test/MyToken.test.ts", true), "mytoken");
        assert_eq!(normalized_name("test/vault.spec.js", true), "vault");
        assert_eq!(normalized_name("Makefile", false), "makefile");
    }

    #[test]
    fn test_resolve_all_simple_import() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.ts", "import { b } from \"./b\";\n");
        write(temp.path(), "b.ts", "export const b = 1;\n");
        let structure = structure_of(&[(Category::Other, "a.ts"), (Category::Other, "b.ts")]);

        let resolver = RelationshipResolver::new(temp.path(), &AnalysisConfig::default());
        let resolution = resolver.resolve_all(&structure);

        assert_eq!(
            resolution.relationships,
            vec![DependencyRelationship::import("a.ts", "b.ts")]
        );
        assert_eq!(resolution.scanned, 2);
        assert_eq!(resolution.unscanned, 0);
    }

    #[test]
    fn test_resolve_all_test_script_and_tsconfig_edges() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "contracts/Token.sol", "contract Token {}");
        write(temp.path(), "test/Token.test.ts", "describe('Token', () => {});");
        write(
            temp.path(),
            "scripts/deploy.ts",
            "const f = await ethers.getContractFactory(\"Token\");",
        );
        write(temp.path(), "web/tsconfig.json", "{}");
        write(temp.path(), "web/src/App.tsx", "");
        write(temp.path(), "server/index.ts", "");

        let structure = structure_of(&[
            (Category::Contracts, "contracts/Token.sol"),
            (Category::Tests, "test/Token.test.ts"),
            (Category::Scripts, "scripts/deploy.ts"),
            (Category::Config, "web/tsconfig.json"),
            (Category::Frontend, "web/src/App.tsx"),
            (Category::Backend, "server/index.ts"),
        ]);

        let resolver = RelationshipResolver::new(temp.path(), &AnalysisConfig::default());
        let rels = resolver.resolve_all(&structure).relationships;

        assert!(rels.contains(&DependencyRelationship::new(
            "test/Token.test.ts",
            "contracts/Token.sol",
            RelationType::Test
        )));
        assert!(rels.contains(&DependencyRelationship::new(
            "scripts/deploy.ts",
            "contracts/Token.sol",
            RelationType::Config
        )));
        assert!(rels.contains(&DependencyRelationship::new(
            "web/src/App.tsx",
            "web/tsconfig.json",
            RelationType::Config
        )));
        assert!(!rels
            .iter()
            .any(|r| r.from == "server/index.ts" && r.to == "web/tsconfig.json"));
    }

    #[test]
    fn test_tsconfig_edge_cap() {
        let mut entries = vec![(Category::Config, "tsconfig.json".to_string())];
        for i in 0..30 {
            entries.push((Category::Backend, format!("server/f{:02}.ts", i)));
        }
        let mut structure = ProjectStructure::default();
        for (category, path) in &entries {
            structure.claim(*category, path.clone());
        }

        let edges = tsconfig_edges("tsconfig.json", &structure, 20);
        assert_eq!(edges.len(), 20);
    }

    #[test]
    fn test_scan_limit_reports_unscanned() {
        let temp = TempDir::new().unwrap();
        let mut structure = ProjectStructure::default();
        for i in 0..5 {
            let name = format!("f{}.ts", i);
            write(temp.path(), &name, "import x from './f0';");
            structure.claim(Category::Other, name);
        }

        let config = AnalysisConfig {
            import_scan_limit: Some(2),
            ..AnalysisConfig::default()
        };
        let resolution = RelationshipResolver::new(temp.path(), &config).resolve_all(&structure);
        assert_eq!(resolution.scanned, 2);
        assert_eq!(resolution.unscanned, 3);
        assert_eq!(resolution.relationships.len(), 2);

        let unbounded = AnalysisConfig {
            import_scan_limit: None,
            ..AnalysisConfig::default()
        };
        let resolution =
            RelationshipResolver::new(temp.path(), &unbounded).resolve_all(&structure);
        assert_eq!(resolution.unscanned, 0);
        assert_eq!(resolution.relationships.len(), 5);
    }

    #[test]
    fn test_unreadable_file_contributes_nothing() {
        let temp = TempDir::new().unwrap();
        let structure = structure_of(&[(Category::Other, "ghost.ts")]);
        let resolution =
            RelationshipResolver::new(temp.path(), &AnalysisConfig::default()).resolve_all(&structure);
        assert!(resolution.relationships.is_empty());
    }

    #[test]
    fn test_resolve_file_covers_both_directions() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "scripts/deploy.ts", "deploy(\"Token\")");
        let structure = structure_of(&[
            (Category::Contracts, "contracts/Token.sol"),
            (Category::Tests, "test/Token.test.ts"),
            (Category::Scripts, "scripts/deploy.ts"),
        ]);

        let resolver = RelationshipResolver::new(temp.path(), &AnalysisConfig::default());
        let rels = resolver.resolve_file("contracts/Token.sol", "contract Token {}", &structure);

        assert!(rels.contains(&DependencyRelationship::new(
            "test/Token.test.ts",
            "contracts/Token.sol",
            RelationType::Test
        )));
        assert!(rels.contains(&DependencyRelationship::new(
            "scripts/deploy.ts",
            "contracts/Token.sol",
            RelationType::Config
        )));
    }

    #[test]
    fn test_resolve_file_uses_given_content() {
        let temp = TempDir::new().unwrap();
        let structure = structure_of(&[(Category::Other, "a.ts"), (Category::Other, "c.ts")]);
        let resolver = RelationshipResolver::new(temp.path(), &AnalysisConfig::default());

        let rels = resolver.resolve_file("a.ts", "import c from './c';", &structure);
        assert_eq!(rels, vec![DependencyRelationship::import("a.ts", "c.ts")]);
    }

    struct FixedScanner(Vec<String>);

    impl ImportScanner for FixedScanner {
        fn scan(&self, _content: &str) -> Vec<String> {
            self.0.clone()
        }
    }

    #[test]
    fn test_custom_scanner() {
        let temp = TempDir::new().unwrap();
        let structure = structure_of(&[(Category::Other, "a.ts"), (Category::Other, "b.ts")]);
        let resolver = RelationshipResolver::with_scanner(
            temp.path(),
            &AnalysisConfig::default(),
            Box::new(FixedScanner(vec!["./b".to_string()])),
        );

        let rels = resolver.import_edges("a.ts", "", &structure);
        assert_eq!(rels, vec![DependencyRelationship::import("a.ts", "b.ts")]);
    }
}
